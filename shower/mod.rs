pub mod cuts;
pub mod load;
pub mod prepare;
pub mod records;
pub mod split;

pub use cuts::ShowerCuts;
pub use load::{DataError, load_showers};
pub use records::{LabelPolicy, ParticleType, RECORD_WIDTH, ShowerTable, map_particle_label};
pub use split::split_features_target;
