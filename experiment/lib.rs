#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod config;
pub mod driver;

#[path = "../shower/mod.rs"]
pub mod shower;

#[path = "../model/mod.rs"]
pub mod model;

#[path = "../validate/mod.rs"]
pub mod validate;
