//! # Tank-Signal Reduction
//!
//! Turns per-tank detector hits into shower records. Each event keeps only
//! tanks far enough from the shower core to be muon-dominated; their muon
//! signal and muon count are summed, and those tanks whose total signal sits
//! in the single-muon VEM window additionally contribute to the time delay and
//! signal sums.
//!
//! Records can also be averaged per run, which is the form the experiment
//! trains on by default.

use super::load::DataError;
use super::records::{COLUMN_NAMES, ParticleType, RECORD_WIDTH, ShowerTable};
use itertools::Itertools;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to read or write tank-signal rows: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Event {event} of run {run} has unrecognised particle type '{value}'.")]
    UnknownParticleType { run: i64, event: i64, value: String },
    #[error("The tank-signal file '{0}' contains no hits.")]
    EmptyInput(String),
    #[error(
        "Event {event} of run {run} mixes hits with different particle type, energy or zenith."
    )]
    InconsistentEvent { run: i64, event: i64 },
}

/// One tank's signals for one event, as written by the simulation export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TankHit {
    pub run: i64,
    pub event: i64,
    pub energy: f64,
    pub zenith: f64,
    pub particle_type: String,
    pub lateral_distance: f64,
    pub total_pe: f64,
    pub total_vem: f64,
    pub muon_pe: f64,
    pub muon_count: f64,
    pub time_delay: f64,
}

/// Which tanks contribute to a shower record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TankSelection {
    /// Minimum lateral distance from the shower axis, in metres (inclusive).
    pub cut_distance: f64,
    /// VEM window for tanks counted in the time delay and signal sums.
    pub min_vem: f64,
    pub max_vem: f64,
}

impl Default for TankSelection {
    fn default() -> Self {
        Self {
            cut_distance: 400.0,
            min_vem: 0.6,
            max_vem: 2.0,
        }
    }
}

/// A reduced shower, one row of a record file.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowerSummary {
    pub run: i64,
    pub energy: f64,
    pub zenith: f64,
    pub time_delay: f64,
    pub signal: f64,
    pub muon_signal: f64,
    pub muon_count: f64,
    pub particle: ParticleType,
}

impl ShowerSummary {
    pub fn to_record(&self) -> [f64; RECORD_WIDTH] {
        [
            self.run as f64,
            self.energy,
            self.zenith,
            self.time_delay,
            self.signal,
            self.muon_signal,
            self.muon_count,
            self.particle.code(),
        ]
    }
}

/// Row counts produced by [`prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareReport {
    pub hits: usize,
    pub showers: usize,
    pub runs: usize,
}

pub fn read_tank_hits(path: &Path) -> Result<Vec<TankHit>, PrepareError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;
    let hits = reader.deserialize().collect::<Result<Vec<TankHit>, csv::Error>>()?;
    if hits.is_empty() {
        return Err(PrepareError::EmptyInput(path.display().to_string()));
    }
    Ok(hits)
}

/// Reduces the hits of a single event. Event-level fields come from the first
/// hit and every other hit must agree with it.
pub fn reduce_event(hits: &[TankHit], selection: &TankSelection) -> Result<ShowerSummary, PrepareError> {
    let Some(first) = hits.first() else {
        return Err(PrepareError::EmptyInput("event".to_string()));
    };
    let same_shower = |hit: &TankHit| {
        hit.run == first.run
            && hit.event == first.event
            && hit.particle_type == first.particle_type
            && hit.energy == first.energy
            && hit.zenith == first.zenith
    };
    if !hits.iter().all(same_shower) {
        return Err(PrepareError::InconsistentEvent {
            run: first.run,
            event: first.event,
        });
    }
    let particle = ParticleType::from_symbol(&first.particle_type).ok_or_else(|| {
        PrepareError::UnknownParticleType {
            run: first.run,
            event: first.event,
            value: first.particle_type.clone(),
        }
    })?;

    let mut summary = ShowerSummary {
        run: first.run,
        energy: first.energy,
        zenith: first.zenith,
        time_delay: 0.0,
        signal: 0.0,
        muon_signal: 0.0,
        muon_count: 0.0,
        particle,
    };

    for hit in hits {
        if hit.lateral_distance < selection.cut_distance || hit.total_pe == 0.0 {
            continue;
        }
        let scale = hit.total_vem / hit.total_pe;
        summary.muon_signal += scale * hit.muon_pe;
        summary.muon_count += hit.muon_count;
        if (selection.min_vem..=selection.max_vem).contains(&hit.total_vem) {
            summary.time_delay += hit.time_delay.abs();
            summary.signal += hit.total_vem;
        }
    }

    Ok(summary)
}

/// Groups consecutive hits by `(particle_type, run, event)` and reduces each
/// group. Proton and iron sets reuse run and event numbers.
pub fn reduce_hits(
    hits: &[TankHit],
    selection: &TankSelection,
) -> Result<Vec<ShowerSummary>, PrepareError> {
    let mut showers = Vec::new();
    let events = hits
        .iter()
        .chunk_by(|&hit| (hit.particle_type.as_str(), hit.run, hit.event));
    for (_, group) in &events {
        let event: Vec<TankHit> = group.cloned().collect();
        showers.push(reduce_event(&event, selection)?);
    }
    Ok(showers)
}

/// Averages every numeric field over the showers of each run.
///
/// Runs are keyed by particle type as well, since proton and iron runs come
/// from separate simulation sets and may share run numbers. Output is ordered
/// by particle type, then run.
pub fn average_by_run(showers: &[ShowerSummary]) -> Vec<ShowerSummary> {
    let mut groups: BTreeMap<(ParticleType, i64), Vec<&ShowerSummary>> = BTreeMap::new();
    for shower in showers {
        groups
            .entry((shower.particle, shower.run))
            .or_default()
            .push(shower);
    }

    groups
        .into_iter()
        .map(|((particle, run), members)| {
            let n = members.len() as f64;
            let mean = |field: fn(&ShowerSummary) -> f64| {
                members.iter().map(|s| field(s)).sum::<f64>() / n
            };
            ShowerSummary {
                run,
                energy: mean(|s| s.energy),
                zenith: mean(|s| s.zenith),
                time_delay: mean(|s| s.time_delay),
                signal: mean(|s| s.signal),
                muon_signal: mean(|s| s.muon_signal),
                muon_count: mean(|s| s.muon_count),
                particle,
            }
        })
        .collect()
}

pub fn summaries_to_table(showers: &[ShowerSummary]) -> Result<ShowerTable, DataError> {
    let mut values = Array2::zeros((showers.len(), RECORD_WIDTH));
    for (mut row, shower) in values.rows_mut().into_iter().zip(showers) {
        for (cell, value) in row.iter_mut().zip(shower.to_record()) {
            *cell = value;
        }
    }
    ShowerTable::from_matrix(values)
}

/// Writes showers in the loader's record layout, labels as symbols. Floats
/// keep their decimal point so whole values still read back as floats.
pub fn write_summaries(path: &Path, showers: &[ShowerSummary]) -> Result<(), PrepareError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(COLUMN_NAMES)?;
    for shower in showers {
        writer.write_record([
            shower.run.to_string(),
            format!("{:?}", shower.energy),
            format!("{:?}", shower.zenith),
            format!("{:?}", shower.time_delay),
            format!("{:?}", shower.signal),
            format!("{:?}", shower.muon_signal),
            format!("{:?}", shower.muon_count),
            shower.particle.symbol().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Reduces a tank-signal file and writes both the per-event and the
/// per-run averaged record files.
pub fn prepare(
    input: &Path,
    output: &Path,
    averaged_output: &Path,
    selection: &TankSelection,
) -> Result<PrepareReport, PrepareError> {
    log::info!("Reading tank hits from '{}'", input.display());
    let hits = read_tank_hits(input)?;
    let showers = reduce_hits(&hits, selection)?;
    let averaged = average_by_run(&showers);
    log::info!(
        "Reduced {} hits into {} showers over {} runs",
        hits.len(),
        showers.len(),
        averaged.len()
    );

    write_summaries(output, &showers)?;
    write_summaries(averaged_output, &averaged)?;

    Ok(PrepareReport {
        hits: hits.len(),
        showers: showers.len(),
        runs: averaged.len(),
    })
}
