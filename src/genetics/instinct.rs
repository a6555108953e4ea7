//! Evolvable instinct goals.

use super::genome::{Genome, GenomeError};
use super::{GeneValue, MutationRates};
use crate::automaton::{Cell, BLUE_CELL, EMPTY, GREEN_CELL};
use crate::engine::{Goal, Response, SensorMode, SENSOR_COUNT};
use crate::mox::{FORAGER_COLOR, PREDATOR_COLOR};
use serde::{Deserialize, Serialize};

pub const RANGE_SENSOR: &str = "RANGE_SENSOR";
pub const COLOR_SENSOR: &str = "COLOR_SENSOR";
pub const RESPONSE: &str = "RESPONSE";
pub const GOAL_VALUE: &str = "GOAL_VALUE";
pub const FREQUENCY: &str = "FREQUENCY";
pub const PERIODIC_NEED: &str = "PERIODIC_NEED";

/// Range used for the instinct range gene when sensing is unbounded
const UNBOUNDED_RANGE_CAP: f32 = 10.0;

/// Decoded instinct, ready to be installed as an engine goal.
#[derive(Clone, Debug, PartialEq)]
pub struct Instinct {
    pub sensors: [f32; SENSOR_COUNT],
    pub mode: SensorMode,
    pub response: Option<Response>,
    pub goal_value: f64,
    pub frequency: u32,
    pub periodic_need: f64,
}

impl Instinct {
    /// Goal satisfying need `need`
    pub fn goal(&self, need: usize) -> Goal {
        Goal {
            need,
            sensors: self.sensors,
            mode: self.mode,
            response: self.response,
            goal_value: self.goal_value,
            frequency: self.frequency,
            periodic_need: self.periodic_need,
        }
    }
}

/// Genome of one instinct: a sensed pattern, an optional response, and how
/// strongly and how often the instinct's need comes back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstinctGenome {
    genome: Genome,
    range_cap: f32,
}

fn color_for(code: i32) -> Cell {
    match code {
        1 => GREEN_CELL,
        2 => BLUE_CELL,
        3 => FORAGER_COLOR,
        4 => PREDATOR_COLOR,
        _ => EMPTY,
    }
}

fn response_for(code: i32) -> Option<Response> {
    match code {
        1 => Some(Response::Wait),
        2 => Some(Response::Forward),
        3 => Some(Response::Right),
        4 => Some(Response::Left),
        _ => None,
    }
}

impl InstinctGenome {
    /// `max_sensor_range` bounds the sensed goal distance; a negative
    /// (unbounded) range falls back to a fixed cap.
    pub fn new(rates: MutationRates, max_sensor_range: f32, seed: u64) -> Self {
        let range_cap = if max_sensor_range < 0.0 {
            UNBOUNDED_RANGE_CAP
        } else {
            max_sensor_range
        };
        let mut genome = Genome::new(rates, seed);
        genome.add_float(RANGE_SENSOR, 0.0, 0.0, range_cap, 1.0);
        genome.add_int(COLOR_SENSOR, 0, 0, 4, 1);
        genome.add_int(RESPONSE, 0, 0, 4, 1);
        genome.add_double(GOAL_VALUE, 0.1, 0.1, 1.0, 0.1);
        genome.add_int(FREQUENCY, 0, 0, 50, 5);
        genome.add_double(PERIODIC_NEED, 0.1, 0.1, 1.0, 0.1);
        Self { genome, range_cap }
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn mutate(&mut self) {
        self.genome.mutate();
    }

    pub fn copy_values(&mut self, from: &InstinctGenome) -> Result<(), GenomeError> {
        self.genome.copy_values(&from.genome)
    }

    /// Load saved values; the range gene is capped at the current maximum.
    pub fn load_values(&mut self, values: &[GeneValue]) -> Result<(), GenomeError> {
        self.genome.load_values(values)?;
        if let Some(gene) = self.genome.gene_mut(RANGE_SENSOR) {
            if let GeneValue::Float(range) = gene.value() {
                gene.set_value(GeneValue::Float(range.min(self.range_cap)))?;
            }
        }
        Ok(())
    }

    pub fn extract(&self) -> Instinct {
        let num = |name: &str| self.genome.gene(name).map(|g| g.value().as_f64()).unwrap_or(0.0);
        Instinct {
            sensors: [
                num(RANGE_SENSOR) as f32,
                color_for(num(COLOR_SENSOR) as i32) as f32,
                0.0,
            ],
            mode: SensorMode::All,
            response: response_for(num(RESPONSE) as i32),
            goal_value: num(GOAL_VALUE),
            frequency: num(FREQUENCY) as u32,
            periodic_need: num(PERIODIC_NEED),
        }
    }
}
