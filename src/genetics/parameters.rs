//! Learning parameters handed to a mox's decision engine.

use super::genome::{Genome, GenomeError};
use super::MutationRates;
use serde::{Deserialize, Serialize};

pub const INITIAL_ENABLEMENT: &str = "INITIAL_ENABLEMENT";
pub const DRIVE_ATTENUATION: &str = "DRIVE_ATTENUATION";
pub const LEARNING_DECREASE_VELOCITY: &str = "LEARNING_DECREASE_VELOCITY";
pub const LEARNING_INCREASE_VELOCITY: &str = "LEARNING_INCREASE_VELOCITY";
pub const FIRING_STRENGTH_LEARNING_DAMPER: &str = "FIRING_STRENGTH_LEARNING_DAMPER";
pub const UTILITY_ASYMPTOTE: &str = "UTILITY_ASYMPTOTE";
pub const RESPONSE_RANDOMNESS: &str = "RESPONSE_RANDOMNESS";
pub const DEFAULT_MAX_LEARNING_EFFECT_EVENT_INTERVAL: &str = "DEFAULT_MAX_LEARNING_EFFECT_EVENT_INTERVAL";
pub const DEFAULT_NUM_EFFECT_EVENT_INTERVALS: &str = "DEFAULT_NUM_EFFECT_EVENT_INTERVALS";
pub const MAX_ASSOCIATOR_EVENTS: &str = "MAX_ASSOCIATOR_EVENTS";
pub const MAX_MEDIATORS: &str = "MAX_MEDIATORS";
pub const MAX_MEDIATOR_LEVEL: &str = "MAX_MEDIATOR_LEVEL";
pub const MAX_RESPONSE_EQUIPPED_MEDIATOR_LEVEL: &str = "MAX_RESPONSE_EQUIPPED_MEDIATOR_LEVEL";
pub const MIN_RESPONSE_UNEQUIPPED_MEDIATOR_LEVEL: &str = "MIN_RESPONSE_UNEQUIPPED_MEDIATOR_LEVEL";

/// Parameter genome.
///
/// After the generic per-gene mutation the mediator levels are pulled back
/// into a consistent order: both response levels stay at or below the
/// maximum mediator level, and the unequipped level is at most one above the
/// equipped level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParmGenome {
    genome: Genome,
}

impl ParmGenome {
    pub fn new(rates: MutationRates, seed: u64) -> Self {
        let mut genome = Genome::new(rates, seed);
        genome.add_double(INITIAL_ENABLEMENT, 0.1, 0.1, 1.0, 0.1);
        genome.add_double(DRIVE_ATTENUATION, 0.0, 0.0, 1.0, 0.1);
        genome.add_double(LEARNING_DECREASE_VELOCITY, 0.1, 0.1, 0.9, 0.1);
        genome.add_double(LEARNING_INCREASE_VELOCITY, 0.1, 0.1, 0.9, 0.1);
        genome.add_double(FIRING_STRENGTH_LEARNING_DAMPER, 0.1, 0.05, 0.9, 0.05);
        genome.add_double(UTILITY_ASYMPTOTE, 10.0, 0.0, 100.0, 10.0);
        genome.add_double(RESPONSE_RANDOMNESS, 0.01, 0.01, 0.2, 0.01);
        genome.add_int(DEFAULT_MAX_LEARNING_EFFECT_EVENT_INTERVAL, 1, 1, 3, 1);
        genome.add_int(DEFAULT_NUM_EFFECT_EVENT_INTERVALS, 1, 1, 3, 1);
        genome.add_int(MAX_ASSOCIATOR_EVENTS, 1, 1, 5, 1);
        genome.add_int(MAX_MEDIATORS, 100, 50, 500, 50);
        genome.add_int(MAX_MEDIATOR_LEVEL, 2, 1, 5, 1);
        genome.add_int(MAX_RESPONSE_EQUIPPED_MEDIATOR_LEVEL, 2, 1, 5, 1);
        genome.add_int(MIN_RESPONSE_UNEQUIPPED_MEDIATOR_LEVEL, 1, 1, 5, 1);
        Self { genome }
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn mutate(&mut self) -> Result<(), GenomeError> {
        self.genome.mutate();
        self.clamp_levels()
    }

    fn level(&self, name: &str) -> i32 {
        self.genome.gene(name).and_then(|g| g.as_int()).unwrap_or(1)
    }

    fn set_level(&mut self, name: &str, level: i32) -> Result<(), GenomeError> {
        match self.genome.gene_mut(name) {
            Some(gene) => gene.set_value(super::GeneValue::Int(level)),
            None => Ok(()),
        }
    }

    fn clamp_levels(&mut self) -> Result<(), GenomeError> {
        let max = self.level(MAX_MEDIATOR_LEVEL);
        let mut equipped = self.level(MAX_RESPONSE_EQUIPPED_MEDIATOR_LEVEL);
        let mut unequipped = self.level(MIN_RESPONSE_UNEQUIPPED_MEDIATOR_LEVEL);
        equipped = equipped.min(max);
        unequipped = unequipped.min(max);
        if unequipped > equipped + 1 {
            if self.genome.flip() {
                unequipped = equipped;
            } else {
                equipped = unequipped;
            }
        }
        self.set_level(MAX_RESPONSE_EQUIPPED_MEDIATOR_LEVEL, equipped)?;
        self.set_level(MIN_RESPONSE_UNEQUIPPED_MEDIATOR_LEVEL, unequipped)
    }

    pub fn copy_values(&mut self, from: &ParmGenome) -> Result<(), GenomeError> {
        self.genome.copy_values(&from.genome)
    }

    pub fn meld_values(&mut self, a: &ParmGenome, b: &ParmGenome) -> Result<(), GenomeError> {
        self.genome.meld_values(&a.genome, &b.genome)
    }

    pub fn load_values(&mut self, values: &[super::GeneValue]) -> Result<(), GenomeError> {
        self.genome.load_values(values)
    }

    pub fn key_values(&self) -> Vec<(String, String)> {
        self.genome.key_values()
    }

    /// Value of a named parameter as a float
    pub fn get(&self, name: &str) -> Option<f64> {
        self.genome.gene(name).map(|g| g.value().as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let parms = ParmGenome::new(MutationRates::default(), 1);
        assert_eq!(parms.genome().len(), 14);
        assert_eq!(parms.get(UTILITY_ASYMPTOTE), Some(10.0));
        assert_eq!(parms.get(MAX_MEDIATORS), Some(100.0));
        assert_eq!(parms.key_values()[0].0, INITIAL_ENABLEMENT);
    }

    #[test]
    fn test_clamp_pulls_levels_into_order() {
        let mut parms = ParmGenome::new(MutationRates::default(), 3);
        parms.set_level(MAX_MEDIATOR_LEVEL, 2).unwrap();
        parms.set_level(MAX_RESPONSE_EQUIPPED_MEDIATOR_LEVEL, 5).unwrap();
        parms.set_level(MIN_RESPONSE_UNEQUIPPED_MEDIATOR_LEVEL, 1).unwrap();
        parms.clamp_levels().unwrap();
        assert_eq!(parms.get(MAX_RESPONSE_EQUIPPED_MEDIATOR_LEVEL), Some(2.0));
        assert_eq!(parms.get(MIN_RESPONSE_UNEQUIPPED_MEDIATOR_LEVEL), Some(1.0));

        // A level gene that does not exist is left alone.
        assert!(parms.set_level("NO_SUCH_LEVEL", 3).is_ok());
    }

    #[test]
    fn test_levels_stay_ordered_after_mutation() {
        let rates = MutationRates {
            mutation_rate: 1.0,
            random_mutation_rate: 1.0,
        };
        for seed in 0..20 {
            let mut parms = ParmGenome::new(rates, seed);
            for _ in 0..50 {
                parms.mutate().unwrap();
                let max = parms.get(MAX_MEDIATOR_LEVEL).unwrap();
                let equipped = parms.get(MAX_RESPONSE_EQUIPPED_MEDIATOR_LEVEL).unwrap();
                let unequipped = parms.get(MIN_RESPONSE_UNEQUIPPED_MEDIATOR_LEVEL).unwrap();
                assert!(equipped <= max);
                assert!(unequipped <= max);
                assert!(unequipped <= equipped + 1.0);
            }
        }
    }
}
