//! Configuration system for moxen experiments.
//!
//! Supports YAML configuration files with defaults taken from the classic
//! forager/predator setup.

use crate::automaton::Neighborhood;
use crate::genetics::MutationRates;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub foragers: PopulationConfig,
    #[serde(default)]
    pub predators: PopulationConfig,
    #[serde(default)]
    pub cycle_budget: CycleBudgetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// World configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Neighbors counted by the Game of Life rule
    pub neighborhood: Neighborhood,
    /// Step the automaton after every tick of a trial
    pub step_automaton: bool,
}

/// Sensor configuration shared by all moxen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Farthest distance a mox can sense; negative means unbounded
    pub max_sensor_range: f32,
}

/// How candidates are scored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionMode {
    /// Each candidate is tried on its own in every world
    #[default]
    Individual,
    /// Every member shares a single world
    System,
}

/// Which species evolve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationMode {
    #[default]
    ForagersOnly,
    ForagersAndPredators,
}

/// Evolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub mode: EvolutionMode,
    pub populations: PopulationMode,
    /// Probability that a gene mutates
    pub mutation_rate: f64,
    /// Probability that a mutation resamples instead of stepping
    pub random_mutation_rate: f64,
    pub random_seed: u64,
    /// Give new members warm-up trials before they are scored
    pub prepare_new_members: bool,
    /// Cap on warm-up trials per new member
    pub max_preparation_trials: u32,
    /// Steer foragers toward food before each evaluation
    pub train_foragers: bool,
}

/// Population sizes for one species
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Survivors kept by pruning
    pub fit_size: usize,
    pub num_mutants: usize,
    pub num_offspring: usize,
}

/// Engine time limit per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleBudgetConfig {
    pub enabled: bool,
    /// Busy loop length timed at start-up
    pub calibration_iterations: u64,
    /// Allowed multiple of the calibration time
    pub multiplier: u32,
}

/// Logging and checkpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Generations between checkpoints
    pub checkpoint_interval: u32,
    /// Checkpoints kept on disk
    pub max_checkpoints: usize,
    /// Generations between summary lines
    pub stats_interval: u32,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::Moore,
            step_automaton: false,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            max_sensor_range: 10.0,
        }
    }
}

impl SensorConfig {
    pub fn unbounded() -> Self {
        Self {
            max_sensor_range: -1.0,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.max_sensor_range >= 0.0
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mode: EvolutionMode::Individual,
            populations: PopulationMode::ForagersOnly,
            mutation_rate: 0.25,
            random_mutation_rate: 0.5,
            random_seed: 4517,
            prepare_new_members: true,
            max_preparation_trials: 5,
            train_foragers: false,
        }
    }
}

impl EvolutionConfig {
    pub fn rates(&self) -> MutationRates {
        MutationRates {
            mutation_rate: self.mutation_rate,
            random_mutation_rate: self.random_mutation_rate,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            fit_size: 20,
            num_mutants: 10,
            num_offspring: 10,
        }
    }
}

impl PopulationConfig {
    /// Members after mutation and mating
    pub fn total(&self) -> usize {
        self.fit_size + self.num_mutants + self.num_offspring
    }
}

impl Default for CycleBudgetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            calibration_iterations: 100_000_000,
            multiplier: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 1,
            max_checkpoints: 10,
            stats_interval: 1,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let rate_ok = |r: f64| (0.0..=1.0).contains(&r);
        if !rate_ok(self.evolution.mutation_rate) || !rate_ok(self.evolution.random_mutation_rate) {
            return Err("mutation rates must be between 0 and 1".to_string());
        }
        if self.sensors.max_sensor_range.is_nan() {
            return Err("max_sensor_range must be a number".to_string());
        }
        let mut species = vec![("foragers", &self.foragers)];
        if self.evolution.populations == PopulationMode::ForagersAndPredators {
            species.push(("predators", &self.predators));
        }
        for (name, population) in species {
            if population.fit_size == 0 {
                return Err(format!("{}: fit_size must be > 0", name));
            }
            if population.num_offspring > 0 && population.fit_size < 2 {
                return Err(format!("{}: mating needs fit_size >= 2", name));
            }
        }
        if self.logging.checkpoint_interval == 0 || self.logging.stats_interval == 0 {
            return Err("logging intervals must be > 0".to_string());
        }
        if self.cycle_budget.enabled && self.cycle_budget.multiplier == 0 {
            return Err("cycle_budget.multiplier must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.foragers.total(), 40);
        assert_eq!(config.evolution.random_seed, 4517);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.evolution.mode = EvolutionMode::System;
        config.world.neighborhood = Neighborhood::VonNeumann;
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("mode: system"));
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let loaded: Config = serde_yaml::from_str("sensors:\n  max_sensor_range: -1.0\n").unwrap();
        assert!(!loaded.sensors.is_bounded());
        assert_eq!(loaded.foragers, PopulationConfig::default());
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = Config::default();
        config.evolution.mutation_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.evolution.populations = PopulationMode::ForagersAndPredators;
        config.predators.fit_size = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.checkpoint_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = Config::default();
        config.save(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }
}
