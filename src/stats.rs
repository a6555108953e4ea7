//! Per-generation fitness statistics.

use crate::mox::Species;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Statistics recorded when a generation is pruned
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Zero-based generation index
    pub generation: u32,
    /// Fitness of the first retained forager
    pub forager_best: f64,
    /// Mean fitness of the retained foragers
    pub forager_average: f64,
    /// Predator figures, when predators evolve
    pub predator_best: Option<f64>,
    pub predator_average: Option<f64>,
    /// Wall-clock seconds spent on the generation
    pub elapsed_secs: f32,
}

impl GenerationStats {
    pub fn best(&self, species: Species) -> Option<f64> {
        match species {
            Species::Forager => Some(self.forager_best),
            Species::Predator => self.predator_best,
        }
    }

    pub fn average(&self, species: Species) -> Option<f64> {
        match species {
            Species::Forager => Some(self.forager_average),
            Species::Predator => self.predator_average,
        }
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        match (self.predator_best, self.predator_average) {
            (Some(best), Some(average)) => format!(
                "Gen:{:5} | Forager best:{:8.3} avg:{:8.3} | Predator best:{:8.3} avg:{:8.3} | {:.2}s",
                self.generation, self.forager_best, self.forager_average, best, average, self.elapsed_secs
            ),
            _ => format!(
                "Gen:{:5} | Forager best:{:8.3} avg:{:8.3} | {:.2}s",
                self.generation, self.forager_best, self.forager_average, self.elapsed_secs
            ),
        }
    }
}

/// Fitness history of a run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessHistory {
    pub generations: Vec<GenerationStats>,
}

impl FitnessHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: GenerationStats) {
        self.generations.push(stats);
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn latest(&self) -> Option<&GenerationStats> {
        self.generations.last()
    }

    /// Best fitness over time
    pub fn best_series(&self, species: Species) -> Vec<(u32, f64)> {
        self.generations
            .iter()
            .filter_map(|s| s.best(species).map(|f| (s.generation, f)))
            .collect()
    }

    /// Average fitness over time
    pub fn average_series(&self, species: Species) -> Vec<(u32, f64)> {
        self.generations
            .iter()
            .filter_map(|s| s.average(species).map(|f| (s.generation, f)))
            .collect()
    }

    /// Tab-separated tables of fittest and average values per species
    pub fn table(&self) -> String {
        let mut out = String::new();
        for species in [Species::Forager, Species::Predator] {
            let best = self.best_series(species);
            if best.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{} fitness:", species);
            let _ = writeln!(out, "Generation\tFittest");
            for (generation, fitness) in &best {
                let _ = writeln!(out, "{}\t{}", generation, fitness);
            }
            let _ = writeln!(out, "Generation\tAverage");
            for (generation, fitness) in self.average_series(species) {
                let _ = writeln!(out, "{}\t{}", generation, fitness);
            }
        }
        out
    }

    /// Save history to a JSON file
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load history from a JSON file
    pub fn load_json(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
