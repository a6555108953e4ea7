//! Genetics module - bounded genes, genomes and the mox-specific genomes.

pub mod gene;
pub mod genome;
pub mod instinct;
pub mod parameters;

pub use gene::{Gene, GeneValue};
pub use genome::{Genome, GenomeError};
pub use instinct::{Instinct, InstinctGenome};
pub use parameters::ParmGenome;

use serde::{Deserialize, Serialize};

/// Mutation probabilities shared by every gene of a genome
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationRates {
    /// Probability that a gene changes at all
    pub mutation_rate: f64,
    /// Given a change, probability of a uniform resample instead of a delta step
    pub random_mutation_rate: f64,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            mutation_rate: 0.25,
            random_mutation_rate: 0.5,
        }
    }
}
