//! Ordered gene collections with mutation, copying and uniform crossover.

use super::gene::{Gene, GeneValue};
use super::MutationRates;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors from mixing genomes of different layouts
#[derive(Debug, Clone, PartialEq)]
pub enum GenomeError {
    LengthMismatch { expected: usize, found: usize },
    TypeMismatch {
        gene: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for GenomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, found } => {
                write!(f, "Genome length mismatch: expected {}, found {}", expected, found)
            }
            Self::TypeMismatch { gene, expected, found } => {
                write!(f, "Gene {} expects {} value, found {}", gene, expected, found)
            }
        }
    }
}

impl std::error::Error for GenomeError {}

/// Ordered genes plus the genome's own random stream.
///
/// Order matters: values are exchanged positionally and domain genomes clamp
/// later genes against earlier ones.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<Gene>,
    rates: MutationRates,
    rng: ChaCha8Rng,
}

impl Genome {
    pub fn new(rates: MutationRates, seed: u64) -> Self {
        Self {
            genes: Vec::new(),
            rates,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn rates(&self) -> MutationRates {
        self.rates
    }

    /// Append an int gene seeded from this genome's stream
    pub fn add_int(&mut self, name: &str, value: i32, min: i32, max: i32, delta: i32) {
        let seed = self.rng.gen();
        self.genes.push(Gene::int(name, value, min, max, delta, self.rates, seed));
    }

    pub fn add_float(&mut self, name: &str, value: f32, min: f32, max: f32, delta: f32) {
        let seed = self.rng.gen();
        self.genes.push(Gene::float(name, value, min, max, delta, self.rates, seed));
    }

    pub fn add_double(&mut self, name: &str, value: f64, min: f64, max: f64, delta: f64) {
        let seed = self.rng.gen();
        self.genes.push(Gene::double(name, value, min, max, delta, self.rates, seed));
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn gene(&self, name: &str) -> Option<&Gene> {
        self.genes.iter().find(|g| g.name() == name)
    }

    pub fn gene_mut(&mut self, name: &str) -> Option<&mut Gene> {
        self.genes.iter_mut().find(|g| g.name() == name)
    }

    /// Fair coin from the genome's stream
    pub fn flip(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    pub fn mutate(&mut self) {
        for gene in &mut self.genes {
            gene.mutate();
        }
    }

    fn check_layout(&self, other: &Genome) -> Result<(), GenomeError> {
        if self.genes.len() != other.genes.len() {
            return Err(GenomeError::LengthMismatch {
                expected: self.genes.len(),
                found: other.genes.len(),
            });
        }
        Ok(())
    }

    /// Copy every value of `from`, position by position.
    pub fn copy_values(&mut self, from: &Genome) -> Result<(), GenomeError> {
        self.check_layout(from)?;
        for (gene, source) in self.genes.iter_mut().zip(&from.genes) {
            gene.copy_value(source)?;
        }
        Ok(())
    }

    /// Uniform crossover: every gene takes the value of `a` or `b` on a
    /// fair coin.
    pub fn meld_values(&mut self, a: &Genome, b: &Genome) -> Result<(), GenomeError> {
        self.check_layout(a)?;
        self.check_layout(b)?;
        for i in 0..self.genes.len() {
            let source = if self.rng.gen_bool(0.5) { &a.genes[i] } else { &b.genes[i] };
            self.genes[i].copy_value(source)?;
        }
        Ok(())
    }

    /// Flatten to `(name, value)` strings
    pub fn key_values(&self) -> Vec<(String, String)> {
        self.genes
            .iter()
            .map(|g| (g.name().to_string(), g.value().to_string()))
            .collect()
    }

    pub fn values(&self) -> Vec<GeneValue> {
        self.genes.iter().map(Gene::value).collect()
    }

    /// Restore values saved with [`values`](Self::values).
    pub fn load_values(&mut self, values: &[GeneValue]) -> Result<(), GenomeError> {
        if values.len() != self.genes.len() {
            return Err(GenomeError::LengthMismatch {
                expected: self.genes.len(),
                found: values.len(),
            });
        }
        for (gene, &value) in self.genes.iter_mut().zip(values) {
            gene.set_value(value)?;
        }
        Ok(())
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for gene in &self.genes {
            writeln!(f, "{}", gene)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seed: u64, rates: MutationRates) -> Genome {
        let mut genome = Genome::new(rates, seed);
        for i in 0..8 {
            genome.add_int(&format!("I{}", i), 0, 0, 100, 1);
        }
        genome.add_double("D", 0.5, 0.0, 1.0, 0.1);
        genome.add_float("F", 2.0, 0.0, 10.0, 1.0);
        genome
    }

    #[test]
    fn test_meld_takes_parent_values() {
        let all = MutationRates {
            mutation_rate: 1.0,
            random_mutation_rate: 1.0,
        };
        let mut a = sample(1, all);
        let mut b = sample(2, all);
        a.mutate();
        b.mutate();

        let mut from_a = 0;
        let mut from_b = 0;
        for seed in 0..20 {
            let mut child = sample(100 + seed, all);
            child.meld_values(&a, &b).unwrap();
            for ((c, x), y) in child.values().iter().zip(a.values()).zip(b.values()) {
                assert!(*c == x || *c == y, "{:?} not from {:?} or {:?}", c, x, y);
                if *c == x && x != y {
                    from_a += 1;
                }
                if *c == y && x != y {
                    from_b += 1;
                }
            }
        }
        assert!(from_a > 0 && from_b > 0);
    }

    #[test]
    fn test_copy_and_load_values() {
        let rates = MutationRates::default();
        let mut a = sample(1, rates);
        for _ in 0..10 {
            a.mutate();
        }
        let mut b = sample(2, rates);
        b.copy_values(&a).unwrap();
        assert_eq!(a.values(), b.values());

        let mut c = sample(3, rates);
        c.load_values(&a.values()).unwrap();
        assert_eq!(c.key_values(), a.key_values());
    }

    #[test]
    fn test_layout_mismatch() {
        let rates = MutationRates::default();
        let mut a = sample(1, rates);
        let short = Genome::new(rates, 2);
        assert_eq!(
            a.copy_values(&short),
            Err(GenomeError::LengthMismatch { expected: 10, found: 0 })
        );
        assert!(a.load_values(&[GeneValue::Int(1)]).is_err());
    }

    #[test]
    fn test_key_values_and_display() {
        let genome = sample(1, MutationRates::default());
        let kv = genome.key_values();
        assert_eq!(kv[0], ("I0".to_string(), "0".to_string()));
        assert_eq!(kv[8], ("D".to_string(), "0.5".to_string()));
        assert!(genome.to_string().contains("F=2\n"));
    }

    #[test]
    fn test_seeded_genomes_are_reproducible() {
        let rates = MutationRates::default();
        let mut a = sample(4517, rates);
        let mut b = sample(4517, rates);
        for _ in 0..50 {
            a.mutate();
            b.mutate();
        }
        assert_eq!(a.values(), b.values());
    }
}
