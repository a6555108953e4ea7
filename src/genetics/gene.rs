//! A single bounded, self-seeded evolvable value.

use super::genome::GenomeError;
use super::MutationRates;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A gene value tagged with its type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GeneValue {
    Int(i32),
    Float(f32),
    Double(f64),
}

impl GeneValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v as f64,
            Self::Double(v) => v,
        }
    }
}

impl fmt::Display for GeneValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
enum Allele {
    Int { value: i32, min: i32, max: i32, delta: i32 },
    Float { value: f32, min: f32, max: f32, delta: f32 },
    Double { value: f64, min: f64, max: f64, delta: f64 },
}

/// Named gene with bounds, a mutation step and its own random stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Gene {
    name: String,
    allele: Allele,
    rates: MutationRates,
    rng: ChaCha8Rng,
}

impl Gene {
    pub fn int(name: &str, value: i32, min: i32, max: i32, delta: i32, rates: MutationRates, seed: u64) -> Self {
        Self::build(name, Allele::Int { value: value.clamp(min, max), min, max, delta }, rates, seed)
    }

    pub fn float(name: &str, value: f32, min: f32, max: f32, delta: f32, rates: MutationRates, seed: u64) -> Self {
        Self::build(name, Allele::Float { value: value.clamp(min, max), min, max, delta }, rates, seed)
    }

    pub fn double(name: &str, value: f64, min: f64, max: f64, delta: f64, rates: MutationRates, seed: u64) -> Self {
        Self::build(name, Allele::Double { value: value.clamp(min, max), min, max, delta }, rates, seed)
    }

    fn build(name: &str, allele: Allele, rates: MutationRates, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            allele,
            rates,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rates(&self) -> MutationRates {
        self.rates
    }

    pub fn value(&self) -> GeneValue {
        match self.allele {
            Allele::Int { value, .. } => GeneValue::Int(value),
            Allele::Float { value, .. } => GeneValue::Float(value),
            Allele::Double { value, .. } => GeneValue::Double(value),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.allele {
            Allele::Int { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Replace the value, clamped to the gene's bounds.
    pub fn set_value(&mut self, new: GeneValue) -> Result<(), GenomeError> {
        let expected = self.value().type_name();
        match (&mut self.allele, new) {
            (Allele::Int { value, min, max, .. }, GeneValue::Int(v)) => *value = v.clamp(*min, *max),
            (Allele::Float { value, min, max, .. }, GeneValue::Float(v)) => *value = v.clamp(*min, *max),
            (Allele::Double { value, min, max, .. }, GeneValue::Double(v)) => *value = v.clamp(*min, *max),
            _ => {
                return Err(GenomeError::TypeMismatch {
                    gene: self.name.clone(),
                    expected,
                    found: new.type_name(),
                })
            }
        }
        Ok(())
    }

    /// Take the value of another gene of the same type.
    pub fn copy_value(&mut self, from: &Gene) -> Result<(), GenomeError> {
        self.set_value(from.value())
    }

    /// Maybe change the value.
    ///
    /// Nothing happens unless a draw falls under `mutation_rate`. A second
    /// draw under `random_mutation_rate` resamples uniformly over the bounds,
    /// otherwise the value steps by `delta` in a random direction and is
    /// clamped.
    pub fn mutate(&mut self) {
        if self.rng.gen::<f64>() >= self.rates.mutation_rate {
            return;
        }
        let resample = self.rng.gen::<f64>() < self.rates.random_mutation_rate;
        let rng = &mut self.rng;
        match &mut self.allele {
            Allele::Int { value, min, max, delta } => {
                *value = if resample {
                    rng.gen_range(*min..=*max)
                } else if rng.gen_bool(0.5) {
                    value.saturating_add(*delta).min(*max)
                } else {
                    value.saturating_sub(*delta).max(*min)
                };
            }
            Allele::Float { value, min, max, delta } => {
                *value = if resample {
                    rng.gen_range(*min..=*max)
                } else if rng.gen_bool(0.5) {
                    (*value + *delta).min(*max)
                } else {
                    (*value - *delta).max(*min)
                };
            }
            Allele::Double { value, min, max, delta } => {
                *value = if resample {
                    rng.gen_range(*min..=*max)
                } else if rng.gen_bool(0.5) {
                    (*value + *delta).min(*max)
                } else {
                    (*value - *delta).max(*min)
                };
            }
        }
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn rates(mutation_rate: f64, random_mutation_rate: f64) -> MutationRates {
        MutationRates {
            mutation_rate,
            random_mutation_rate,
        }
    }

    #[test]
    fn test_mutation_stays_in_bounds() {
        let mut int = Gene::int("i", 3, 1, 5, 1, rates(1.0, 0.3), 7);
        let mut float = Gene::float("f", 0.0, 0.0, 10.0, 1.0, rates(1.0, 0.3), 8);
        let mut double = Gene::double("d", 0.1, 0.05, 0.9, 0.05, rates(1.0, 0.3), 9);
        for _ in 0..1000 {
            int.mutate();
            float.mutate();
            double.mutate();
            let v = int.as_int().unwrap();
            assert!((1..=5).contains(&v));
            let GeneValue::Float(f) = float.value() else { panic!() };
            assert!((0.0..=10.0).contains(&f));
            let GeneValue::Double(d) = double.value() else { panic!() };
            assert!((0.05..=0.9).contains(&d));
        }
    }

    #[test]
    fn test_zero_rate_is_noop() {
        for seed in 0..50 {
            let mut gene = Gene::double("d", 0.5, 0.0, 1.0, 0.1, rates(0.0, 1.0), seed);
            for _ in 0..20 {
                gene.mutate();
            }
            assert_eq!(gene.value(), GeneValue::Double(0.5));
        }
    }

    #[test]
    fn test_full_random_mutation_covers_range() {
        let mut gene = Gene::int("i", 0, 0, 10, 1, rates(1.0, 1.0), 4517);
        let mut seen = HashSet::new();
        for _ in 0..300 {
            gene.mutate();
            seen.insert(gene.as_int().unwrap());
        }
        assert!(seen.len() >= 10, "visited {:?}", seen);
        assert!(seen.contains(&0) && seen.contains(&10));
    }

    #[test]
    fn test_delta_step_moves_by_delta() {
        let mut gene = Gene::int("i", 50, -1000, 1000, 5, rates(1.0, 0.0), 11);
        for _ in 0..20 {
            let before = gene.as_int().unwrap();
            gene.mutate();
            let after = gene.as_int().unwrap();
            assert_eq!((after - before).abs(), 5);
        }
    }

    #[test]
    fn test_same_seed_same_path() {
        let mut a = Gene::double("d", 0.5, 0.0, 1.0, 0.1, rates(0.5, 0.5), 99);
        let mut b = a.clone();
        for _ in 0..100 {
            a.mutate();
            b.mutate();
            assert_eq!(a.value(), b.value());
        }
    }

    #[test]
    fn test_set_value_checks_type() {
        let mut gene = Gene::int("MAX_MEDIATORS", 100, 50, 500, 50, rates(0.25, 0.5), 1);
        assert!(gene.set_value(GeneValue::Double(1.0)).is_err());
        gene.set_value(GeneValue::Int(9000)).unwrap();
        assert_eq!(gene.as_int(), Some(500));
        assert_eq!(gene.to_string(), "MAX_MEDIATORS=500");
    }
}
