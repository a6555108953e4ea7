//! Populations and truncation selection.

use super::member::Member;
use crate::config::PopulationConfig;
use crate::mox::Species;
use serde::{Deserialize, Serialize};

/// Whether higher or lower fitness wins
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessDirection {
    Maximize,
    /// Fitness is a cost, e.g. steps until food was found
    Minimize,
}

impl FitnessDirection {
    /// True when `a` is strictly better than `b`
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Self::Maximize => a > b,
            Self::Minimize => a < b,
        }
    }
}

/// Indices of the `keep` best entries of `fitness`, best first.
///
/// Repeated best extraction: ties go to the lower index.
pub fn select(fitness: &[f64], keep: usize, direction: FitnessDirection) -> Vec<usize> {
    let mut taken = vec![false; fitness.len()];
    let mut order = Vec::with_capacity(keep.min(fitness.len()));
    for _ in 0..keep.min(fitness.len()) {
        let mut best: Option<usize> = None;
        for (j, &f) in fitness.iter().enumerate() {
            if taken[j] {
                continue;
            }
            if best.map_or(true, |b| direction.better(f, fitness[b])) {
                best = Some(j);
            }
        }
        if let Some(b) = best {
            taken[b] = true;
            order.push(b);
        }
    }
    order
}

/// Best and average fitness of the retained members
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneSummary {
    pub best: f64,
    pub average: f64,
}

/// The members of one species.
///
/// After pruning, `members[..fit_size]` hold the fit population in selection
/// order; mutants and offspring are appended behind them.
#[derive(Debug)]
pub struct Population {
    pub species: Species,
    pub direction: FitnessDirection,
    pub sizes: PopulationConfig,
    pub members: Vec<Member>,
}

impl Population {
    pub fn new(species: Species, direction: FitnessDirection, sizes: PopulationConfig) -> Self {
        Self {
            species,
            direction,
            sizes,
            members: Vec::with_capacity(sizes.total()),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members that survived the last prune
    pub fn fit_len(&self) -> usize {
        self.sizes.fit_size.min(self.members.len())
    }

    pub fn reset_fitness(&mut self) {
        for member in &mut self.members {
            member.fitness = 0.0;
        }
    }

    /// Keep the `fit_size` best members, best first, and drop the rest.
    pub fn prune(&mut self) -> PruneSummary {
        let fitness: Vec<f64> = self.members.iter().map(|m| m.fitness).collect();
        let order = select(&fitness, self.sizes.fit_size, self.direction);

        let mut slots: Vec<Option<Member>> = self.members.drain(..).map(Some).collect();
        self.members = order.into_iter().filter_map(|i| slots[i].take()).collect();

        match self.members.first() {
            Some(best) => PruneSummary {
                best: best.fitness,
                average: self.members.iter().map(|m| m.fitness).sum::<f64>() / self.members.len() as f64,
            },
            None => PruneSummary::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReflexFactory;
    use crate::evolution::member::Breeder;
    use crate::genetics::MutationRates;
    use crate::mox::{Direction, Pose};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    #[test]
    fn test_select_maximize_is_non_increasing() {
        let fitness = [1.0, 5.0, 3.0, 5.0, 0.5, 4.0];
        let order = select(&fitness, 4, FitnessDirection::Maximize);
        assert_eq!(order, vec![1, 3, 5, 2]);
        assert!(order.windows(2).all(|w| fitness[w[0]] >= fitness[w[1]]));
    }

    #[test]
    fn test_select_minimize_is_non_decreasing() {
        let fitness = [7.0, 2.0, 9.0, 2.0, 4.0];
        let order = select(&fitness, 3, FitnessDirection::Minimize);
        assert_eq!(order, vec![1, 3, 4]);
        assert!(order.windows(2).all(|w| fitness[w[0]] <= fitness[w[1]]));
    }

    #[test]
    fn test_select_more_than_available() {
        assert_eq!(select(&[1.0, 2.0], 5, FitnessDirection::Maximize), vec![1, 0]);
        assert!(select(&[], 3, FitnessDirection::Minimize).is_empty());
    }

    #[test]
    fn test_prune_population() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut breeder = Breeder::new(MutationRates::default(), 10.0, Arc::new(ReflexFactory));
        let sizes = PopulationConfig {
            fit_size: 2,
            num_mutants: 1,
            num_offspring: 1,
        };
        let mut population = Population::new(Species::Forager, FitnessDirection::Maximize, sizes);
        for fitness in [1.0, 3.0, 2.0, 0.0] {
            let mut member = breeder.fresh(Species::Forager, Pose::new(0, 0, Direction::North), &mut rng);
            member.fitness = fitness;
            population.members.push(member);
        }

        let summary = population.prune();
        assert_eq!(population.len(), 2);
        assert_eq!(population.members[0].mox.id, 1);
        assert_eq!(population.members[1].mox.id, 2);
        assert_eq!(summary.best, 3.0);
        assert_eq!(summary.average, 2.5);
    }
}
