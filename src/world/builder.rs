//! Random world generation.

use super::World;
use crate::automaton::{Automaton, Neighborhood, BLUE_CELL, GREEN_CELL};
use crate::config::SensorConfig;
use crate::engine::{EngineFactory, EngineSpec};
use crate::mox::{Direction, Mox, MoxId, Pose, Species};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;

/// Seed a grid with live cells at `probability`, run one generation and
/// checkpoint the result.
pub fn random_automaton<R: Rng>(
    width: usize,
    height: usize,
    probability: f64,
    neighborhood: Neighborhood,
    rng: &mut R,
) -> Automaton {
    let mut automaton = Automaton::new(width, height).with_neighborhood(neighborhood);
    for y in 0..height {
        for x in 0..width {
            if rng.gen::<f64>() < probability {
                automaton.set(x, y, 1);
            }
        }
    }
    automaton.step();
    automaton.checkpoint();
    automaton
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// No attempt produced food counts inside the bounds
    Exhausted { attempts: u32 },
    InvalidBounds(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Exhausted { attempts } => {
                write!(f, "no world met the cell bounds after {} attempts", attempts)
            }
            BuildError::InvalidBounds(msg) => write!(f, "invalid builder settings: {}", msg),
        }
    }
}

impl std::error::Error for BuildError {}

/// Searches for a world whose blue and green cell counts fall inside the
/// requested bounds after the automaton has run for `steps` generations.
#[derive(Debug, Clone)]
pub struct WorldBuilder {
    pub width: usize,
    pub height: usize,
    pub steps: usize,
    pub live_cell_probability: f64,
    pub neighborhood: Neighborhood,
    pub seed: u64,
    pub min_blue: usize,
    pub max_blue: usize,
    pub min_green: usize,
    pub max_green: usize,
    pub max_attempts: u32,
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            steps: 0,
            live_cell_probability: 0.1,
            neighborhood: Neighborhood::Moore,
            seed: 4517,
            min_blue: 0,
            max_blue: usize::MAX,
            min_green: 0,
            max_green: usize::MAX,
            max_attempts: 1000,
        }
    }
}

impl WorldBuilder {
    fn validate(&self) -> Result<(), BuildError> {
        if self.width == 0 || self.height == 0 {
            return Err(BuildError::InvalidBounds("grid dimensions must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.live_cell_probability) {
            return Err(BuildError::InvalidBounds(
                "live cell probability must be between 0 and 1".to_string(),
            ));
        }
        if self.min_blue > self.max_blue || self.min_green > self.max_green {
            return Err(BuildError::InvalidBounds("minimum exceeds maximum".to_string()));
        }
        Ok(())
    }

    /// Try fresh grids until one fits. The returned world is checkpointed at
    /// the state that passed the check.
    pub fn build(&self, sensors: SensorConfig) -> Result<World, BuildError> {
        self.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        for attempt in 1..=self.max_attempts {
            let mut automaton = random_automaton(
                self.width,
                self.height,
                self.live_cell_probability,
                self.neighborhood,
                &mut rng,
            );
            automaton.step_n(self.steps);
            automaton.checkpoint();

            let blue = automaton.count(BLUE_CELL);
            let green = automaton.count(GREEN_CELL);
            debug!("attempt {}: blue={} green={}", attempt, blue, green);
            if (self.min_blue..=self.max_blue).contains(&blue) && (self.min_green..=self.max_green).contains(&green) {
                return Ok(World::new(automaton, sensors));
            }
        }
        Err(BuildError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}

/// Scatter moxen with random poses. Ids run from zero, foragers first, and
/// every engine gets its own seed.
pub fn spawn_moxen(
    world: &World,
    foragers: usize,
    predators: usize,
    seed: u64,
    factory: &dyn EngineFactory,
) -> Vec<Mox> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let species = std::iter::repeat(Species::Forager)
        .take(foragers)
        .chain(std::iter::repeat(Species::Predator).take(predators));
    species
        .enumerate()
        .map(|(id, species)| {
            let pose = random_pose(world, &mut rng);
            let engine = factory.create(&EngineSpec::new(Species::BASE_NEEDS, rng.gen()));
            Mox::new(id as MoxId, species, pose, engine)
        })
        .collect()
}

/// Uniform pose anywhere on the grid
pub fn random_pose<R: Rng>(world: &World, rng: &mut R) -> Pose {
    let x = rng.gen_range(0..world.width());
    let y = rng.gen_range(0..world.height());
    let direction = Direction::ALL[rng.gen_range(0..4)];
    Pose::new(x, y, direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReflexFactory;

    #[test]
    fn test_random_automaton_is_checkpointed() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let automaton = random_automaton(16, 16, 0.3, Neighborhood::Moore, &mut rng);
        assert_eq!(automaton.cells(), automaton.restore_cells());
        assert!(automaton.live_count() > 0);
    }

    #[test]
    fn test_zero_probability_is_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let automaton = random_automaton(8, 8, 0.0, Neighborhood::Moore, &mut rng);
        assert_eq!(automaton.live_count(), 0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = WorldBuilder {
            width: 12,
            height: 12,
            steps: 3,
            live_cell_probability: 0.3,
            ..WorldBuilder::default()
        };
        let a = builder.build(SensorConfig::default()).unwrap();
        let b = builder.build(SensorConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_respects_bounds() {
        let builder = WorldBuilder {
            width: 16,
            height: 16,
            live_cell_probability: 0.25,
            min_blue: 3,
            max_blue: 200,
            ..WorldBuilder::default()
        };
        let world = builder.build(SensorConfig::default()).unwrap();
        assert!(world.automaton().count(BLUE_CELL) >= 3);
    }

    #[test]
    fn test_impossible_bounds_exhaust() {
        let builder = WorldBuilder {
            width: 4,
            height: 4,
            live_cell_probability: 0.0,
            min_blue: 1,
            max_attempts: 5,
            ..WorldBuilder::default()
        };
        assert_eq!(
            builder.build(SensorConfig::default()),
            Err(BuildError::Exhausted { attempts: 5 })
        );

        let inverted = WorldBuilder {
            min_green: 5,
            max_green: 1,
            ..WorldBuilder::default()
        };
        assert!(matches!(
            inverted.build(SensorConfig::default()),
            Err(BuildError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_spawn_moxen() {
        let world = World::new(Automaton::new(10, 10), SensorConfig::default());
        let moxen = spawn_moxen(&world, 3, 2, 7, &ReflexFactory);
        assert_eq!(moxen.len(), 5);
        assert_eq!(moxen.iter().filter(|m| m.species == Species::Predator).count(), 2);
        assert_eq!(moxen[4].id, 4);
        assert!(moxen.iter().all(|m| m.live_pose.x < 10 && m.live_pose.y < 10));

        let again = spawn_moxen(&world, 3, 2, 7, &ReflexFactory);
        assert_eq!(
            moxen.iter().map(|m| m.origin_pose).collect::<Vec<_>>(),
            again.iter().map(|m| m.origin_pose).collect::<Vec<_>>()
        );
    }
}
