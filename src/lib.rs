//! # moxen
//!
//! Artificial-life harness: foraging and predatory agents ("moxen") on a
//! toroidal Game of Life, evolved by a genetic algorithm.
//!
//! ## Features
//!
//! - **Automaton**: wrap-around Conway grid where each cell holds its live-neighbor count
//! - **Pluggable minds**: moxen decide through the [`engine::DecisionEngine`] trait
//! - **Parallel sensing**: raycasts for every mox run on Rayon
//! - **Evolvable**: parameter and instinct genomes, mutation and meld
//! - **Resumable**: bincode checkpoints including the random stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use moxen::{Config, Evolver, World};
//! use moxen::automaton::Automaton;
//! use moxen::engine::ReflexFactory;
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let cells = Automaton::load("cells.txt").unwrap();
//! let world = World::new(cells, config.sensors);
//!
//! let mut evolver = Evolver::new(config, vec![world], 50, Arc::new(ReflexFactory)).unwrap();
//! evolver.run(10, None).unwrap();
//! print!("{}", evolver.history().table());
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use moxen::checkpoint::Checkpoint;
//! use moxen::engine::ReflexFactory;
//! use moxen::Evolver;
//! use std::sync::Arc;
//!
//! let checkpoint = Checkpoint::load("output/checkpoint_00000010.bin").unwrap();
//! let mut evolver = Evolver::from_checkpoint(checkpoint, Arc::new(ReflexFactory)).unwrap();
//! evolver.step_generation().unwrap();
//! ```

pub mod automaton;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod evolution;
pub mod genetics;
pub mod mox;
pub mod stats;
pub mod textio;
pub mod world;

// Re-export main types
pub use automaton::Automaton;
pub use config::Config;
pub use evolution::Evolver;
pub use mox::{Mox, Species};
pub use world::World;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
