//! Evolution driver.
//!
//! Each generation runs `Evaluate → Prune → Mutate → Mate`:
//! - evaluate scores every member, either alone in each world
//!   ([`EvolutionMode::Individual`]) or all together in one world
//!   ([`EvolutionMode::System`])
//! - prune keeps the fit population, best first
//! - mutate and mate refill the population from the fit members
//!
//! Fitness directions are explicit per population. Foragers always maximize
//! meals. Predators in individual mode minimize the step at which they first
//! ate; in system mode they maximize meals.

pub mod member;
pub mod population;
pub mod training;

pub use member::{Breeder, Member, MemberRecord, MAX_INSTINCTS, NUM_INSTINCTS};
pub use population::{select, FitnessDirection, Population, PruneSummary};
pub use training::{city_block, train_forager, training_response};

use crate::automaton::Automaton;
use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointManager};
use crate::config::{Config, CycleBudgetConfig, EvolutionMode, PopulationMode};
use crate::engine::EngineFactory;
use crate::genetics::GenomeError;
use crate::mox::{CycleBudget, Direction, Mox, Pose, Species};
use crate::stats::{FitnessHistory, GenerationStats};
use crate::textio::{FormatError, LineReader};
use crate::world::World;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Errors from setting up or running an evolution
#[derive(Debug)]
pub enum EvolutionError {
    Setup(String),
    Genome(GenomeError),
    Checkpoint(CheckpointError),
    Io(std::io::Error),
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(msg) => write!(f, "Invalid setup: {}", msg),
            Self::Genome(e) => write!(f, "Genome error: {}", e),
            Self::Checkpoint(e) => write!(f, "Checkpoint error: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for EvolutionError {}

impl From<GenomeError> for EvolutionError {
    fn from(e: GenomeError) -> Self {
        Self::Genome(e)
    }
}

impl From<CheckpointError> for EvolutionError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}

impl From<std::io::Error> for EvolutionError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Predator fitness direction for an evaluation mode
pub fn predator_direction(mode: EvolutionMode) -> FitnessDirection {
    match mode {
        EvolutionMode::Individual => FitnessDirection::Minimize,
        EvolutionMode::System => FitnessDirection::Maximize,
    }
}

/// Run `candidate`, and optionally a partner, through one trial of `steps`
/// ticks. `after_step` sees the candidate after every tick and may stop the
/// trial. Returns the candidate's engine time when it overran the budget.
fn run_trial<F>(
    world: &mut World,
    candidate: &mut Mox,
    partner: Option<&mut Mox>,
    steps: usize,
    step_automaton: bool,
    budget: &CycleBudget,
    mut after_step: F,
) -> Option<Duration>
where
    F: FnMut(usize, &mut Mox) -> ControlFlow<()>,
{
    let mut moxen = Vec::with_capacity(2);
    if let Some(partner) = partner {
        moxen.push(partner);
    }
    moxen.push(candidate);
    let mut trial = world.trial(moxen);
    let c = trial.len() - 1;

    for step in 0..steps {
        trial.mox_mut(c).start_cycle_clock();
        trial.step();
        let mox = trial.mox_mut(c);
        mox.stop_cycle_clock();
        if after_step(step, mox).is_break() {
            break;
        }
        if budget.exceeded(mox.cycle_time()) {
            return Some(mox.cycle_time());
        }
        if step_automaton {
            trial.step_automaton();
        }
    }
    None
}

fn calibrate(config: &CycleBudgetConfig) -> CycleBudget {
    if !config.enabled {
        return CycleBudget::unlimited();
    }
    let budget = CycleBudget::calibrate(config.calibration_iterations, config.multiplier);
    info!("Engine cycle budget: {:?}", budget.limit());
    budget
}

/// Apply the run's sensor and neighborhood settings and check the worlds
/// can be evolved in.
fn prepare_worlds(config: &Config, worlds: &mut [World]) -> Result<(), EvolutionError> {
    let Some(first) = worlds.first() else {
        return Err(EvolutionError::Setup("at least one world is required".to_string()));
    };
    let (w, h) = (first.width(), first.height());
    if worlds.iter().any(|world| world.width() != w || world.height() != h) {
        return Err(EvolutionError::Setup("all worlds must have the same dimensions".to_string()));
    }
    if config.evolution.mode == EvolutionMode::System && worlds.len() > 1 {
        return Err(EvolutionError::Setup("system evolution runs in a single world".to_string()));
    }
    for world in worlds.iter_mut() {
        world.apply_config(config);
    }
    Ok(())
}

/// Founder at `pose`, then generation-zero mutants of it.
fn found_population<R: Rng>(
    species: Species,
    direction: FitnessDirection,
    config: &Config,
    pose: Pose,
    breeder: &mut Breeder,
    rng: &mut R,
) -> Result<Population, GenomeError> {
    let sizes = match species {
        Species::Forager => config.foragers,
        Species::Predator => config.predators,
    };
    let mut population = Population::new(species, direction, sizes);
    let founder = breeder.fresh(species, pose, rng);
    for _ in 1..sizes.total() {
        let mut mutant = breeder.mutant(&founder, rng)?;
        mutant.generation = 0;
        population.members.push(mutant);
    }
    population.members.insert(0, founder);
    Ok(population)
}

/// Evolves forager and optionally predator populations.
pub struct Evolver {
    config: Config,
    steps: usize,
    worlds: Vec<World>,
    foragers: Population,
    predators: Option<Population>,
    breeder: Breeder,
    rng: ChaCha8Rng,
    /// Generations completed
    generation: u32,
    history: FitnessHistory,
    budget: CycleBudget,
}

impl Evolver {
    /// Start a new run in `worlds`, with trials of `steps` ticks.
    pub fn new(
        config: Config,
        mut worlds: Vec<World>,
        steps: usize,
        factory: Arc<dyn EngineFactory>,
    ) -> Result<Self, EvolutionError> {
        config.validate().map_err(EvolutionError::Setup)?;
        prepare_worlds(&config, &mut worlds)?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.evolution.random_seed);
        let mut breeder = Breeder::new(config.evolution.rates(), config.sensors.max_sensor_range, factory);
        let (w, h) = (worlds[0].width(), worlds[0].height());

        let foragers = found_population(
            Species::Forager,
            FitnessDirection::Maximize,
            &config,
            Pose::new(0, 0, Direction::North),
            &mut breeder,
            &mut rng,
        )?;
        let predators = match config.evolution.populations {
            PopulationMode::ForagersOnly => None,
            PopulationMode::ForagersAndPredators => Some(found_population(
                Species::Predator,
                predator_direction(config.evolution.mode),
                &config,
                Pose::new(w - 1, h - 1, Direction::South),
                &mut breeder,
                &mut rng,
            )?),
        };

        info!(
            "New evolution: {} world(s) of {}x{}, {} steps, mode {:?}",
            worlds.len(),
            w,
            h,
            steps,
            config.evolution.mode
        );
        let budget = calibrate(&config.cycle_budget);
        Ok(Self {
            config,
            steps,
            worlds,
            foragers,
            predators,
            breeder,
            rng,
            generation: 0,
            history: FitnessHistory::new(),
            budget,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Generations completed so far
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn history(&self) -> &FitnessHistory {
        &self.history
    }

    pub fn worlds(&self) -> &[World] {
        &self.worlds
    }

    pub fn foragers(&self) -> &Population {
        &self.foragers
    }

    pub fn predators(&self) -> Option<&Population> {
        self.predators.as_ref()
    }

    pub fn budget(&self) -> CycleBudget {
        self.budget
    }

    fn populations(&self) -> impl Iterator<Item = &Population> {
        std::iter::once(&self.foragers).chain(self.predators.as_ref())
    }

    /// One forager's trials in every world, with a random fit predator when
    /// predators evolve. Returns the fitness and any cycle-time overrun.
    fn forager_trials(&mut self, index: usize) -> (f64, Option<Duration>) {
        let partner = match &self.predators {
            Some(p) if p.fit_len() > 0 => Some(self.rng.gen_range(0..p.fit_len())),
            _ => None,
        };
        let (steps, step_automaton, budget) = (self.steps, self.config.world.step_automaton, self.budget);
        let forager = &mut self.foragers.members[index].mox;
        let mut predator = match (partner, self.predators.as_mut()) {
            (Some(k), Some(p)) => Some(&mut p.members[k].mox),
            _ => None,
        };

        forager.refill();
        if let Some(p) = predator.as_deref_mut() {
            p.refill();
        }
        let mut fitness = 0.0;
        let mut overrun = None;
        for world in &mut self.worlds {
            let result = run_trial(world, forager, predator.as_deref_mut(), steps, step_automaton, &budget, |step, mox| {
                if !mox.alive {
                    return ControlFlow::Break(());
                }
                if mox.need() == 0.0 {
                    fitness += 1.0 + 1.0 / (step as f64 + 1.0);
                    mox.refill();
                }
                ControlFlow::Continue(())
            });
            overrun = overrun.or(result);
        }
        (fitness, overrun)
    }

    /// One predator's trials in every world against a random fit forager.
    /// Fitness adds the step of the first meal, or `steps` without one.
    fn predator_trials(&mut self, index: usize) -> (f64, Option<Duration>) {
        let fit = self.foragers.fit_len();
        if fit == 0 {
            return (0.0, None);
        }
        let prey = self.rng.gen_range(0..fit);
        let (steps, step_automaton, budget) = (self.steps, self.config.world.step_automaton, self.budget);
        let Some(predators) = self.predators.as_mut() else {
            return (0.0, None);
        };
        let predator = &mut predators.members[index].mox;
        let forager = &mut self.foragers.members[prey].mox;

        predator.refill();
        forager.refill();
        let mut fitness = 0.0;
        let mut overrun = None;
        for world in &mut self.worlds {
            let mut food_step = steps;
            let result = run_trial(world, predator, Some(&mut *forager), steps, step_automaton, &budget, |step, mox| {
                if mox.need() == 0.0 {
                    food_step = step;
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            });
            fitness += food_step as f64;
            overrun = overrun.or(result);
        }
        (fitness, overrun)
    }

    /// Everybody in the single world at random poses. Meals score one point
    /// each; overrunning the cycle budget kills the mox.
    fn run_system(&mut self, scored: bool) {
        let (steps, step_automaton, budget) = (self.steps, self.config.world.step_automaton, self.budget);
        let world = &self.worlds[0];
        let rng = &mut self.rng;
        let members = self
            .foragers
            .members
            .iter_mut()
            .chain(self.predators.iter_mut().flat_map(|p| p.members.iter_mut()));
        for member in members {
            member.mox.refill();
            let pose = crate::world::random_pose(world, rng);
            member.mox.place(pose);
        }

        let moxen: Vec<&mut Mox> = self
            .foragers
            .members
            .iter_mut()
            .chain(self.predators.iter_mut().flat_map(|p| p.members.iter_mut()))
            .map(|m| &mut m.mox)
            .collect();
        let mut gains = vec![0.0; moxen.len()];
        let mut trial = self.worlds[0].trial(moxen);
        for _ in 0..steps {
            for mox in trial.moxen_mut().iter_mut() {
                mox.start_cycle_clock();
            }
            trial.step();
            for (k, mox) in trial.moxen_mut().iter_mut().enumerate() {
                mox.stop_cycle_clock();
                if !mox.alive {
                    continue;
                }
                if mox.need() == 0.0 {
                    gains[k] += 1.0;
                    mox.refill();
                }
                if budget.exceeded(mox.cycle_time()) {
                    debug!("{} killed: excess cycle time={:?}", mox.info(), mox.cycle_time());
                    mox.alive = false;
                }
            }
            if step_automaton {
                trial.step_automaton();
            }
        }
        drop(trial);

        if scored {
            let members = self
                .foragers
                .members
                .iter_mut()
                .chain(self.predators.iter_mut().flat_map(|p| p.members.iter_mut()));
            for (member, gain) in members.zip(gains) {
                member.fitness = gain;
            }
        }
    }

    /// Give new members unscored experience before they compete with the
    /// fit members.
    fn prepare(&mut self) {
        if !self.config.evolution.prepare_new_members {
            return;
        }
        match self.config.evolution.mode {
            EvolutionMode::Individual => {
                let runs = self.generation.min(self.config.evolution.max_preparation_trials);
                for run in 0..runs {
                    debug!("Preparation run {} of {}", run + 1, runs);
                    for i in self.foragers.sizes.fit_size..self.foragers.len() {
                        self.forager_trials(i);
                    }
                    let new_predators = self.predators.as_ref().map_or(0..0, |p| p.sizes.fit_size..p.len());
                    for i in new_predators {
                        self.predator_trials(i);
                    }
                }
            }
            EvolutionMode::System => {
                debug!("Preparing new moxen");
                self.run_system(false);
            }
        }
    }

    /// Drive every forager toward food in every world.
    pub fn train(&mut self) {
        info!("Training foragers");
        let (steps, step_automaton) = (self.steps, self.config.world.step_automaton);
        for member in &mut self.foragers.members {
            for world in &mut self.worlds {
                train_forager(world, &mut member.mox, steps, step_automaton);
            }
        }
    }

    /// Score every member.
    pub fn evaluate(&mut self) {
        self.prepare();
        self.foragers.reset_fitness();
        if let Some(p) = self.predators.as_mut() {
            p.reset_fitness();
        }

        match self.config.evolution.mode {
            EvolutionMode::Individual => {
                for i in 0..self.foragers.len() {
                    let (fitness, overrun) = self.forager_trials(i);
                    let member = &mut self.foragers.members[i];
                    member.fitness = fitness;
                    let eaten = if member.mox.alive { "" } else { ", eaten" };
                    match overrun {
                        Some(t) => debug!("member={}, {}{}, excess cycle time={:?}", i, member.info(), eaten, t),
                        None => debug!("member={}, {}{}", i, member.info(), eaten),
                    }
                }
                let count = self.predators.as_ref().map_or(0, Population::len);
                for i in 0..count {
                    let (fitness, overrun) = self.predator_trials(i);
                    if let Some(p) = self.predators.as_mut() {
                        let member = &mut p.members[i];
                        member.fitness = fitness;
                        match overrun {
                            Some(t) => debug!("member={}, {}, excess cycle time={:?}", i, member.info(), t),
                            None => debug!("member={}, {}", i, member.info()),
                        }
                    }
                }
            }
            EvolutionMode::System => self.run_system(true),
        }
    }

    /// Truncation selection on every population.
    pub fn prune(&mut self) -> GenerationStats {
        let foragers = self.foragers.prune();
        let predators = self.predators.as_mut().map(Population::prune);
        for population in self.populations() {
            for member in &population.members {
                debug!("fit: {}", member.info());
            }
        }
        GenerationStats {
            generation: self.generation,
            forager_best: foragers.best,
            forager_average: foragers.average,
            predator_best: predators.map(|s| s.best),
            predator_average: predators.map(|s| s.average),
            elapsed_secs: 0.0,
        }
    }

    /// Append mutants of random fit members.
    pub fn mutate(&mut self) -> Result<(), GenomeError> {
        let populations = std::iter::once(&mut self.foragers).chain(self.predators.as_mut());
        for population in populations {
            let fit = population.fit_len();
            if fit == 0 {
                continue;
            }
            for _ in 0..population.sizes.num_mutants {
                let j = self.rng.gen_range(0..fit);
                let mutant = self.breeder.mutant(&population.members[j], &mut self.rng)?;
                debug!("member={} -> member={}, {}", j, population.len(), mutant.info());
                population.members.push(mutant);
            }
        }
        Ok(())
    }

    /// Append offspring of pairs of distinct random fit members.
    pub fn mate(&mut self) -> Result<(), GenomeError> {
        let populations = std::iter::once(&mut self.foragers).chain(self.predators.as_mut());
        for population in populations {
            let fit = population.fit_len();
            if fit < 2 {
                continue;
            }
            for _ in 0..population.sizes.num_offspring {
                let j = self.rng.gen_range(0..fit);
                let mut k = self.rng.gen_range(0..fit - 1);
                if k >= j {
                    k += 1;
                }
                let child = self
                    .breeder
                    .offspring(&population.members[j], &population.members[k], &mut self.rng)?;
                debug!("member={} + member={} -> member={}, {}", j, k, population.len(), child.info());
                population.members.push(child);
            }
        }
        Ok(())
    }

    /// Run one full generation.
    pub fn step_generation(&mut self) -> Result<GenerationStats, EvolutionError> {
        let started = Instant::now();
        info!("Generation {}", self.generation);

        if self.config.evolution.train_foragers {
            self.train();
        }
        self.evaluate();
        let mut stats = self.prune();
        self.mutate()?;
        self.mate()?;

        stats.elapsed_secs = started.elapsed().as_secs_f32();
        self.history.record(stats.clone());
        self.generation += 1;
        Ok(stats)
    }

    /// Run `generations` generations, checkpointing through `manager` when
    /// due and once more at the end.
    pub fn run(&mut self, generations: u32, manager: Option<&mut CheckpointManager>) -> Result<(), EvolutionError> {
        self.run_with_callback(generations, manager, |_| {})
    }

    /// Run with a callback after every generation
    pub fn run_with_callback<F>(
        &mut self,
        generations: u32,
        mut manager: Option<&mut CheckpointManager>,
        mut callback: F,
    ) -> Result<(), EvolutionError>
    where
        F: FnMut(&GenerationStats),
    {
        for _ in 0..generations {
            let stats = self.step_generation()?;
            callback(&stats);
            if let Some(manager) = manager.as_deref_mut() {
                if manager.should_save(self.generation) {
                    let path = manager.save(&self.checkpoint()?)?;
                    info!("Checkpoint saved: {}", path);
                }
            }
        }
        if let Some(manager) = manager {
            if manager.last_saved() != Some(self.generation) {
                let path = manager.save(&self.checkpoint()?)?;
                info!("Checkpoint saved: {}", path);
            }
        }
        Ok(())
    }

    /// Snapshot the whole run
    pub fn checkpoint(&self) -> Result<Checkpoint, CheckpointError> {
        let worlds = self
            .worlds
            .iter()
            .map(|world| {
                let mut text = Vec::new();
                world.automaton().write(&mut text)?;
                String::from_utf8(text).map_err(|e| CheckpointError::InvalidFormat(e.to_string()))
            })
            .collect::<Result<Vec<_>, CheckpointError>>()?;
        let records = |population: &Population| {
            population
                .members
                .iter()
                .map(Member::to_record)
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Checkpoint {
            version: Checkpoint::VERSION,
            generation: self.generation,
            config: self.config.clone(),
            steps: self.steps,
            worlds,
            foragers: records(&self.foragers)?,
            predators: match &self.predators {
                Some(p) => records(p)?,
                None => Vec::new(),
            },
            history: self.history.clone(),
            rng: self.rng.clone(),
            next_mox_id: self.breeder.next_id(),
        })
    }

    /// Resume a run from a checkpoint.
    pub fn from_checkpoint(checkpoint: Checkpoint, factory: Arc<dyn EngineFactory>) -> Result<Self, EvolutionError> {
        let Checkpoint {
            generation,
            config,
            steps,
            worlds,
            foragers,
            predators,
            history,
            rng,
            next_mox_id,
            ..
        } = checkpoint;

        let mut worlds = worlds
            .iter()
            .map(|text| {
                Automaton::read(&mut LineReader::new(text.as_bytes())).map(|a| World::new(a, config.sensors))
            })
            .collect::<Result<Vec<_>, FormatError>>()
            .map_err(CheckpointError::from)?;
        prepare_worlds(&config, &mut worlds)?;

        let load = |species: Species, direction: FitnessDirection, records: Vec<MemberRecord>| {
            let sizes = match species {
                Species::Forager => config.foragers,
                Species::Predator => config.predators,
            };
            let mut population = Population::new(species, direction, sizes);
            for record in records {
                population.members.push(Member::from_record(record, factory.as_ref())?);
            }
            Ok::<_, CheckpointError>(population)
        };
        let foragers = load(Species::Forager, FitnessDirection::Maximize, foragers)?;
        let predators = match config.evolution.populations {
            PopulationMode::ForagersOnly => None,
            PopulationMode::ForagersAndPredators => Some(load(
                Species::Predator,
                predator_direction(config.evolution.mode),
                predators,
            )?),
        };

        let mut breeder = Breeder::new(config.evolution.rates(), config.sensors.max_sensor_range, factory.clone());
        breeder.set_next_id(next_mox_id);
        info!("Resuming evolution after generation {}", generation);
        let budget = calibrate(&config.cycle_budget);

        Ok(Self {
            config,
            steps,
            worlds,
            foragers,
            predators,
            breeder,
            rng,
            generation,
            history,
            budget,
        })
    }

    /// Write one world file per member and world into `dir`, each holding
    /// only that member at its origin.
    pub fn extract(&mut self, dir: &Path) -> Result<Vec<PathBuf>, EvolutionError> {
        std::fs::create_dir_all(dir)?;
        let mut paths = Vec::new();
        let populations = std::iter::once(&mut self.foragers).chain(self.predators.as_mut());
        for population in populations {
            for member in &mut population.members {
                member.mox.refill();
                for (j, world) in self.worlds.iter_mut().enumerate() {
                    let path = dir.join(format!("mox_world_{}_{}_world_{}.mw", member.species, member.mox.id, j));
                    let trial = world.trial(vec![&mut member.mox]);
                    trial.world().save(&path, &[trial.mox(0)])?;
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }

    /// Every member's info and genomes
    pub fn properties(&self) -> String {
        let mut out = String::new();
        for population in self.populations() {
            out.push_str(&format!("{} population:\n", population.species));
            for (i, member) in population.members.iter().enumerate() {
                out.push_str(&format!("member={}, {}\n", i, member.properties()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::BLUE_CELL;
    use crate::config::PopulationConfig;
    use crate::engine::ReflexFactory;

    fn small_config(mode: EvolutionMode, populations: PopulationMode) -> Config {
        let mut config = Config::default();
        config.evolution.mode = mode;
        config.evolution.populations = populations;
        config.cycle_budget.enabled = false;
        let sizes = PopulationConfig {
            fit_size: 3,
            num_mutants: 2,
            num_offspring: 2,
        };
        config.foragers = sizes;
        config.predators = sizes;
        config
    }

    fn food_world(seed_cells: &[(usize, usize)]) -> World {
        let mut automaton = Automaton::new(10, 10);
        for &(x, y) in seed_cells {
            automaton.set(x, y, BLUE_CELL);
        }
        automaton.checkpoint();
        World::new(automaton, Default::default())
    }

    fn evolver(mode: EvolutionMode, populations: PopulationMode) -> Evolver {
        let worlds = match mode {
            EvolutionMode::Individual => vec![food_world(&[(0, 4), (5, 5)]), food_world(&[(3, 0)])],
            EvolutionMode::System => vec![food_world(&[(0, 4), (5, 5), (7, 2)])],
        };
        Evolver::new(small_config(mode, populations), worlds, 30, Arc::new(ReflexFactory)).unwrap()
    }

    #[test]
    fn test_initial_population() {
        let evolver = evolver(EvolutionMode::Individual, PopulationMode::ForagersAndPredators);
        assert_eq!(evolver.foragers().len(), 7);
        let predators = evolver.predators().unwrap();
        assert_eq!(predators.len(), 7);
        assert_eq!(predators.direction, FitnessDirection::Minimize);
        assert_eq!(evolver.foragers().members[0].mox.origin_pose, Pose::new(0, 0, Direction::North));
        assert_eq!(predators.members[3].mox.origin_pose, Pose::new(9, 9, Direction::South));
        assert!(evolver.foragers().members.iter().all(|m| m.generation == 0));
    }

    #[test]
    fn test_system_predators_maximize() {
        let evolver = evolver(EvolutionMode::System, PopulationMode::ForagersAndPredators);
        assert_eq!(evolver.predators().unwrap().direction, FitnessDirection::Maximize);
    }

    #[test]
    fn test_setup_errors() {
        let config = small_config(EvolutionMode::System, PopulationMode::ForagersOnly);
        let two = vec![food_world(&[]), food_world(&[])];
        assert!(matches!(
            Evolver::new(config.clone(), two, 10, Arc::new(ReflexFactory)),
            Err(EvolutionError::Setup(_))
        ));
        assert!(matches!(
            Evolver::new(config.clone(), Vec::new(), 10, Arc::new(ReflexFactory)),
            Err(EvolutionError::Setup(_))
        ));

        let mixed = vec![
            food_world(&[]),
            World::new(Automaton::new(4, 4), Default::default()),
        ];
        let individual = small_config(EvolutionMode::Individual, PopulationMode::ForagersOnly);
        assert!(matches!(
            Evolver::new(individual, mixed, 10, Arc::new(ReflexFactory)),
            Err(EvolutionError::Setup(_))
        ));
    }

    #[test]
    fn test_generation_cycle_individual() {
        let mut evolver = evolver(EvolutionMode::Individual, PopulationMode::ForagersAndPredators);
        for _ in 0..2 {
            let stats = evolver.step_generation().unwrap();
            assert!(stats.predator_best.is_some());
            assert!(stats.forager_best >= stats.forager_average);
            assert!(stats.predator_best.unwrap() <= stats.predator_average.unwrap());
            assert_eq!(evolver.foragers().len(), 7);
            assert_eq!(evolver.predators().unwrap().len(), 7);
        }
        assert_eq!(evolver.generation(), 2);
        assert_eq!(evolver.history().len(), 2);
        assert!(evolver.foragers().members[3..].iter().all(|m| m.generation >= 1));
    }

    #[test]
    fn test_generation_cycle_system() {
        let mut evolver = evolver(EvolutionMode::System, PopulationMode::ForagersAndPredators);
        let stats = evolver.step_generation().unwrap();
        assert!(stats.forager_best >= 0.0);
        assert_eq!(evolver.foragers().len(), 7);
        // Grid is back at its checkpoint after the shared trial.
        let world = &evolver.worlds()[0];
        assert_eq!(world.automaton().cells(), world.automaton().restore_cells());
    }

    #[test]
    fn test_prune_orders_fitness() {
        let mut evolver = evolver(EvolutionMode::Individual, PopulationMode::ForagersAndPredators);
        for (i, member) in evolver.foragers.members.iter_mut().enumerate() {
            member.fitness = (i % 4) as f64;
        }
        if let Some(p) = evolver.predators.as_mut() {
            for (i, member) in p.members.iter_mut().enumerate() {
                member.fitness = (10 - i) as f64;
            }
        }
        let stats = evolver.prune();
        let foragers: Vec<f64> = evolver.foragers().members.iter().map(|m| m.fitness).collect();
        assert_eq!(foragers, vec![3.0, 2.0, 2.0]);
        let predators: Vec<f64> = evolver.predators().unwrap().members.iter().map(|m| m.fitness).collect();
        assert_eq!(predators, vec![4.0, 5.0, 6.0]);
        assert_eq!(stats.forager_best, 3.0);
        assert_eq!(stats.predator_average, Some(5.0));
    }

    #[test]
    fn test_mate_needs_two_parents() {
        let mut evolver = evolver(EvolutionMode::Individual, PopulationMode::ForagersOnly);
        evolver.foragers.members.truncate(1);
        evolver.mate().unwrap();
        assert_eq!(evolver.foragers().len(), 1);
        evolver.mutate().unwrap();
        assert_eq!(evolver.foragers().len(), 3);
    }

    #[test]
    fn test_checkpoint_resume_matches() {
        let mut evolver = evolver(EvolutionMode::Individual, PopulationMode::ForagersOnly);
        evolver.step_generation().unwrap();
        let checkpoint = evolver.checkpoint().unwrap();
        let mut resumed = Evolver::from_checkpoint(checkpoint, Arc::new(ReflexFactory)).unwrap();
        assert_eq!(resumed.generation(), 1);
        assert_eq!(resumed.history(), evolver.history());
        assert_eq!(resumed.worlds(), evolver.worlds());

        let a = evolver.step_generation().unwrap();
        let b = resumed.step_generation().unwrap();
        assert_eq!(a.forager_best, b.forager_best);
        assert_eq!(a.forager_average, b.forager_average);
    }

    #[test]
    fn test_extract_and_properties() {
        let mut evolver = evolver(EvolutionMode::Individual, PopulationMode::ForagersOnly);
        let dir = tempfile::tempdir().unwrap();
        let paths = evolver.extract(dir.path()).unwrap();
        assert_eq!(paths.len(), 7 * 2);
        let name = paths[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("mox_world_forager_0_world_0"));

        let (world, moxen) = World::load(&paths[1], Default::default(), &ReflexFactory).unwrap();
        assert_eq!(moxen.len(), 1);
        assert_eq!(world.automaton().get(3, 0), BLUE_CELL);

        let properties = evolver.properties();
        assert!(properties.starts_with("forager population:"));
        assert!(properties.contains("parameters:"));
    }

    #[test]
    fn test_run_saves_final_checkpoint() {
        let mut evolver = evolver(EvolutionMode::Individual, PopulationMode::ForagersOnly);
        let dir = tempfile::tempdir().unwrap();
        let mut manager = CheckpointManager::new(dir.path().to_string_lossy().to_string(), 5, 3).unwrap();
        let mut seen = 0;
        evolver.run_with_callback(2, Some(&mut manager), |_| seen += 1).unwrap();
        assert_eq!(seen, 2);
        let latest = manager.find_latest().unwrap();
        let loaded = Checkpoint::load(latest).unwrap();
        assert_eq!(loaded.generation, 2);
        assert_eq!(loaded.foragers.len(), 7);
    }
}
