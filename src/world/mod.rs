//! World simulation engine: one automaton and the moxen living on it.
//!
//! A tick runs in phases:
//! 1. paint every live mox into the grid
//! 2. sense in parallel against the painted, unchanged grid
//! 3. cycle engines and record moves and meals, foragers first
//! 4. apply all moves and meals in a single pass

pub mod actions;
pub mod builder;
pub mod sensing;

pub use actions::{ActionPlan, Claim, TickOutcome};
pub use builder::{random_automaton, random_pose, spawn_moxen, BuildError, WorldBuilder};
pub use sensing::{perceive, Perception};

use crate::automaton::{Automaton, BLUE_CELL, EMPTY};
use crate::config::{Config, SensorConfig};
use crate::engine::{EngineFactory, Response};
use crate::mox::{Mox, Species};
use crate::textio::{FormatError, LineReader};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A Game of Life grid that moxen can be run on.
#[derive(Clone, Debug, PartialEq)]
pub struct World {
    automaton: Automaton,
    sensors: SensorConfig,
}

impl World {
    pub fn new(automaton: Automaton, sensors: SensorConfig) -> Self {
        Self { automaton, sensors }
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn automaton_mut(&mut self) -> &mut Automaton {
        &mut self.automaton
    }

    pub fn sensor_config(&self) -> &SensorConfig {
        &self.sensors
    }

    /// Take the sensor range and neighborhood from a run configuration.
    /// World files record neither.
    pub fn apply_config(&mut self, config: &Config) {
        self.sensors = config.sensors;
        self.automaton.set_neighborhood(config.world.neighborhood);
    }

    pub fn width(&self) -> usize {
        self.automaton.width()
    }

    pub fn height(&self) -> usize {
        self.automaton.height()
    }

    /// Restore the grid checkpoint and send every mox back to its origin.
    pub fn reset(&mut self, moxen: &mut [&mut Mox]) {
        self.automaton.restore();
        for mox in moxen.iter_mut() {
            mox.reset();
        }
    }

    /// Start a trial: reset the world and the given moxen, which stay
    /// borrowed until the trial is dropped.
    pub fn trial<'a>(&'a mut self, mut moxen: Vec<&'a mut Mox>) -> Trial<'a> {
        self.reset(&mut moxen);
        Trial { world: self, moxen }
    }

    pub fn step_automaton(&mut self) {
        self.automaton.step();
    }

    fn paint(&mut self, moxen: &[&mut Mox]) {
        for mox in moxen.iter().filter(|m| m.alive) {
            self.automaton
                .set(mox.live_pose.x, mox.live_pose.y, mox.species.color());
        }
    }

    /// Run one tick for `moxen`.
    pub fn step_moxen(&mut self, moxen: &mut [&mut Mox]) -> TickOutcome {
        // Phase 1: render moxen as colored cells
        self.paint(moxen);

        // Phase 2: parallel sensing over an immutable snapshot
        let bodies: Vec<_> = moxen
            .iter()
            .map(|m| m.alive.then_some((m.live_pose, m.species)))
            .collect();
        let automaton = &self.automaton;
        let sensors = &self.sensors;
        let perceptions: Vec<Option<Perception>> = bodies
            .par_iter()
            .map(|body| body.map(|(pose, species)| perceive(automaton, pose, species, sensors)))
            .collect();

        // Phase 3: decide, foragers before predators
        let mut plan = ActionPlan::new(self.width(), self.height());
        let mut outcome = TickOutcome::default();
        let order = (0..moxen.len())
            .filter(|&i| moxen[i].species == Species::Forager)
            .chain((0..moxen.len()).filter(|&i| moxen[i].species == Species::Predator))
            .collect::<Vec<_>>();
        for i in order {
            let Some(perception) = perceptions[i] else { continue };
            let response = moxen[i].cycle(perception.sensors);
            match response {
                Response::Forward if perception.range > 0 => {
                    if plan.claim(perception.ahead, i) {
                        outcome.conflicts += 1;
                    }
                }
                Response::Right => moxen[i].live_pose.direction = moxen[i].live_pose.direction.right(),
                Response::Left => moxen[i].live_pose.direction = moxen[i].live_pose.direction.left(),
                _ => {}
            }
            if perception.goal_reached {
                self.eat(moxen, i, perception.ahead, &mut plan, &mut outcome);
            }
        }

        // Phase 4: apply
        self.apply(moxen, &plan, &mut outcome);
        outcome
    }

    fn eat(&self, moxen: &mut [&mut Mox], eater: usize, cell: (usize, usize), plan: &mut ActionPlan, outcome: &mut TickOutcome) {
        match moxen[eater].species {
            Species::Forager => {
                if self.automaton.get(cell.0, cell.1) == BLUE_CELL {
                    plan.mark_eaten(cell);
                }
            }
            Species::Predator => {
                let prey = moxen.iter().position(|m| {
                    m.species == Species::Forager && m.alive && (m.live_pose.x, m.live_pose.y) == cell
                });
                if let Some(prey) = prey {
                    moxen[prey].alive = false;
                    plan.mark_eaten(cell);
                    outcome.kills += 1;
                }
            }
        }
    }

    fn apply(&mut self, moxen: &mut [&mut Mox], plan: &ActionPlan, outcome: &mut TickOutcome) {
        for x in 0..self.width() {
            for y in 0..self.height() {
                if let Claim::Mover(i) = plan.claim_at((x, y)) {
                    let mox = &mut moxen[i];
                    self.automaton.set(mox.live_pose.x, mox.live_pose.y, EMPTY);
                    mox.live_pose.x = x;
                    mox.live_pose.y = y;
                    if mox.alive {
                        self.automaton.set(x, y, mox.species.color());
                    }
                    outcome.moves += 1;
                }
                if plan.is_eaten((x, y)) {
                    self.automaton.set(x, y, EMPTY);
                    outcome.eaten += 1;
                }
            }
        }
    }

    /// Write the world file: the cells block, then every mox record.
    pub fn write<W: Write>(&self, writer: &mut W, moxen: &[&Mox]) -> io::Result<()> {
        self.automaton.write(writer)?;
        writeln!(writer, "{}", moxen.len())?;
        for mox in moxen {
            writeln!(writer, "{}", mox.species.index())?;
            mox.write(writer)?;
        }
        Ok(())
    }

    pub fn read<R: BufRead>(
        reader: &mut LineReader<R>,
        sensors: SensorConfig,
        factory: &dyn EngineFactory,
    ) -> Result<(Self, Vec<Mox>), FormatError> {
        let automaton = Automaton::read(reader)?;
        let count: usize = reader.read_value("mox count")?;
        let mut moxen = Vec::with_capacity(count);
        for _ in 0..count {
            let tag: i32 = reader.read_value("species")?;
            let mox = Mox::read(reader, factory)?;
            if mox.species.index() != tag {
                return Err(FormatError::invalid("species", tag));
            }
            for pose in [mox.live_pose, mox.origin_pose] {
                if pose.x >= automaton.width() {
                    return Err(FormatError::invalid("x", pose.x));
                }
                if pose.y >= automaton.height() {
                    return Err(FormatError::invalid("y", pose.y));
                }
            }
            moxen.push(mox);
        }
        Ok((Self::new(automaton, sensors), moxen))
    }

    /// Save a world file
    pub fn save<P: AsRef<Path>>(&self, path: P, moxen: &[&Mox]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer, moxen)?;
        writer.flush()
    }

    /// Load a world file
    pub fn load<P: AsRef<Path>>(
        path: P,
        sensors: SensorConfig,
        factory: &dyn EngineFactory,
    ) -> Result<(Self, Vec<Mox>), FormatError> {
        let file = File::open(path)?;
        Self::read(&mut LineReader::new(BufReader::new(file)), sensors, factory)
    }

    /// Run `moxen` for `steps` ticks, optionally stepping the automaton
    /// after each one.
    pub fn run(&mut self, moxen: &mut [&mut Mox], steps: usize, step_automaton: bool) -> TickOutcome {
        self.run_with_callback(moxen, steps, step_automaton, |_, _| {})
    }

    /// Run with a callback after every tick
    pub fn run_with_callback<F>(
        &mut self,
        moxen: &mut [&mut Mox],
        steps: usize,
        step_automaton: bool,
        mut callback: F,
    ) -> TickOutcome
    where
        F: FnMut(usize, &TickOutcome),
    {
        let mut total = TickOutcome::default();
        for step in 0..steps {
            let outcome = self.step_moxen(moxen);
            if step_automaton {
                self.step_automaton();
            }
            total.moves += outcome.moves;
            total.conflicts += outcome.conflicts;
            total.eaten += outcome.eaten;
            total.kills += outcome.kills;
            callback(step, &outcome);
        }
        total
    }
}

/// Moxen running in a world from a fresh reset.
///
/// Dropping the trial restores the world's grid checkpoint.
pub struct Trial<'a> {
    world: &'a mut World,
    moxen: Vec<&'a mut Mox>,
}

impl<'a> Trial<'a> {
    pub fn step(&mut self) -> TickOutcome {
        self.world.step_moxen(&mut self.moxen)
    }

    pub fn step_automaton(&mut self) {
        self.world.step_automaton();
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn len(&self) -> usize {
        self.moxen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moxen.is_empty()
    }

    pub fn mox(&self, index: usize) -> &Mox {
        &*self.moxen[index]
    }

    pub fn mox_mut(&mut self, index: usize) -> &mut Mox {
        &mut *self.moxen[index]
    }

    /// Every mox in the trial, in the order given to [`World::trial`]
    pub fn moxen_mut(&mut self) -> &mut [&'a mut Mox] {
        &mut self.moxen
    }
}

impl Drop for Trial<'_> {
    fn drop(&mut self) {
        self.world.automaton.restore();
    }
}
