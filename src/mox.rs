//! Moxen: positioned, directed agents driven by a decision engine.

use crate::automaton::{Cell, BLUE_CELL};
use crate::engine::{DecisionEngine, EngineFactory, EngineSpec, Goal, Response, SENSOR_COUNT};
use crate::genetics::Instinct;
use crate::textio::{FormatError, LineReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hint::black_box;
use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

/// Unique mox identifier
pub type MoxId = u64;

pub const FORAGER_COLOR: Cell = 9;
pub const PREDATOR_COLOR: Cell = 10;

/// Index of the species food need
pub const FOOD_NEED: usize = 0;
/// Food need level at birth and after every meal
pub const FOOD_NEED_VALUE: f64 = 1.0;
const FOOD_GOAL_VALUE: f64 = 1.0;
/// Upper bound on the needs a saved record may declare
pub const MAX_NEEDS: usize = 64;

/// The two kinds of mox
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Forager,
    Predator,
}

impl Species {
    /// Needs every member of the species has before instincts
    pub const BASE_NEEDS: usize = 1;

    pub fn index(self) -> i32 {
        match self {
            Self::Forager => 0,
            Self::Predator => 1,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Forager),
            1 => Some(Self::Predator),
            _ => None,
        }
    }

    /// Color painted into the grid under a live mox
    pub fn color(self) -> Cell {
        match self {
            Self::Forager => FORAGER_COLOR,
            Self::Predator => PREDATOR_COLOR,
        }
    }

    /// Color of the cells this species eats
    pub fn goal_color(self) -> Cell {
        match self {
            Self::Forager => BLUE_CELL,
            Self::Predator => FORAGER_COLOR,
        }
    }

    pub fn food_name(self) -> &'static str {
        match self {
            Self::Forager => "blue food",
            Self::Predator => "mox food",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forager => f.write_str("forager"),
            Self::Predator => f.write_str("predator"),
        }
    }
}

/// Heading on the torus. North is increasing `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    pub fn delta(self) -> (i64, i64) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    pub fn right(self) -> Self {
        Self::ALL[(self.index() + 1) % 4]
    }

    pub fn left(self) -> Self {
        Self::ALL[(self.index() + 3) % 4]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Position and heading
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pose {
    pub x: usize,
    pub y: usize,
    pub direction: Direction,
}

impl Pose {
    pub fn new(x: usize, y: usize, direction: Direction) -> Self {
        Self { x, y, direction }
    }
}

/// Who picks the response
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Driver {
    /// The engine decides
    #[default]
    Autonomous,
    /// The engine cycles and learns, but responds with the given response
    Override(Response),
    /// The engine is bypassed
    Hijack(Response),
}

#[derive(Clone, Copy, Debug, Default)]
struct CycleClock {
    running: bool,
    accumulated: Duration,
}

/// Upper bound on engine time per tick.
///
/// Calibrated against a fixed busy loop so that the limit scales with the
/// speed of the machine running the experiment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleBudget {
    limit: Option<Duration>,
}

impl CycleBudget {
    pub fn unlimited() -> Self {
        Self { limit: None }
    }

    pub fn fixed(limit: Duration) -> Self {
        Self { limit: Some(limit) }
    }

    /// Time `iterations` of a busy loop and allow `multiplier` times that.
    pub fn calibrate(iterations: u64, multiplier: u32) -> Self {
        let start = Instant::now();
        let mut j = 0u64;
        for i in 0..iterations {
            j = black_box((i + 1) / 2);
        }
        black_box(j);
        Self::fixed(start.elapsed() * multiplier)
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn exceeded(&self, spent: Duration) -> bool {
        self.limit.map_or(false, |limit| spent > limit)
    }
}

/// An agent living in a world.
pub struct Mox {
    pub id: MoxId,
    pub species: Species,
    /// Where the mox is during a trial
    pub live_pose: Pose,
    /// Where every trial starts
    pub origin_pose: Pose,
    pub alive: bool,
    pub driver: Driver,
    engine: Box<dyn DecisionEngine>,
    sensors: [f32; SENSOR_COUNT],
    response: Option<Response>,
    clock: CycleClock,
}

impl Mox {
    /// Create a mox around a fresh engine, installing the species food need
    /// and goal.
    pub fn new(id: MoxId, species: Species, pose: Pose, mut engine: Box<dyn DecisionEngine>) -> Self {
        engine.set_need(FOOD_NEED, FOOD_NEED_VALUE);
        engine.add_goal(Goal::new(
            FOOD_NEED,
            [0.0, species.goal_color() as f32, 1.0],
            FOOD_GOAL_VALUE,
        ));
        Self::from_parts(id, species, pose, pose, true, engine)
    }

    /// Assemble a mox without touching the engine's needs or goals.
    pub fn from_parts(
        id: MoxId,
        species: Species,
        live_pose: Pose,
        origin_pose: Pose,
        alive: bool,
        engine: Box<dyn DecisionEngine>,
    ) -> Self {
        Self {
            id,
            species,
            live_pose,
            origin_pose,
            alive,
            driver: Driver::Autonomous,
            engine,
            sensors: [0.0; SENSOR_COUNT],
            response: None,
            clock: CycleClock::default(),
        }
    }

    /// Install instinct goals on the needs following the species needs.
    pub fn with_instincts(mut self, instincts: &[Instinct]) -> Self {
        for (i, instinct) in instincts.iter().enumerate() {
            self.engine.add_goal(instinct.goal(Species::BASE_NEEDS + i));
        }
        self
    }

    pub fn engine(&self) -> &dyn DecisionEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn DecisionEngine {
        self.engine.as_mut()
    }

    /// Current food need
    pub fn need(&self) -> f64 {
        self.engine.need(FOOD_NEED)
    }

    pub fn set_need(&mut self, value: f64) {
        self.engine.set_need(FOOD_NEED, value);
    }

    /// Restore the food need after a meal
    pub fn refill(&mut self) {
        self.set_need(FOOD_NEED_VALUE);
    }

    pub fn needs(&self) -> Vec<f64> {
        (0..self.engine.need_count()).map(|i| self.engine.need(i)).collect()
    }

    /// Place the mox, making the spot its origin as well.
    pub fn place(&mut self, pose: Pose) {
        self.live_pose = pose;
        self.origin_pose = pose;
    }

    /// Return to the origin pose for a new trial.
    ///
    /// The engine keeps what it learned; only its working memory goes.
    pub fn reset(&mut self) {
        self.live_pose = self.origin_pose;
        self.alive = true;
        self.driver = Driver::Autonomous;
        self.sensors = [0.0; SENSOR_COUNT];
        self.response = None;
        self.engine.clear_working_memory();
    }

    /// Run the engine on one tick's sensors.
    pub fn cycle(&mut self, sensors: [f32; SENSOR_COUNT]) -> Response {
        self.sensors = sensors;
        let started = self.clock.running.then(Instant::now);
        let response = match self.driver {
            Driver::Hijack(response) => response,
            Driver::Override(response) => {
                self.engine.override_response(response);
                self.engine.cycle(&sensors)
            }
            Driver::Autonomous => self.engine.cycle(&sensors),
        };
        if let Some(started) = started {
            self.clock.accumulated += started.elapsed();
        }
        self.response = Some(response);
        response
    }

    /// Start timing engine cycles from zero.
    pub fn start_cycle_clock(&mut self) {
        self.clock = CycleClock {
            running: true,
            accumulated: Duration::ZERO,
        };
    }

    pub fn stop_cycle_clock(&mut self) {
        self.clock.running = false;
    }

    /// Engine time since the clock was started
    pub fn cycle_time(&self) -> Duration {
        self.clock.accumulated
    }

    pub fn sensors(&self) -> &[f32; SENSOR_COUNT] {
        &self.sensors
    }

    pub fn last_response(&self) -> Option<Response> {
        self.response
    }

    /// Write the mox record: identity, poses and liveness one value per
    /// line, then the engine state on a single line.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.id)?;
        writeln!(writer, "{}", self.species.index())?;
        for pose in [self.live_pose, self.origin_pose] {
            writeln!(writer, "{}", pose.x)?;
            writeln!(writer, "{}", pose.y)?;
            writeln!(writer, "{}", pose.direction.index())?;
        }
        writeln!(writer, "{}", if self.alive { 1 } else { 0 })?;
        writeln!(writer, "{}", self.engine.need_count())?;
        let state = self
            .engine
            .save_state()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{} {}", self.engine.kind(), state)
    }

    /// Read a record written by [`write`](Self::write), building the engine
    /// with `factory` before loading its state.
    pub fn read<R: BufRead>(reader: &mut LineReader<R>, factory: &dyn EngineFactory) -> Result<Self, FormatError> {
        let id: MoxId = reader.read_value("mox id")?;
        let species_index: i32 = reader.read_value("species")?;
        let species = Species::from_index(species_index).ok_or_else(|| FormatError::invalid("species", species_index))?;
        let live_pose = read_pose(reader)?;
        let origin_pose = read_pose(reader)?;
        let alive: i32 = reader.read_value("alive")?;
        let need_count: usize = reader.read_value("need count")?;
        if need_count == 0 || need_count > MAX_NEEDS {
            return Err(FormatError::invalid("need count", need_count));
        }

        let line = reader.next_line()?;
        let (kind, state) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let mut engine = factory.create(&EngineSpec::new(need_count, id));
        if engine.kind() != kind {
            return Err(FormatError::Engine(format!(
                "saved by a {} engine, loading into {}",
                kind,
                engine.kind()
            )));
        }
        engine
            .load_state(state)
            .map_err(|e| FormatError::Engine(e.to_string()))?;
        Ok(Self::from_parts(id, species, live_pose, origin_pose, alive != 0, engine))
    }

    /// One-line description for logs
    pub fn info(&self) -> String {
        format!(
            "mox={}, species={}, x={}, y={}, direction={:?}, alive={}",
            self.id, self.species, self.live_pose.x, self.live_pose.y, self.live_pose.direction, self.alive
        )
    }
}

fn read_pose<R: BufRead>(reader: &mut LineReader<R>) -> Result<Pose, FormatError> {
    let x: usize = reader.read_value("x")?;
    let y: usize = reader.read_value("y")?;
    let d: usize = reader.read_value("direction")?;
    let direction = Direction::from_index(d).ok_or_else(|| FormatError::invalid("direction", d))?;
    Ok(Pose::new(x, y, direction))
}

impl fmt::Debug for Mox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mox")
            .field("id", &self.id)
            .field("species", &self.species)
            .field("live_pose", &self.live_pose)
            .field("origin_pose", &self.origin_pose)
            .field("alive", &self.alive)
            .field("driver", &self.driver)
            .field("engine", &self.engine.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ReflexFactory, ScriptedEngine};

    fn scripted(species: Species, script: Vec<Response>) -> Mox {
        let engine = Box::new(ScriptedEngine::new(1, script));
        Mox::new(1, species, Pose::new(2, 3, Direction::East), engine)
    }

    #[test]
    fn test_turns() {
        assert_eq!(Direction::North.right(), Direction::East);
        assert_eq!(Direction::West.right(), Direction::North);
        assert_eq!(Direction::North.left(), Direction::West);
        assert_eq!(Direction::South.left(), Direction::East);
    }

    #[test]
    fn test_species_colors() {
        assert_eq!(Species::Forager.goal_color(), BLUE_CELL);
        assert_eq!(Species::Predator.goal_color(), Species::Forager.color());
    }

    #[test]
    fn test_new_mox_is_hungry() {
        let mox = scripted(Species::Forager, vec![]);
        assert_eq!(mox.need(), FOOD_NEED_VALUE);
        assert_eq!(mox.needs(), vec![1.0]);
        assert!(mox.alive);
        assert_eq!(mox.live_pose, mox.origin_pose);
    }

    #[test]
    fn test_drivers() {
        let mut mox = scripted(Species::Forager, vec![Response::Wait]);
        assert_eq!(mox.cycle([0.0; 3]), Response::Wait);

        mox.driver = Driver::Override(Response::Left);
        assert_eq!(mox.cycle([0.0; 3]), Response::Left);

        mox.driver = Driver::Hijack(Response::Right);
        assert_eq!(mox.cycle([0.0; 3]), Response::Right);
        assert_eq!(mox.last_response(), Some(Response::Right));
    }

    #[test]
    fn test_reset_restores_origin() {
        let mut mox = scripted(Species::Predator, vec![Response::Forward]);
        mox.live_pose = Pose::new(7, 7, Direction::South);
        mox.alive = false;
        mox.driver = Driver::Hijack(Response::Left);
        mox.cycle([1.0, 2.0, 3.0]);

        mox.reset();
        assert_eq!(mox.live_pose, Pose::new(2, 3, Direction::East));
        assert!(mox.alive);
        assert_eq!(mox.driver, Driver::Autonomous);
        assert_eq!(mox.sensors(), &[0.0; 3]);
    }

    #[test]
    fn test_cycle_clock() {
        let mut mox = scripted(Species::Forager, vec![Response::Wait]);
        mox.cycle([0.0; 3]);
        assert_eq!(mox.cycle_time(), Duration::ZERO);

        mox.start_cycle_clock();
        mox.cycle([0.0; 3]);
        mox.stop_cycle_clock();
        let spent = mox.cycle_time();
        mox.cycle([0.0; 3]);
        assert_eq!(mox.cycle_time(), spent);
    }

    #[test]
    fn test_budget() {
        assert!(!CycleBudget::unlimited().exceeded(Duration::from_secs(3600)));
        let budget = CycleBudget::fixed(Duration::from_millis(5));
        assert!(budget.exceeded(Duration::from_millis(6)));
        assert!(!budget.exceeded(Duration::from_millis(5)));
        assert!(CycleBudget::calibrate(1000, 10).limit().is_some());
    }

    #[test]
    fn test_record_roundtrip() {
        let factory = ReflexFactory;
        let mut mox = Mox::new(
            42,
            Species::Predator,
            Pose::new(1, 2, Direction::West),
            factory.create(&EngineSpec::new(1, 42)),
        );
        mox.live_pose = Pose::new(5, 6, Direction::North);
        mox.alive = false;
        mox.cycle([3.0, 0.0, 0.0]);

        let mut buf = Vec::new();
        mox.write(&mut buf).unwrap();
        let loaded = Mox::read(&mut LineReader::new(buf.as_slice()), &factory).unwrap();

        assert_eq!(loaded.id, 42);
        assert_eq!(loaded.species, Species::Predator);
        assert_eq!(loaded.live_pose, mox.live_pose);
        assert_eq!(loaded.origin_pose, mox.origin_pose);
        assert!(!loaded.alive);
        assert_eq!(loaded.engine().save_state().unwrap(), mox.engine().save_state().unwrap());
    }

    #[test]
    fn test_record_rejects_other_engine() {
        let mox = scripted(Species::Forager, vec![Response::Forward]);
        let mut buf = Vec::new();
        mox.write(&mut buf).unwrap();
        let err = Mox::read(&mut LineReader::new(buf.as_slice()), &ReflexFactory).unwrap_err();
        assert!(matches!(err, FormatError::Engine(_)));
    }

    #[test]
    fn test_record_rejects_need_count() {
        for need_count in ["0", "18446744073709551615"] {
            let record = format!("3\n0\n1\n1\n0\n1\n1\n0\n1\n{}\nreflex {{}}\n", need_count);
            let err = Mox::read(&mut LineReader::new(record.as_bytes()), &ReflexFactory).unwrap_err();
            assert!(matches!(err, FormatError::Invalid { field: "need count", .. }));
        }
    }
}
