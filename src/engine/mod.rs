//! Decision engines: the mind behind each mox.
//!
//! The world only ever talks to an engine through [`DecisionEngine`]: it
//! hands over a sensor vector and gets a [`Response`] back. Needs and goals
//! live inside the engine, which decides how they shape behavior.
//!
//! Two engines ship with the crate:
//! - [`ReflexEngine`]: need-driven utility learner, the default
//! - [`ScriptedEngine`]: replays a fixed response sequence

mod reflex;
mod scripted;

pub use reflex::{ReflexEngine, ReflexFactory};
pub use scripted::ScriptedEngine;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor vector layout
pub const SENSOR_COUNT: usize = 3;
/// Distance to the nearest goal-colored cell
pub const GOAL_RANGE_SENSOR: usize = 0;
/// Raw value of the first non-empty cell ahead
pub const HUE_SENSOR: usize = 1;
/// `1 / (range + 1)` for the cell ahead
pub const INTENSITY_SENSOR: usize = 2;

pub const RESPONSE_COUNT: usize = 4;

/// What a mox does on a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Response {
    Wait,
    Forward,
    Right,
    Left,
}

impl Response {
    pub const ALL: [Response; RESPONSE_COUNT] = [Self::Wait, Self::Forward, Self::Right, Self::Left];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wait => "wait",
            Self::Forward => "forward",
            Self::Right => "right",
            Self::Left => "left",
        };
        f.write_str(name)
    }
}

/// Which sensors a goal pattern is compared on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorMode {
    #[default]
    All,
    RangeOnly,
    ColorOnly,
}

impl SensorMode {
    pub fn mask(self) -> [bool; SENSOR_COUNT] {
        match self {
            Self::All => [true, true, true],
            Self::RangeOnly => [true, false, false],
            Self::ColorOnly => [false, true, true],
        }
    }
}

/// A sensor pattern that satisfies a need.
///
/// `response` restricts the goal to the response that led to the pattern;
/// `None` accepts any. A non-zero `frequency` raises the need back to
/// `periodic_need` every `frequency` cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub need: usize,
    pub sensors: [f32; SENSOR_COUNT],
    pub mode: SensorMode,
    pub response: Option<Response>,
    pub goal_value: f64,
    pub frequency: u32,
    pub periodic_need: f64,
}

impl Goal {
    pub fn new(need: usize, sensors: [f32; SENSOR_COUNT], goal_value: f64) -> Self {
        Self {
            need,
            sensors,
            mode: SensorMode::All,
            response: None,
            goal_value,
            frequency: 0,
            periodic_need: 0.0,
        }
    }

    pub fn matches(&self, sensors: &[f32]) -> bool {
        let mask = self.mode.mask();
        (0..SENSOR_COUNT)
            .filter(|&i| mask[i])
            .all(|i| sensors.get(i).map_or(false, |&got| (got - self.sensors[i]).abs() < 1e-6))
    }
}

/// Need levels and the goals that satisfy them.
///
/// Shared bookkeeping for the built-in engines.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Drives {
    pub needs: Vec<f64>,
    pub goals: Vec<Goal>,
    pub cycles: u64,
}

impl Drives {
    pub fn new(need_count: usize) -> Self {
        Self {
            needs: vec![0.0; need_count],
            goals: Vec::new(),
            cycles: 0,
        }
    }

    /// Advance one cycle: refresh periodic needs, then let every matching
    /// goal reduce its need. Returns the total need reduction.
    pub fn tick(&mut self, sensors: &[f32], last_response: Option<Response>) -> f64 {
        self.cycles += 1;
        for goal in &self.goals {
            if goal.frequency > 0 && self.cycles % goal.frequency as u64 == 0 {
                if let Some(need) = self.needs.get_mut(goal.need) {
                    *need = goal.periodic_need;
                }
            }
        }

        let mut satisfied = 0.0;
        for goal in &self.goals {
            let Some(need) = self.needs.get_mut(goal.need) else { continue };
            if *need <= 0.0 || !goal.matches(sensors) {
                continue;
            }
            if goal.response.is_some() && goal.response != last_response {
                continue;
            }
            let reduced = (*need - goal.goal_value).max(0.0);
            satisfied += *need - reduced;
            *need = reduced;
        }
        satisfied
    }

    pub fn any_need(&self) -> bool {
        self.needs.iter().any(|&n| n > 0.0)
    }
}

/// Errors from saving or restoring engine state
#[derive(Debug)]
pub enum EngineError {
    Serialization(serde_json::Error),
    Mismatch(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization(e) => write!(f, "Engine state serialization error: {}", e),
            Self::Mismatch(msg) => write!(f, "Engine state mismatch: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

/// Everything needed to build an engine for one mox.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSpec {
    /// Sensor values the engine reads per cycle
    pub sensor_count: usize,
    /// Responses the engine may choose from, a prefix of [`Response::ALL`]
    pub response_count: usize,
    pub need_count: usize,
    pub seed: u64,
    /// Flattened genome parameters
    pub params: Vec<(String, String)>,
}

impl EngineSpec {
    pub fn new(need_count: usize, seed: u64) -> Self {
        Self {
            sensor_count: SENSOR_COUNT,
            response_count: RESPONSE_COUNT,
            need_count,
            seed,
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Numeric parameter by name
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.parse().ok())
    }
}

/// A mox's mind.
///
/// Engines are exclusively owned by their mox and never shared between
/// threads while cycling.
pub trait DecisionEngine: Send {
    /// Short tag written next to saved state
    fn kind(&self) -> &'static str;

    /// Map one tick's sensors to a response.
    fn cycle(&mut self, sensors: &[f32]) -> Response;

    fn need_count(&self) -> usize;
    fn need(&self, index: usize) -> f64;
    fn set_need(&mut self, index: usize, value: f64);

    fn add_goal(&mut self, goal: Goal);

    /// Force the response of the next cycle.
    fn override_response(&mut self, response: Response);
    fn clear_response_override(&mut self);

    /// Forget short-term state between trials, keeping what was learned.
    fn clear_working_memory(&mut self);

    /// Serialize the full state to a single line.
    fn save_state(&self) -> Result<String, EngineError>;
    fn load_state(&mut self, state: &str) -> Result<(), EngineError>;
}

/// Builds engines for new moxen.
pub trait EngineFactory: Send + Sync {
    fn create(&self, spec: &EngineSpec) -> Box<dyn DecisionEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn(&EngineSpec) -> Box<dyn DecisionEngine> + Send + Sync,
{
    fn create(&self, spec: &EngineSpec) -> Box<dyn DecisionEngine> {
        self(spec)
    }
}
