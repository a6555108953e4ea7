//! Need-driven utility learner.
//!
//! Sensors are coarsened into a small state key (hue ahead, distance ahead,
//! whether the goal got closer). Each state keeps one utility per response.
//! When a cycle satisfies a need, the previous state/response pair moves
//! toward the utility asymptote; otherwise it decays toward zero. Responses
//! are chosen greedily with random tie-breaks, with occasional exploration.

use super::{
    DecisionEngine, Drives, EngineError, EngineFactory, EngineSpec, Goal, Response, GOAL_RANGE_SENSOR,
    HUE_SENSOR, INTENSITY_SENSOR, RESPONSE_COUNT, SENSOR_COUNT,
};
use crate::genetics::parameters::{
    DRIVE_ATTENUATION, FIRING_STRENGTH_LEARNING_DAMPER, INITIAL_ENABLEMENT, LEARNING_DECREASE_VELOCITY,
    LEARNING_INCREASE_VELOCITY, RESPONSE_RANDOMNESS, UTILITY_ASYMPTOTE,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ReflexParams {
    initial_utility: f64,
    drive_attenuation: f64,
    increase_velocity: f64,
    decrease_velocity: f64,
    decay_damper: f64,
    utility_asymptote: f64,
    randomness: f64,
}

impl ReflexParams {
    fn from_spec(spec: &EngineSpec) -> Self {
        let get = |name: &str, default: f64| spec.param(name).unwrap_or(default);
        Self {
            initial_utility: get(INITIAL_ENABLEMENT, 0.1),
            drive_attenuation: get(DRIVE_ATTENUATION, 0.0),
            increase_velocity: get(LEARNING_INCREASE_VELOCITY, 0.1),
            decrease_velocity: get(LEARNING_DECREASE_VELOCITY, 0.1),
            decay_damper: get(FIRING_STRENGTH_LEARNING_DAMPER, 0.1),
            utility_asymptote: get(UTILITY_ASYMPTOTE, 10.0),
            randomness: get(RESPONSE_RANDOMNESS, 0.01),
        }
    }
}

/// Built-in learning engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReflexEngine {
    params: ReflexParams,
    sensor_count: usize,
    response_count: usize,
    drives: Drives,
    utilities: BTreeMap<u32, [f64; RESPONSE_COUNT]>,
    forced: Option<Response>,
    previous: Option<(u32, Response)>,
    last_goal_range: Option<f32>,
    rng: ChaCha8Rng,
}

/// Coarse state: hue ahead, distance band ahead and goal trend.
fn state_key(sensors: &[f32], last_goal_range: Option<f32>) -> u32 {
    let hue = sensors.get(HUE_SENSOR).copied().unwrap_or(0.0).clamp(0.0, 15.0) as u32;
    let intensity = sensors.get(INTENSITY_SENSOR).copied().unwrap_or(0.0);
    let band = if intensity <= 0.0 {
        0
    } else {
        let range = (1.0 / intensity - 1.0).round().max(0.0) as u32;
        range.min(2) + 1
    };
    let goal_range = sensors.get(GOAL_RANGE_SENSOR).copied().unwrap_or(0.0);
    let trend = match last_goal_range {
        None => 0,
        Some(last) if goal_range < last => 1,
        Some(last) if goal_range > last => 3,
        Some(_) => 2,
    };
    (hue << 8) | (band << 4) | trend
}

impl ReflexEngine {
    pub fn new(spec: &EngineSpec) -> Self {
        Self {
            params: ReflexParams::from_spec(spec),
            sensor_count: spec.sensor_count.min(SENSOR_COUNT),
            response_count: spec.response_count.clamp(1, RESPONSE_COUNT),
            drives: Drives::new(spec.need_count),
            utilities: BTreeMap::new(),
            forced: None,
            previous: None,
            last_goal_range: None,
            rng: ChaCha8Rng::seed_from_u64(spec.seed),
        }
    }

    fn learn(&mut self, state: u32, response: Response, satisfied: f64) {
        let initial = self.params.initial_utility;
        let utility = &mut self.utilities.entry(state).or_insert([initial; RESPONSE_COUNT])[response.index()];
        if satisfied > 0.0 {
            let strength = satisfied.min(1.0) * (1.0 - self.params.drive_attenuation * 0.5);
            *utility += self.params.increase_velocity * strength * (self.params.utility_asymptote - *utility);
        } else {
            *utility -= self.params.decrease_velocity * self.params.decay_damper * *utility;
        }
    }

    /// Instinct goals that name a response fire as reflexes when their
    /// pattern is in view and their need is up.
    fn reflex(&self, sensors: &[f32]) -> Option<Response> {
        self.drives
            .goals
            .iter()
            .filter(|g| g.response.is_some())
            .filter(|g| self.drives.needs.get(g.need).map_or(false, |&n| n > 0.0))
            .find(|g| g.matches(sensors))
            .and_then(|g| g.response)
    }

    fn choose(&mut self, state: u32, sensors: &[f32]) -> Response {
        if !self.drives.any_need() {
            return Response::Wait;
        }
        let responses = &Response::ALL[..self.response_count];
        if self.rng.gen::<f64>() < self.params.randomness {
            return responses[self.rng.gen_range(0..responses.len())];
        }
        if let Some(response) = self.reflex(sensors) {
            return response;
        }
        let initial = self.params.initial_utility;
        let utilities = self.utilities.get(&state).copied().unwrap_or([initial; RESPONSE_COUNT]);
        let best = utilities.iter().copied().fold(f64::MIN, f64::max);
        let candidates: Vec<Response> = responses
            .iter()
            .copied()
            .filter(|r| utilities[r.index()] >= best - 1e-12)
            .collect();
        candidates.choose(&mut self.rng).copied().unwrap_or(Response::Wait)
    }
}

impl DecisionEngine for ReflexEngine {
    fn kind(&self) -> &'static str {
        "reflex"
    }

    fn cycle(&mut self, sensors: &[f32]) -> Response {
        let sensors = &sensors[..sensors.len().min(self.sensor_count)];
        let last_response = self.previous.map(|(_, r)| r);
        let satisfied = self.drives.tick(sensors, last_response);
        if let Some((state, response)) = self.previous {
            self.learn(state, response, satisfied);
        }

        let state = state_key(sensors, self.last_goal_range);
        let response = match self.forced.take() {
            Some(response) => response,
            None => self.choose(state, sensors),
        };
        self.previous = Some((state, response));
        self.last_goal_range = sensors.get(GOAL_RANGE_SENSOR).copied();
        response
    }

    fn need_count(&self) -> usize {
        self.drives.needs.len()
    }

    fn need(&self, index: usize) -> f64 {
        self.drives.needs.get(index).copied().unwrap_or(0.0)
    }

    fn set_need(&mut self, index: usize, value: f64) {
        if let Some(need) = self.drives.needs.get_mut(index) {
            *need = value;
        }
    }

    fn add_goal(&mut self, goal: Goal) {
        self.drives.goals.push(goal);
    }

    fn override_response(&mut self, response: Response) {
        self.forced = Some(response);
    }

    fn clear_response_override(&mut self) {
        self.forced = None;
    }

    fn clear_working_memory(&mut self) {
        self.previous = None;
        self.last_goal_range = None;
        self.forced = None;
    }

    fn save_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    fn load_state(&mut self, state: &str) -> Result<(), EngineError> {
        let loaded: ReflexEngine = serde_json::from_str(state)?;
        if loaded.drives.needs.len() != self.drives.needs.len() {
            return Err(EngineError::Mismatch(format!(
                "expected {} needs, found {}",
                self.drives.needs.len(),
                loaded.drives.needs.len()
            )));
        }
        *self = loaded;
        Ok(())
    }
}

/// Factory for [`ReflexEngine`]s
#[derive(Clone, Copy, Debug, Default)]
pub struct ReflexFactory;

impl EngineFactory for ReflexFactory {
    fn create(&self, spec: &EngineSpec) -> Box<dyn DecisionEngine> {
        Box::new(ReflexEngine::new(spec))
    }
}
