//! Deterministic engine that replays a response script.

use super::{DecisionEngine, Drives, EngineError, Goal, Response};
use serde::{Deserialize, Serialize};

/// Cycles through `script` forever, still tracking needs and goals so
/// callers can watch them being satisfied. An empty script waits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedEngine {
    script: Vec<Response>,
    cursor: usize,
    drives: Drives,
    forced: Option<Response>,
    last: Option<Response>,
}

impl ScriptedEngine {
    pub fn new(need_count: usize, script: Vec<Response>) -> Self {
        Self {
            script,
            drives: Drives::new(need_count),
            ..Self::default()
        }
    }

    /// Cycles run so far
    pub fn cycles(&self) -> u64 {
        self.drives.cycles
    }
}

impl DecisionEngine for ScriptedEngine {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    fn cycle(&mut self, sensors: &[f32]) -> Response {
        self.drives.tick(sensors, self.last);
        let scripted = if self.script.is_empty() {
            Response::Wait
        } else {
            let r = self.script[self.cursor % self.script.len()];
            self.cursor += 1;
            r
        };
        let response = self.forced.take().unwrap_or(scripted);
        self.last = Some(response);
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
        self.cursor = 0;
        self.last = None;
        self.forced = None;
    }

    fn save_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    fn load_state(&mut self, state: &str) -> Result<(), EngineError> {
        *self = serde_json::from_str(state)?;
        Ok(())
    }
}
