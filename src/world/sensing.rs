//! Per-tick sensing: a forward raycast plus a nearest-goal search.

use crate::automaton::{Automaton, Cell, EMPTY};
use crate::config::SensorConfig;
use crate::engine::{GOAL_RANGE_SENSOR, HUE_SENSOR, INTENSITY_SENSOR, SENSOR_COUNT};
use crate::mox::{Pose, Species};

/// What one mox perceives this tick, plus the facts the action pass needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perception {
    pub sensors: [f32; SENSOR_COUNT],
    /// Empty cells between the mox and the first occupied cell ahead
    pub range: usize,
    /// The cell directly in front
    pub ahead: (usize, usize),
    /// Standing right in front of a goal-colored cell
    pub goal_reached: bool,
}

/// Sense from `pose` as a member of `species`.
pub fn perceive(automaton: &Automaton, pose: Pose, species: Species, config: &SensorConfig) -> Perception {
    let (dx, dy) = pose.direction.delta();
    let ahead = automaton.wrap(pose.x as i64 + dx, pose.y as i64 + dy);
    let (ax, ay) = (ahead.0 as i64, ahead.1 as i64);

    // Never scan back onto the mox itself.
    let dimension = if dx != 0 { automaton.width() } else { automaton.height() };
    let limit = dimension.saturating_sub(2);
    let mut range = 0;
    while range < limit && automaton.get_wrapped(ax + dx * range as i64, ay + dy * range as i64) == EMPTY {
        range += 1;
    }
    let seen = automaton.get_wrapped(ax + dx * range as i64, ay + dy * range as i64);

    let (hue, intensity) = if config.is_bounded() && range as f32 > config.max_sensor_range {
        (EMPTY, 0.0)
    } else {
        (seen, 1.0 / (range as f32 + 1.0))
    };

    let goal_color = species.goal_color();
    let mut sensors = [0.0; SENSOR_COUNT];
    sensors[GOAL_RANGE_SENSOR] = nearest_goal(automaton, ahead, goal_color, config);
    sensors[HUE_SENSOR] = hue as f32;
    sensors[INTENSITY_SENSOR] = intensity;

    Perception {
        sensors,
        range,
        ahead,
        goal_reached: range == 0 && hue == goal_color,
    }
}

/// Euclidean distance from `from` to the nearest `goal` cell.
///
/// Searches a window of half-side `min(dimension / 2, max range)` when the
/// range is bounded, the whole torus otherwise. Finding nothing yields the
/// max range (or the grid's combined dimensions when unbounded).
pub fn nearest_goal(automaton: &Automaton, from: (usize, usize), goal: Cell, config: &SensorConfig) -> f32 {
    let (w, h) = (automaton.width() as i64, automaton.height() as i64);
    let (cx, cy) = (from.0 as i64, from.1 as i64);
    let (half_w, half_h, mut best) = if config.is_bounded() {
        let reach = config.max_sensor_range as i64;
        let max = config.max_sensor_range as f64;
        ((w / 2).min(reach), (h / 2).min(reach), max * max)
    } else {
        (w / 2, h / 2, ((w + h) * (w + h)) as f64)
    };

    for x in cx - half_w..=cx + half_w {
        for y in cy - half_h..=cy + half_h {
            if automaton.get_wrapped(x, y) == goal {
                let d = ((x - cx) * (x - cx) + (y - cy) * (y - cy)) as f64;
                if d < best {
                    best = d;
                }
            }
        }
    }

    let distance = best.sqrt() as f32;
    if config.is_bounded() {
        distance.min(config.max_sensor_range)
    } else {
        distance
    }
}
