//! Forager training: steer toward the nearest blue food so the engine can
//! learn the goal response before it is scored.

use crate::automaton::{Automaton, BLUE_CELL};
use crate::engine::Response;
use crate::mox::{Direction, Driver, Mox, Pose};
use crate::world::World;

/// Toroidal city-block distance
pub fn city_block(a: (usize, usize), b: (usize, usize), width: usize, height: usize) -> usize {
    let dx = a.0.abs_diff(b.0);
    let dy = a.1.abs_diff(b.1);
    dx.min(width - dx) + dy.min(height - dy)
}

/// The response that brings `pose` closest to blue food, or `None` when the
/// grid holds none.
///
/// Moving ahead wins ties, then turning right, then left.
pub fn training_response(automaton: &Automaton, pose: Pose) -> Option<Response> {
    let (w, h) = (automaton.width(), automaton.height());
    let food: Vec<(usize, usize)> = (0..w)
        .flat_map(|x| (0..h).map(move |y| (x, y)))
        .filter(|&(x, y)| automaton.get(x, y) == BLUE_CELL)
        .collect();
    if food.is_empty() {
        return None;
    }

    let distance = |direction: Direction| {
        let (dx, dy) = direction.delta();
        let cell = automaton.wrap(pose.x as i64 + dx, pose.y as i64 + dy);
        food.iter().map(|&f| city_block(f, cell, w, h)).min().unwrap_or(usize::MAX)
    };
    let ahead = distance(pose.direction);
    let right = distance(pose.direction.right());
    let left = distance(pose.direction.left());
    let back = distance(pose.direction.right().right());

    Some(if ahead <= right && ahead <= left && ahead <= back {
        Response::Forward
    } else if right <= left && right <= back {
        Response::Right
    } else {
        Response::Left
    })
}

/// Drive `mox` toward food in `world` until it eats, dies or runs out of
/// steps. The engine still cycles, so it learns from the forced responses.
pub fn train_forager(world: &mut World, mox: &mut Mox, steps: usize, step_automaton: bool) {
    mox.refill();
    let mut trial = world.trial(vec![mox]);
    for _ in 0..steps {
        let mox = trial.mox(0);
        if mox.need() == 0.0 || !mox.alive {
            break;
        }
        let response = training_response(trial.world().automaton(), mox.live_pose);
        trial.mox_mut(0).driver = response.map_or(Driver::Autonomous, Driver::Override);
        trial.step();
        if step_automaton {
            trial.step_automaton();
        }
    }
    trial.mox_mut(0).driver = Driver::Autonomous;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::engine::{EngineFactory, EngineSpec, ReflexFactory};
    use crate::mox::Species;

    #[test]
    fn test_city_block_wraps() {
        assert_eq!(city_block((0, 0), (3, 4), 10, 10), 7);
        assert_eq!(city_block((0, 0), (9, 9), 10, 10), 2);
        assert_eq!(city_block((2, 2), (2, 2), 5, 5), 0);
    }

    #[test]
    fn test_training_response() {
        let mut a = Automaton::new(10, 10);
        assert_eq!(training_response(&a, Pose::new(5, 5, Direction::North)), None);

        a.set(5, 8, BLUE_CELL);
        assert_eq!(
            training_response(&a, Pose::new(5, 5, Direction::North)),
            Some(Response::Forward)
        );
        assert_eq!(
            training_response(&a, Pose::new(5, 5, Direction::West)),
            Some(Response::Right)
        );
        assert_eq!(
            training_response(&a, Pose::new(5, 5, Direction::East)),
            Some(Response::Left)
        );
    }

    #[test]
    fn test_training_reaches_food() {
        let mut automaton = Automaton::new(8, 8);
        automaton.set(4, 6, BLUE_CELL);
        automaton.checkpoint();
        let mut world = World::new(automaton, SensorConfig::default());
        let engine = ReflexFactory.create(&EngineSpec::new(1, 4517));
        let mut mox = Mox::new(0, Species::Forager, Pose::new(1, 1, Direction::South), engine);

        train_forager(&mut world, &mut mox, 40, false);
        assert_eq!(mox.need(), 0.0);
        assert_eq!(mox.driver, Driver::Autonomous);
        assert_eq!(world.automaton().get(4, 6), BLUE_CELL);
    }
}
