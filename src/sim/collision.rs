//! Walker / collectible proximity scan
//!
//! Runs once per tick after movement. An object is claimed by the first
//! walker (registry order) whose sprite center comes within
//! [`COLLISION_RADIUS`] of it; the claim flips `collected` atomically so no
//! second walker can collect the same object in the same tick.

use glam::Vec2;

use super::registry::EntityRegistry;
use crate::consts::COLLISION_RADIUS;
use crate::sim::state::EntityId;

/// One resolved collection, reported to the tick driver for reactions
/// (jump burst, floating text).
#[derive(Debug, Clone, Copy)]
pub struct Collection {
    pub walker: EntityId,
    pub object: EntityId,
    pub pos: Vec2,
}

#[derive(Default)]
pub struct CollisionEngine;

impl CollisionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, reg: &mut EntityRegistry) -> Vec<Collection> {
        let centers: Vec<(EntityId, Vec2)> =
            reg.walkers().iter().map(|w| (w.id, w.center())).collect();

        let mut hits = Vec::new();
        for obj in reg.objects_mut().iter_mut() {
            if obj.collected {
                continue;
            }
            for &(walker, center) in &centers {
                if center.distance(obj.pos) < COLLISION_RADIUS {
                    obj.collected = true;
                    hits.push(Collection {
                        walker,
                        object: obj.id,
                        pos: obj.pos,
                    });
                    break;
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{FRAME_HEIGHT, FRAME_WIDTH};

    fn place_walker(reg: &mut EntityRegistry, center: Vec2) -> EntityId {
        let id = reg.spawn_walker(None, "w");
        let w = reg.walkers_mut().last_mut().unwrap();
        w.pos = center - Vec2::new(FRAME_WIDTH / 2.0, FRAME_HEIGHT / 2.0);
        id
    }

    #[test]
    fn overlap_within_radius_collects() {
        let mut reg = EntityRegistry::new(3);
        let walker = place_walker(&mut reg, Vec2::new(100.0, 100.0));
        let object = reg.spawn_object(Some(Vec2::new(105.0, 102.0)));

        let hits = CollisionEngine::new().scan(&mut reg);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].walker, walker);
        assert_eq!(hits[0].object, object);
        assert!(reg.objects()[0].collected);
    }

    #[test]
    fn just_outside_the_radius_is_a_miss() {
        let mut reg = EntityRegistry::new(3);
        place_walker(&mut reg, Vec2::new(100.0, 100.0));
        reg.spawn_object(Some(Vec2::new(100.0 + COLLISION_RADIUS + 0.5, 100.0)));

        assert!(CollisionEngine::new().scan(&mut reg).is_empty());
    }

    #[test]
    fn only_one_walker_claims_an_object() {
        let mut reg = EntityRegistry::new(3);
        let a = place_walker(&mut reg, Vec2::new(100.0, 100.0));
        place_walker(&mut reg, Vec2::new(102.0, 100.0));
        reg.spawn_object(Some(Vec2::new(101.0, 100.0)));

        let hits = CollisionEngine::new().scan(&mut reg);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].walker, a);
    }

    #[test]
    fn collected_objects_are_skipped() {
        let mut reg = EntityRegistry::new(3);
        place_walker(&mut reg, Vec2::new(100.0, 100.0));
        reg.spawn_object(Some(Vec2::new(100.0, 100.0)));
        reg.objects_mut()[0].collected = true;

        assert!(CollisionEngine::new().scan(&mut reg).is_empty());
    }

    #[test]
    fn one_walker_can_claim_several_objects_in_a_tick() {
        let mut reg = EntityRegistry::new(3);
        place_walker(&mut reg, Vec2::new(100.0, 100.0));
        reg.spawn_object(Some(Vec2::new(95.0, 100.0)));
        reg.spawn_object(Some(Vec2::new(105.0, 100.0)));

        assert_eq!(CollisionEngine::new().scan(&mut reg).len(), 2);
    }
}
