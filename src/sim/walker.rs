//! Walker locomotion and jump state machine
//!
//! Per tick, per walker: horizontal motion while walking, edge detection,
//! the jump-burst sub-machine (jump, short cooldown, re-jump, flip direction
//! when the burst is spent), walk-cycle frame advance, then eviction by age
//! or out-of-bounds distance. The simulator is the only writer of walker
//! state; collision reactions arrive through `command_jumps`, never as direct
//! field writes.

use super::registry::EntityRegistry;
use super::state::{EntityId, WalkerAnim};
use crate::consts::*;

/// One-shot "begin N jumps here" request, queued until the next update.
#[derive(Debug, Clone, Copy)]
struct JumpCommand {
    walker: EntityId,
    count: u32,
}

#[derive(Default)]
pub struct WalkerSimulator {
    pending: Vec<JumpCommand>,
}

impl WalkerSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Public command surface: request a jump burst for one walker. Applied
    /// at the start of the next update.
    pub fn command_jumps(&mut self, walker: EntityId, count: u32) {
        self.pending.push(JumpCommand { walker, count });
    }

    pub fn update(&mut self, reg: &mut EntityRegistry, dt: f32) {
        for cmd in self.pending.drain(..) {
            if let Some(w) = reg.walkers_mut().iter_mut().find(|w| w.id == cmd.walker) {
                w.jumps_remaining = cmd.count;
                w.jump_cooldown_ticks = 0;
                if w.anim == WalkerAnim::Walking {
                    w.anim = WalkerAnim::Jumping { jump_frame: 0 };
                }
            }
        }

        let now_ms = reg.now_ms();
        for w in reg.walkers_mut().iter_mut() {
            // Horizontal motion, 60 fps-normalized
            if w.anim == WalkerAnim::Walking {
                w.pos.x += w.speed * w.direction.sign() * dt * 60.0;
            }

            // Edge arrival starts a jump burst, once, outside any cooldown
            let at_left = w.pos.x <= 0.0 && w.direction.sign() < 0.0;
            let at_right =
                w.pos.x >= STAGE_WIDTH - FRAME_WIDTH && w.direction.sign() > 0.0;
            if (at_left || at_right)
                && w.anim == WalkerAnim::Walking
                && w.jump_cooldown_ticks == 0
                && w.jumps_remaining == 0
            {
                w.jumps_remaining = JUMPS_AT_EDGE;
                w.anim = WalkerAnim::Jumping { jump_frame: 0 };
            }

            // Advance the current jump; on landing either cool down for the
            // next jump of the burst or flip direction and walk away
            if let WalkerAnim::Jumping { jump_frame } = w.anim {
                let jump_frame = jump_frame + 1;
                if jump_frame > JUMP_DURATION {
                    w.anim = WalkerAnim::Walking;
                    w.jumps_remaining = w.jumps_remaining.saturating_sub(1);
                    if w.jumps_remaining > 0 {
                        w.jump_cooldown_ticks = JUMP_COOLDOWN_TICKS;
                    } else {
                        w.direction = w.direction.flipped();
                    }
                } else {
                    w.anim = WalkerAnim::Jumping { jump_frame };
                }
            } else if w.jump_cooldown_ticks > 0 {
                w.jump_cooldown_ticks -= 1;
                if w.jump_cooldown_ticks == 0 && w.jumps_remaining > 0 {
                    w.anim = WalkerAnim::Jumping { jump_frame: 0 };
                }
            }

            // Walk-cycle frames only advance on the ground
            if w.anim == WalkerAnim::Walking {
                w.frame_cursor += WALK_ANIM_SPEED;
                if w.frame_cursor >= WALK_FRAMES {
                    w.frame_cursor = 0.0;
                }
            }
        }

        // Eviction runs every tick, after the motion pass
        reg.walkers_mut().retain(|w| {
            let expired = w.age_ms(now_ms) > WALKER_MAX_AGE_MS;
            let far_outside = w.pos.x < -WALKER_OOB_MARGIN
                || w.pos.x > STAGE_WIDTH + WALKER_OOB_MARGIN;
            if expired || far_outside {
                log::info!("walker {} ({}) evicted", w.id, w.owner);
            }
            !(expired || far_outside)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Direction;

    const DT: f32 = 1.0 / 60.0;

    fn registry_with_walker(origin: Option<f32>) -> (EntityRegistry, EntityId) {
        let mut reg = EntityRegistry::new(42);
        let id = reg.spawn_walker(origin, "tester");
        (reg, id)
    }

    #[test]
    fn walker_crosses_stage_jumps_twice_then_reverses() {
        let (mut reg, id) = registry_with_walker(None);
        let mut sim = WalkerSimulator::new();
        assert_eq!(reg.walkers()[0].pos.x, -FRAME_WIDTH);
        assert_eq!(reg.walkers()[0].direction, Direction::Right);

        let mut jumps_seen = 0;
        let mut prev_jumping = false;
        for _ in 0..40_000 {
            sim.update(&mut reg, DT);
            let w = reg.walkers().iter().find(|w| w.id == id).expect("evicted");
            let jumping = matches!(w.anim, WalkerAnim::Jumping { .. });
            if jumping && !prev_jumping {
                jumps_seen += 1;
            }
            prev_jumping = jumping;
            if w.direction == Direction::Left {
                break;
            }
        }
        let w = reg.walkers().iter().find(|w| w.id == id).unwrap();
        assert_eq!(w.direction, Direction::Left, "walker never reversed");
        assert_eq!(jumps_seen, 2, "expected exactly two edge jumps");
        assert!(w.pos.x >= STAGE_WIDTH - FRAME_WIDTH - w.speed * 2.0);
    }

    #[test]
    fn jump_arc_is_a_half_sine() {
        let (mut reg, _) = registry_with_walker(None);
        let mut sim = WalkerSimulator::new();
        let id = reg.walkers()[0].id;
        sim.command_jumps(id, 1);
        sim.update(&mut reg, DT);

        let mut peak = 0.0f32;
        for _ in 0..JUMP_DURATION {
            let w = &reg.walkers()[0];
            peak = peak.max(w.y_offset());
            sim.update(&mut reg, DT);
        }
        assert!((peak - JUMP_HEIGHT).abs() < 5.0, "peak {peak} far from {JUMP_HEIGHT}");
    }

    #[test]
    fn frame_cursor_is_frozen_while_jumping() {
        let (mut reg, id) = registry_with_walker(None);
        let mut sim = WalkerSimulator::new();
        sim.command_jumps(id, 1);
        sim.update(&mut reg, DT);
        let before = reg.walkers()[0].frame_cursor;
        sim.update(&mut reg, DT);
        assert_eq!(reg.walkers()[0].frame_cursor, before);
    }

    #[test]
    fn frame_cursor_wraps_at_walk_cycle_length() {
        let (mut reg, _) = registry_with_walker(None);
        let mut sim = WalkerSimulator::new();
        for _ in 0..200 {
            sim.update(&mut reg, DT);
            if reg.walkers().is_empty() {
                break;
            }
            let cursor = reg.walkers()[0].frame_cursor;
            assert!((0.0..WALK_FRAMES).contains(&cursor));
        }
    }

    #[test]
    fn burst_has_a_cooldown_between_jumps() {
        let (mut reg, id) = registry_with_walker(None);
        let mut sim = WalkerSimulator::new();
        sim.command_jumps(id, 2);
        sim.update(&mut reg, DT);

        // Ride out the first jump
        for _ in 0..JUMP_DURATION {
            sim.update(&mut reg, DT);
        }
        let w = &reg.walkers()[0];
        assert_eq!(w.anim, WalkerAnim::Walking);
        assert_eq!(w.jumps_remaining, 1);
        assert_eq!(w.jump_cooldown_ticks, JUMP_COOLDOWN_TICKS);

        // Cooldown elapses, second jump begins
        for _ in 0..JUMP_COOLDOWN_TICKS {
            sim.update(&mut reg, DT);
        }
        assert!(matches!(reg.walkers()[0].anim, WalkerAnim::Jumping { .. }));
    }

    #[test]
    fn eviction_by_wall_clock_age() {
        let mut reg = EntityRegistry::new(42);
        reg.set_now(1_000.0);
        let id = reg.spawn_walker(None, "old");
        let mut sim = WalkerSimulator::new();
        reg.set_now(1_000.0 + WALKER_MAX_AGE_MS + 1.0);
        sim.update(&mut reg, DT);
        assert!(reg.walkers().iter().all(|w| w.id != id));
    }

    #[test]
    fn eviction_past_the_stage_margin() {
        let (mut reg, id) = registry_with_walker(None);
        let mut sim = WalkerSimulator::new();
        reg.walkers_mut()[0].pos.x = STAGE_WIDTH + WALKER_OOB_MARGIN + 10.0;
        sim.update(&mut reg, DT);
        assert!(reg.walkers().iter().all(|w| w.id != id));
    }

    #[test]
    fn direction_invariant_holds_across_a_long_run() {
        let mut reg = EntityRegistry::new(99);
        let mut sim = WalkerSimulator::new();
        for i in 0..5 {
            reg.spawn_walker(Some(i as f32 * 200.0), &format!("w{i}"));
        }
        for tick in 0..10_000 {
            sim.update(&mut reg, DT);
            for w in reg.walkers() {
                assert!(
                    w.direction.sign() == 1.0 || w.direction.sign() == -1.0,
                    "tick {tick}: direction out of range"
                );
            }
        }
    }
}
