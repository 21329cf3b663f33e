//! Entity types for the stage simulation
//!
//! Three entity kinds live in the registry: walkers, collectible objects and
//! donation effects, plus the ephemeral floating-text overlay. The load-bearing
//! invariants (direction is always ±1, a collected object never renders again)
//! are enforced by construction here, not checked at runtime.

use glam::Vec2;

use crate::consts::*;
use crate::{jump_offset, tail_fade};

pub type EntityId = u32;

/// Horizontal travel direction. Closed so a walker can never hold anything
/// but ±1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Locomotion state. While `Jumping`, the walk-cycle frame cursor is frozen
/// and `jump_frame` drives the half-sine vertical offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkerAnim {
    Walking,
    Jumping { jump_frame: u32 },
}

/// An animated entity traversing the stage horizontally.
#[derive(Debug, Clone)]
pub struct Walker {
    pub id: EntityId,
    /// Top-left of the sprite frame
    pub pos: Vec2,
    pub direction: Direction,
    /// Pixels per tick at the 60 fps reference rate
    pub speed: f32,
    pub anim: WalkerAnim,
    /// Walk-cycle cursor, wraps modulo [`WALK_FRAMES`]
    pub frame_cursor: f32,
    pub jumps_remaining: u32,
    pub jump_cooldown_ticks: u32,
    /// Display label of whoever spawned this walker
    pub owner: String,
    pub spawned_at_ms: f64,
}

impl Walker {
    /// Normalized jump progress while mid-jump.
    pub fn jump_progress(&self) -> Option<f32> {
        match self.anim {
            WalkerAnim::Jumping { jump_frame } => {
                Some((jump_frame as f32 / JUMP_DURATION as f32).min(1.0))
            }
            WalkerAnim::Walking => None,
        }
    }

    /// Vertical offset above the ground line, driven by the jump arc.
    pub fn y_offset(&self) -> f32 {
        self.jump_progress()
            .map(|p| jump_offset(p, JUMP_HEIGHT))
            .unwrap_or(0.0)
    }

    /// Visual center of the sprite, used by the collision scan.
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::new(FRAME_WIDTH / 2.0, FRAME_HEIGHT / 2.0)
    }

    pub fn age_ms(&self, now_ms: f64) -> f64 {
        now_ms - self.spawned_at_ms
    }
}

/// A static collectible marker spawned alongside donation events.
#[derive(Debug, Clone)]
pub struct CollectibleObject {
    pub id: EntityId,
    pub pos: Vec2,
    /// Anchor for the bobbing animation
    pub base_y: f32,
    pub collected: bool,
    pub glow_phase: f32,
    pub bob_phase: f32,
}

impl CollectibleObject {
    /// Pulsing glow in [0, 1].
    pub fn glow_intensity(&self) -> f32 {
        self.glow_phase.sin() * 0.5 + 0.5
    }

    /// Y with the bobbing offset applied (render only; collision uses `pos`).
    pub fn bobbed_y(&self) -> f32 {
        self.base_y + self.bob_phase.sin() * OBJECT_BOB_HEIGHT
    }
}

/// Donation size class. A pure function of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffectTier {
    Basic,
    Special,
    Super,
    Mega,
}

/// Per-tier burst parameters; values are load-bearing for visual parity.
#[derive(Debug, Clone, Copy)]
pub struct TierParams {
    pub duration_ms: f32,
    pub particle_count: usize,
    pub particle_size: f32,
    pub color: &'static str,
}

impl EffectTier {
    pub fn from_amount(amount: f64) -> Self {
        if amount >= 100.0 {
            EffectTier::Mega
        } else if amount >= 50.0 {
            EffectTier::Super
        } else if amount >= 10.0 {
            EffectTier::Special
        } else {
            EffectTier::Basic
        }
    }

    pub fn params(self) -> TierParams {
        match self {
            EffectTier::Basic => TierParams {
                duration_ms: 2000.0,
                particle_count: 10,
                particle_size: 20.0,
                color: "#74b9ff",
            },
            EffectTier::Special => TierParams {
                duration_ms: 3000.0,
                particle_count: 20,
                particle_size: 30.0,
                color: "#feca57",
            },
            EffectTier::Super => TierParams {
                duration_ms: 4000.0,
                particle_count: 40,
                particle_size: 40.0,
                color: "#fd79a8",
            },
            EffectTier::Mega => TierParams {
                duration_ms: 5000.0,
                particle_count: 60,
                particle_size: 50.0,
                color: "#e84393",
            },
        }
    }
}

/// One burst particle. `life` tracks the owning effect's progress, not an
/// independent age.
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub size: f32,
    pub color: &'static str,
}

/// A timed visual burst representing one donation event.
#[derive(Debug, Clone)]
pub struct DonationEffect {
    pub id: EntityId,
    pub pos: Vec2,
    pub tier: EffectTier,
    pub amount: f64,
    pub user: String,
    pub message: Option<String>,
    pub started_at_ms: f64,
    pub duration_ms: f32,
    pub particles: Vec<Particle>,
    pub scale: f32,
    pub alpha: f32,
}

impl DonationEffect {
    /// Normalized lifetime progress at `now_ms`, clamped to [0, 1].
    pub fn progress(&self, now_ms: f64) -> f32 {
        (((now_ms - self.started_at_ms) as f32) / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Alpha for a given progress: opaque through the first 70% of the
    /// lifetime, then a linear fade to transparent.
    pub fn alpha_for(progress: f32) -> f32 {
        tail_fade(progress, EFFECT_FADE_START)
    }
}

/// Short-lived rising text overlay (collection reactions, donation callouts).
#[derive(Debug, Clone)]
pub struct FloatingText {
    pub text: String,
    pub pos: Vec2,
    pub alpha: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tier_thresholds_match_the_table() {
        assert_eq!(EffectTier::from_amount(9.0), EffectTier::Basic);
        assert_eq!(EffectTier::from_amount(10.0), EffectTier::Special);
        assert_eq!(EffectTier::from_amount(49.0), EffectTier::Special);
        assert_eq!(EffectTier::from_amount(50.0), EffectTier::Super);
        assert_eq!(EffectTier::from_amount(99.0), EffectTier::Super);
        assert_eq!(EffectTier::from_amount(100.0), EffectTier::Mega);
    }

    #[test]
    fn tier_params_table() {
        let basic = EffectTier::Basic.params();
        assert_eq!((basic.duration_ms, basic.particle_count, basic.particle_size), (2000.0, 10, 20.0));
        let special = EffectTier::Special.params();
        assert_eq!((special.duration_ms, special.particle_count, special.particle_size), (3000.0, 20, 30.0));
        let sup = EffectTier::Super.params();
        assert_eq!((sup.duration_ms, sup.particle_count, sup.particle_size), (4000.0, 40, 40.0));
        let mega = EffectTier::Mega.params();
        assert_eq!((mega.duration_ms, mega.particle_count, mega.particle_size), (5000.0, 60, 50.0));
    }

    #[test]
    fn alpha_is_one_through_seventy_percent_then_linear() {
        assert_eq!(DonationEffect::alpha_for(0.0), 1.0);
        assert_eq!(DonationEffect::alpha_for(0.7), 1.0);
        assert!((DonationEffect::alpha_for(0.85) - 0.5).abs() < 1e-4);
        assert!(DonationEffect::alpha_for(1.0).abs() < 1e-4);
    }

    #[test]
    fn direction_flip_is_an_involution() {
        assert_eq!(Direction::Left.flipped(), Direction::Right);
        assert_eq!(Direction::Right.flipped().flipped(), Direction::Right);
        assert_eq!(Direction::Left.sign(), -1.0);
        assert_eq!(Direction::Right.sign(), 1.0);
    }

    proptest! {
        #[test]
        fn tier_is_monotone_in_amount(a in 0.0f64..500.0, b in 0.0f64..500.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(EffectTier::from_amount(lo) <= EffectTier::from_amount(hi));
        }

        #[test]
        fn alpha_stays_normalized(p in 0.0f32..=1.0) {
            let alpha = DonationEffect::alpha_for(p);
            prop_assert!((0.0..=1.0).contains(&alpha));
        }
    }
}
