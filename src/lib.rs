//! Stagewalk - a live, event-driven stage visualization
//!
//! Core modules:
//! - `sim`: Deterministic per-tick simulation (walkers, collectibles, donation effects)
//! - `transport`: Resilient server-push client (backoff reconnect, typed fan-out)
//! - `net`: Fire-and-forget command submission with bounded retries
//! - `config`: Endpoint and stage configuration

pub mod config;
pub mod net;
pub mod sim;
pub mod transport;

pub use config::Config;

/// Stage and behavior constants
pub mod consts {
    /// Stage dimensions in CSS pixels
    pub const STAGE_WIDTH: f32 = 900.0;
    pub const STAGE_HEIGHT: f32 = 500.0;
    /// Ground line; walkers stand with their feet here
    pub const GROUND_Y: f32 = 436.0;

    /// Sprite frame size (512x512 sheet, 8x8 grid)
    pub const FRAME_WIDTH: f32 = 64.0;
    pub const FRAME_HEIGHT: f32 = 64.0;
    /// Walk cycle length in sheet frames
    pub const WALK_FRAMES: f32 = 4.0;
    /// Frame cursor advance per tick while walking
    pub const WALK_ANIM_SPEED: f32 = 0.15;

    /// Walker locomotion
    pub const WALKER_BASE_SPEED: f32 = 2.5;
    pub const WALKER_SPEED_VARIATION: f32 = 1.0;
    /// Jump arc peak in pixels
    pub const JUMP_HEIGHT: f32 = 50.0;
    /// Ticks from takeoff to landing
    pub const JUMP_DURATION: u32 = 20;
    /// Ticks between consecutive jumps of one burst
    pub const JUMP_COOLDOWN_TICKS: u32 = 5;
    /// Jumps performed on edge arrival
    pub const JUMPS_AT_EDGE: u32 = 2;

    /// Walker eviction: wall-clock ceiling and out-of-bounds margin
    pub const WALKER_MAX_AGE_MS: f64 = 60_000.0;
    pub const WALKER_OOB_MARGIN: f32 = 200.0;

    /// Collectible objects
    pub const MAX_OBJECTS: usize = 50;
    pub const OBJECT_SIZE: f32 = 20.0;
    pub const OBJECT_GLOW_SPEED: f32 = 0.05;
    pub const OBJECT_BOB_SPEED: f32 = 0.03;
    pub const OBJECT_BOB_HEIGHT: f32 = 10.0;
    /// Collision radius: object radius plus a fixed margin
    pub const COLLISION_RADIUS: f32 = OBJECT_SIZE / 2.0 + 20.0;

    /// Donation effect easing
    pub const EFFECT_SCALE_RATE: f32 = 4.0;
    /// Fraction of the lifetime after which alpha fades linearly to zero
    pub const EFFECT_FADE_START: f32 = 0.7;
    /// Downward acceleration applied to effect particles, px/tick^2
    pub const PARTICLE_GRAVITY: f32 = 0.15;

    /// Floating text overlay decay per tick
    pub const FLOATING_TEXT_FADE: f32 = 0.02;
    pub const FLOATING_TEXT_RISE: f32 = 0.8;

    /// Per-tick delta clamp; one backgrounded-tab resume must not become
    /// one giant simulation step
    pub const MAX_DELTA_SECS: f32 = 0.1;
}

/// Half-sine jump arc: progress in [0,1] maps to vertical offset in pixels
#[inline]
pub fn jump_offset(progress: f32, height: f32) -> f32 {
    (progress * std::f32::consts::PI).sin() * height
}

/// Linear fade over the tail of a normalized lifetime: 1.0 until `fade_start`,
/// then down to 0.0 exactly at progress 1.0
#[inline]
pub fn tail_fade(progress: f32, fade_start: f32) -> f32 {
    if progress <= fade_start {
        1.0
    } else {
        (1.0 - (progress - fade_start) / (1.0 - fade_start)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_offset_peaks_mid_arc() {
        assert!(jump_offset(0.0, 50.0).abs() < 0.001);
        assert!((jump_offset(0.5, 50.0) - 50.0).abs() < 0.001);
        assert!(jump_offset(1.0, 50.0).abs() < 0.001);
    }

    #[test]
    fn tail_fade_is_flat_then_linear() {
        assert_eq!(tail_fade(0.0, 0.7), 1.0);
        assert_eq!(tail_fade(0.7, 0.7), 1.0);
        assert!((tail_fade(0.85, 0.7) - 0.5).abs() < 0.001);
        assert!(tail_fade(1.0, 0.7).abs() < 0.001);
    }
}
