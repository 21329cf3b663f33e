//! Per-frame tick driver
//!
//! One tick: advance the shared clock, move walkers, animate collectibles,
//! age donation effects, resolve collisions and their reactions, then purge
//! what the tick consumed. The order is fixed so a collected object is gone
//! before the next render and a jump commanded by a collision lands on the
//! very next tick.

use super::collision::{Collection, CollisionEngine};
use super::effects::DonationEffectSimulator;
use super::registry::EntityRegistry;
use super::walker::WalkerSimulator;
use crate::consts::*;

/// Frame clock. Converts wall-clock timestamps into clamped per-tick deltas
/// so a backgrounded tab never produces one giant integration step.
#[derive(Debug, Default)]
pub struct SimulationClock {
    last_ms: Option<f64>,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta seconds since the previous call, clamped to [`MAX_DELTA_SECS`].
    /// The first call yields one nominal 60 fps frame.
    pub fn advance(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 1.0 / 60.0,
        };
        self.last_ms = Some(now_ms);
        dt.clamp(0.0, MAX_DELTA_SECS)
    }
}

/// The whole per-frame pipeline, bundled so the host only holds one value.
pub struct Ticker {
    pub clock: SimulationClock,
    pub walkers: WalkerSimulator,
    pub effects: DonationEffectSimulator,
    pub collisions: CollisionEngine,
}

impl Ticker {
    pub fn new() -> Self {
        Self {
            clock: SimulationClock::new(),
            walkers: WalkerSimulator::new(),
            effects: DonationEffectSimulator::new(),
            collisions: CollisionEngine::new(),
        }
    }

    /// Advance everything to `now_ms`. Returns the collections resolved this
    /// tick, already reacted to (jump burst queued, floating text spawned).
    pub fn tick(&mut self, reg: &mut EntityRegistry, now_ms: f64) -> Vec<Collection> {
        let dt = self.clock.advance(now_ms);
        reg.set_now(now_ms);

        self.walkers.update(reg, dt);

        // Collectible idle animation
        for obj in reg.objects_mut().iter_mut() {
            obj.glow_phase += OBJECT_GLOW_SPEED;
            obj.bob_phase += OBJECT_BOB_SPEED;
            obj.pos.y = obj.bobbed_y();
        }

        self.effects.update(reg, dt);

        let hits = self.collisions.scan(reg);
        for hit in &hits {
            self.walkers.command_jumps(hit.walker, JUMPS_AT_EDGE);
            reg.spawn_floating_text("Collected!", hit.pos);
        }

        // Floating text rises and fades at a fixed per-tick rate
        reg.texts_mut().retain_mut(|t| {
            t.pos.y -= FLOATING_TEXT_RISE;
            t.alpha -= FLOATING_TEXT_FADE;
            t.alpha > 0.0
        });

        reg.purge_collected();
        hits
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}
