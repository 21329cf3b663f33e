//! Donation effect lifetime and particle integration
//!
//! Effects are strictly timed: progress runs from 0 to 1 over the tier's
//! duration, and an effect at progress 1 is removed in the same update that
//! observes it, so a finished effect is never handed to the renderer.

use super::registry::EntityRegistry;
use crate::consts::*;

#[derive(Default)]
pub struct DonationEffectSimulator;

impl DonationEffectSimulator {
    pub fn new() -> Self {
        Self
    }

    pub fn update(&mut self, reg: &mut EntityRegistry, dt: f32) {
        let now_ms = reg.now_ms();
        reg.effects_mut().retain_mut(|effect| {
            let progress = effect.progress(now_ms);
            if progress >= 1.0 {
                return false;
            }

            // Pop-in scale and the tail fade
            effect.scale = (effect.scale + dt * EFFECT_SCALE_RATE).min(1.0);
            effect.alpha = crate::tail_fade(progress, EFFECT_FADE_START);

            // Particles ride the effect's clock; life is the remaining
            // fraction of the whole burst, not a per-particle age
            for p in &mut effect.particles {
                p.pos += p.vel * dt * 60.0;
                p.vel.y += PARTICLE_GRAVITY;
                p.life = 1.0 - progress;
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn effect_is_removed_the_tick_it_expires() {
        let mut reg = EntityRegistry::new(1);
        reg.set_now(0.0);
        reg.spawn_donation_effect(Vec2::new(450.0, 250.0), 5.0, "a", None);
        let mut sim = DonationEffectSimulator::new();

        reg.set_now(1999.0);
        sim.update(&mut reg, DT);
        assert_eq!(reg.effects().len(), 1);

        reg.set_now(2000.0);
        sim.update(&mut reg, DT);
        assert!(reg.effects().is_empty());
    }

    #[test]
    fn alpha_follows_the_tail_fade() {
        let mut reg = EntityRegistry::new(1);
        reg.set_now(0.0);
        reg.spawn_donation_effect(Vec2::new(450.0, 250.0), 5.0, "a", None);
        let mut sim = DonationEffectSimulator::new();

        // Basic tier: 2000 ms, fade starts at 70%
        reg.set_now(1000.0);
        sim.update(&mut reg, DT);
        assert_eq!(reg.effects()[0].alpha, 1.0);

        reg.set_now(1400.0);
        sim.update(&mut reg, DT);
        assert_eq!(reg.effects()[0].alpha, 1.0);

        reg.set_now(1700.0);
        sim.update(&mut reg, DT);
        assert!((reg.effects()[0].alpha - 0.5).abs() < 1e-3);
    }

    #[test]
    fn scale_pops_in_and_saturates_at_one() {
        let mut reg = EntityRegistry::new(1);
        reg.set_now(0.0);
        reg.spawn_donation_effect(Vec2::new(450.0, 250.0), 5.0, "a", None);
        let mut sim = DonationEffectSimulator::new();
        assert_eq!(reg.effects()[0].scale, 0.0);

        for i in 1..=30 {
            reg.set_now(i as f64 * DT as f64 * 1000.0);
            sim.update(&mut reg, DT);
        }
        assert_eq!(reg.effects()[0].scale, 1.0);
    }

    #[test]
    fn particle_life_tracks_effect_progress_in_lock_step() {
        let mut reg = EntityRegistry::new(1);
        reg.set_now(0.0);
        reg.spawn_donation_effect(Vec2::new(450.0, 250.0), 5.0, "a", None);
        let mut sim = DonationEffectSimulator::new();

        reg.set_now(1000.0);
        sim.update(&mut reg, DT);
        let progress = reg.effects()[0].progress(1000.0);
        for p in &reg.effects()[0].particles {
            assert_eq!(p.life, 1.0 - progress);
        }
    }

    #[test]
    fn particles_fall_under_gravity() {
        let mut reg = EntityRegistry::new(1);
        reg.set_now(0.0);
        reg.spawn_donation_effect(Vec2::new(450.0, 250.0), 5.0, "a", None);
        let before: Vec<f32> = reg.effects()[0].particles.iter().map(|p| p.vel.y).collect();
        let mut sim = DonationEffectSimulator::new();
        reg.set_now(16.0);
        sim.update(&mut reg, DT);
        for (p, old) in reg.effects()[0].particles.iter().zip(before) {
            assert_eq!(p.vel.y, old + PARTICLE_GRAVITY);
        }
    }
}
