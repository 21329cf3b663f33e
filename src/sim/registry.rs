//! Entity registry
//!
//! The one owner of all live entities. Transport callbacks and the per-tick
//! simulators both mutate it, but only on the main tick queue, so no locking
//! is involved; every mutation is a whole-record insert or an atomic field
//! flip. Simulators receive it by reference, never through globals.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::state::*;
use crate::consts::*;

pub struct EntityRegistry {
    walkers: Vec<Walker>,
    objects: Vec<CollectibleObject>,
    effects: Vec<DonationEffect>,
    texts: Vec<FloatingText>,
    rng: Pcg32,
    next_id: EntityId,
    now_ms: f64,
}

impl EntityRegistry {
    pub fn new(seed: u64) -> Self {
        Self {
            walkers: Vec::new(),
            objects: Vec::new(),
            effects: Vec::new(),
            texts: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
            now_ms: 0.0,
        }
    }

    /// Wall-clock reference for ages and effect progress; the clock sets it
    /// once per tick, transport spawns between ticks use the last value.
    pub fn set_now(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn a walker. Entry side is the left edge when no origin is given or
    /// the origin lies left of stage center, else the right edge; the initial
    /// direction mirrors the entry side.
    pub fn spawn_walker(&mut self, origin_x: Option<f32>, label: &str) -> EntityId {
        let enters_left = origin_x.is_none_or(|x| x < STAGE_WIDTH / 2.0);
        let (start_x, direction) = if enters_left {
            (-FRAME_WIDTH, Direction::Right)
        } else {
            (STAGE_WIDTH + FRAME_WIDTH, Direction::Left)
        };
        let speed = WALKER_BASE_SPEED + self.rng.random_range(0.0..WALKER_SPEED_VARIATION);
        let id = self.next_entity_id();
        self.walkers.push(Walker {
            id,
            pos: Vec2::new(start_x, GROUND_Y - FRAME_HEIGHT),
            direction,
            speed,
            anim: WalkerAnim::Walking,
            frame_cursor: 0.0,
            jumps_remaining: 0,
            jump_cooldown_ticks: 0,
            owner: label.to_string(),
            spawned_at_ms: self.now_ms,
        });
        log::info!("walker {id} ({label}) entered from the {}", if enters_left { "left" } else { "right" });
        id
    }

    /// Spawn a collectible. Past the cap, the oldest surviving object is
    /// evicted first (FIFO) so event floods stay bounded.
    pub fn spawn_object(&mut self, pos: Option<Vec2>) -> EntityId {
        let pos = pos.unwrap_or_else(|| {
            Vec2::new(
                self.rng.random_range(0.0..800.0) + 50.0,
                self.rng.random_range(0.0..300.0) + 100.0,
            )
        });
        if self.objects.len() >= MAX_OBJECTS {
            let victim = self
                .objects
                .iter()
                .position(|o| !o.collected)
                .unwrap_or(0);
            self.objects.remove(victim);
        }
        let id = self.next_entity_id();
        self.objects.push(CollectibleObject {
            id,
            pos,
            base_y: pos.y,
            collected: false,
            glow_phase: 0.0,
            bob_phase: 0.0,
        });
        id
    }

    /// Spawn a donation burst; tier, duration and particle makeup derive from
    /// the amount.
    pub fn spawn_donation_effect(
        &mut self,
        pos: Vec2,
        amount: f64,
        label: &str,
        message: Option<String>,
    ) -> EntityId {
        let tier = EffectTier::from_amount(amount);
        let params = tier.params();
        let mut particles = Vec::with_capacity(params.particle_count);
        for _ in 0..params.particle_count {
            particles.push(Particle {
                pos,
                vel: Vec2::new(
                    self.rng.random_range(-3.0..3.0),
                    self.rng.random_range(-5.0..-1.0),
                ),
                life: 1.0,
                size: params.particle_size,
                color: params.color,
            });
        }
        let id = self.next_entity_id();
        self.effects.push(DonationEffect {
            id,
            pos,
            tier,
            amount,
            user: label.to_string(),
            message,
            started_at_ms: self.now_ms,
            duration_ms: params.duration_ms,
            particles,
            scale: 0.0,
            alpha: 1.0,
        });
        log::info!("donation effect {id}: {label} gave {amount} ({tier:?})");
        id
    }

    pub fn spawn_floating_text(&mut self, text: impl Into<String>, pos: Vec2) {
        self.texts.push(FloatingText {
            text: text.into(),
            pos,
            alpha: 1.0,
        });
    }

    // Live views, consumed (and mutated in place) by the simulators.

    pub fn walkers(&self) -> &[Walker] {
        &self.walkers
    }

    pub fn walkers_mut(&mut self) -> &mut Vec<Walker> {
        &mut self.walkers
    }

    pub fn objects(&self) -> &[CollectibleObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut Vec<CollectibleObject> {
        &mut self.objects
    }

    pub fn effects(&self) -> &[DonationEffect] {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut Vec<DonationEffect> {
        &mut self.effects
    }

    pub fn texts(&self) -> &[FloatingText] {
        &self.texts
    }

    pub fn texts_mut(&mut self) -> &mut Vec<FloatingText> {
        &mut self.texts
    }

    /// Drop collected objects; runs at the end of every tick so a collected
    /// object is never visible to the next render pass.
    pub fn purge_collected(&mut self) {
        self.objects.retain(|o| !o.collected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walker_entry_side_mirrors_origin() {
        let mut reg = EntityRegistry::new(7);
        reg.spawn_walker(None, "a");
        reg.spawn_walker(Some(10.0), "b");
        reg.spawn_walker(Some(800.0), "c");

        assert_eq!(reg.walkers()[0].direction, Direction::Right);
        assert_eq!(reg.walkers()[0].pos.x, -FRAME_WIDTH);
        assert_eq!(reg.walkers()[1].direction, Direction::Right);
        assert_eq!(reg.walkers()[2].direction, Direction::Left);
        assert_eq!(reg.walkers()[2].pos.x, STAGE_WIDTH + FRAME_WIDTH);
    }

    #[test]
    fn walker_speed_is_base_plus_bounded_variation() {
        let mut reg = EntityRegistry::new(7);
        for i in 0..20 {
            reg.spawn_walker(None, &format!("w{i}"));
        }
        for w in reg.walkers() {
            assert!(w.speed >= WALKER_BASE_SPEED);
            assert!(w.speed < WALKER_BASE_SPEED + WALKER_SPEED_VARIATION);
        }
    }

    #[test]
    fn object_cap_evicts_oldest_first() {
        let mut reg = EntityRegistry::new(7);
        let first = reg.spawn_object(Some(Vec2::new(100.0, 100.0)));
        for _ in 0..MAX_OBJECTS {
            reg.spawn_object(None);
        }
        assert_eq!(reg.objects().len(), MAX_OBJECTS);
        assert!(reg.objects().iter().all(|o| o.id != first));
        // Second-oldest survived the single eviction
        assert!(reg.objects().iter().any(|o| o.id == first + 1));
    }

    #[test]
    fn cap_eviction_skips_collected_objects() {
        let mut reg = EntityRegistry::new(7);
        let first = reg.spawn_object(None);
        for _ in 0..(MAX_OBJECTS - 1) {
            reg.spawn_object(None);
        }
        // Mark the oldest collected; the eviction victim must be the oldest
        // *surviving* object instead
        reg.objects_mut()[0].collected = true;
        let second = reg.objects()[1].id;
        reg.spawn_object(None);
        assert!(reg.objects().iter().any(|o| o.id == first));
        assert!(reg.objects().iter().all(|o| o.id != second));
    }

    #[test]
    fn effect_particles_follow_the_tier_table() {
        let mut reg = EntityRegistry::new(7);
        reg.spawn_donation_effect(Vec2::new(450.0, 250.0), 5.0, "a", None);
        reg.spawn_donation_effect(Vec2::new(450.0, 250.0), 150.0, "b", None);
        assert_eq!(reg.effects()[0].tier, EffectTier::Basic);
        assert_eq!(reg.effects()[0].particles.len(), 10);
        assert_eq!(reg.effects()[0].duration_ms, 2000.0);
        assert_eq!(reg.effects()[1].tier, EffectTier::Mega);
        assert_eq!(reg.effects()[1].particles.len(), 60);
        assert_eq!(reg.effects()[1].duration_ms, 5000.0);
    }

    #[test]
    fn purge_drops_only_collected() {
        let mut reg = EntityRegistry::new(7);
        let a = reg.spawn_object(None);
        let b = reg.spawn_object(None);
        reg.objects_mut()
            .iter_mut()
            .find(|o| o.id == a)
            .unwrap()
            .collected = true;
        reg.purge_collected();
        assert_eq!(reg.objects().len(), 1);
        assert_eq!(reg.objects()[0].id, b);
    }
}
