//! Deterministic stage simulation
//!
//! All entity logic lives here. This module must stay platform-free:
//! - Seeded RNG only
//! - Wall-clock time arrives as an argument, never from a syscall
//! - No rendering or transport dependencies
//!
//! The host (wasm or tests) owns an [`EntityRegistry`] and a [`Ticker`] and
//! calls [`Ticker::tick`] once per frame.

pub mod collision;
pub mod effects;
pub mod registry;
pub mod state;
pub mod tick;
pub mod walker;

pub use collision::{Collection, CollisionEngine};
pub use effects::DonationEffectSimulator;
pub use registry::EntityRegistry;
pub use state::{
    CollectibleObject, Direction, DonationEffect, EffectTier, EntityId, FloatingText, Particle,
    TierParams, Walker, WalkerAnim,
};
pub use tick::{SimulationClock, Ticker};
pub use walker::WalkerSimulator;
