//! Tessera Engine -- system phases and a fixed-timestep tick loop.
//!
//! This crate builds on [`tessera_ecs`] to provide the simulation driver:
//! systems declare which of the Init, Update and Destroy phases they take part
//! in, a [`SystemScheduler`](scheduler::SystemScheduler) dispatches each phase
//! in registration order, and a [`TickLoop`](tick::TickLoop) runs the Update
//! phase at a fixed time step.
//!
//! # Quick Start
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! struct Score(u32);
//!
//! let mut world = World::new();
//! let player = world.create_entity();
//! world.add_component(player, Score(0)).unwrap();
//!
//! let mut tick_loop = TickLoop::new(world, TickConfig::default());
//! tick_loop.add_system("scoring", |world, _dt| {
//!     let filter = world.filter::<(Score,)>().build();
//!     for (_, (mut score,)) in filter.iter_mut() {
//!         score.0 += 1;
//!     }
//! });
//!
//! tick_loop.run_ticks(100);
//! let mut world = tick_loop.shutdown();
//! assert_eq!(world.pool::<Score>().get(player).0, 100);
//! ```

#![deny(unsafe_code)]

pub mod logging;
pub mod scheduler;
pub mod system;
pub mod tick;

/// Re-export the ECS crate for convenience.
pub use tessera_ecs;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the engine layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A system was registered without implementing any phase trait.
    #[error("system '{system}' does not implement any phase")]
    NoPhases { system: String },

    /// The tick configuration could not be parsed.
    #[error("invalid tick configuration: {0}")]
    Config(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tessera_ecs::prelude::*;

    pub use crate::scheduler::SystemScheduler;
    pub use crate::system::{DestroySystem, FnSystem, InitSystem, Phase, System, UpdateSystem};
    pub use crate::tick::{TickConfig, TickDiagnostics, TickLoop};
    pub use crate::EngineError;
}
