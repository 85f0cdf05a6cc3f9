//! System capability traits.
//!
//! A system is any `'static` value that takes part in one or more of the three
//! phases. Each phase has its own trait; the [`System`] trait is how the
//! scheduler discovers which of them a value implements.
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! struct Gravity;
//!
//! impl UpdateSystem for Gravity {
//!     fn update(&mut self, _world: &mut World, _dt: f32) {}
//! }
//!
//! impl System for Gravity {
//!     fn as_update(&mut self) -> Option<&mut dyn UpdateSystem> {
//!         Some(self)
//!     }
//! }
//!
//! let mut scheduler = SystemScheduler::new(World::new());
//! scheduler.add(Gravity).unwrap();
//! assert_eq!(scheduler.phase_len(Phase::Update), 1);
//! ```

use std::fmt;

use tessera_ecs::world::World;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The three points in a world's life at which systems run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Runs once, before the first update.
    Init,
    /// Runs every tick with the elapsed time.
    Update,
    /// Runs once at shutdown.
    Destroy,
}

impl Phase {
    /// All phases, in lifecycle order.
    pub const ALL: [Phase; 3] = [Phase::Init, Phase::Update, Phase::Destroy];

    pub(crate) fn slot(self) -> usize {
        match self {
            Phase::Init => 0,
            Phase::Update => 1,
            Phase::Destroy => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "init",
            Phase::Update => "update",
            Phase::Destroy => "destroy",
        })
    }
}

// ---------------------------------------------------------------------------
// Phase traits
// ---------------------------------------------------------------------------

/// Runs once before the first update.
pub trait InitSystem {
    fn init(&mut self, world: &mut World);
}

/// Runs every tick. `dt` is the elapsed time in seconds.
pub trait UpdateSystem {
    fn update(&mut self, world: &mut World, dt: f32);
}

/// Runs once at shutdown.
pub trait DestroySystem {
    fn destroy(&mut self, world: &mut World);
}

/// A value the scheduler can register.
///
/// Override the `as_*` accessor of every phase the type implements, returning
/// `Some(self)`. A system must take part in at least one phase.
pub trait System: 'static {
    /// Name used in logs and [`SystemScheduler::system_names`](crate::scheduler::SystemScheduler::system_names).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        None
    }

    fn as_update(&mut self) -> Option<&mut dyn UpdateSystem> {
        None
    }

    fn as_destroy(&mut self) -> Option<&mut dyn DestroySystem> {
        None
    }

    /// Whether this system takes part in `phase`.
    fn runs_in(&mut self, phase: Phase) -> bool {
        match phase {
            Phase::Init => self.as_init().is_some(),
            Phase::Update => self.as_update().is_some(),
            Phase::Destroy => self.as_destroy().is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// FnSystem
// ---------------------------------------------------------------------------

/// An update-only system wrapping a closure.
pub struct FnSystem<F> {
    name: String,
    func: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut World, f32) + 'static,
{
    pub fn new(name: &str, func: F) -> Self {
        Self {
            name: name.to_owned(),
            func,
        }
    }
}

impl<F> UpdateSystem for FnSystem<F>
where
    F: FnMut(&mut World, f32) + 'static,
{
    fn update(&mut self, world: &mut World, dt: f32) {
        (self.func)(world, dt);
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut World, f32) + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn as_update(&mut self) -> Option<&mut dyn UpdateSystem> {
        Some(self)
    }
}

impl<F> fmt::Debug for FnSystem<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSystem").field("name", &self.name).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
