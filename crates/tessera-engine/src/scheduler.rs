//! Phase scheduler.
//!
//! [`SystemScheduler`] owns a [`World`] and keeps one ordered list per
//! [`Phase`]. Registering a system files it into every list whose trait it
//! implements; running a phase dispatches the list in registration order.
//!
//! A system that implements several phases is stored once and shared by each
//! list, so state it builds during `init` is visible during `update`.

use std::fmt;

use tessera_ecs::world::World;

use crate::system::{FnSystem, Phase, System};
use crate::EngineError;

/// Runs Init, Update and Destroy systems against the world it owns.
pub struct SystemScheduler {
    world: World,
    /// Every registered system, in registration order.
    systems: Vec<Box<dyn System>>,
    /// Indices into `systems`, one list per phase.
    phases: [Vec<usize>; 3],
}

impl SystemScheduler {
    /// Create a scheduler bound to `world`, with no systems.
    pub fn new(world: World) -> Self {
        Self {
            world,
            systems: Vec::new(),
            phases: [Vec::new(), Vec::new(), Vec::new()],
        }
    }

    /// Register `system` in every phase it implements.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoPhases`] if the system implements none of the phase
    /// traits. Nothing is registered in that case.
    pub fn add<S: System>(&mut self, system: S) -> Result<&mut Self, EngineError> {
        self.add_boxed(Box::new(system))
    }

    /// Register an already boxed system. See [`add`](Self::add).
    pub fn add_boxed(&mut self, mut system: Box<dyn System>) -> Result<&mut Self, EngineError> {
        let phases: Vec<Phase> = Phase::ALL
            .into_iter()
            .filter(|&phase| system.runs_in(phase))
            .collect();
        if phases.is_empty() {
            tracing::warn!(system = system.name(), "system implements no phase");
            return Err(EngineError::NoPhases {
                system: system.name().to_owned(),
            });
        }

        let index = self.systems.len();
        for phase in &phases {
            self.phases[phase.slot()].push(index);
        }
        tracing::debug!(system = system.name(), ?phases, "registered system");
        self.systems.push(system);
        Ok(self)
    }

    /// Register a closure as an update-only system.
    pub fn add_update_fn<F>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: FnMut(&mut World, f32) + 'static,
    {
        let index = self.systems.len();
        self.phases[Phase::Update.slot()].push(index);
        self.systems.push(Box::new(FnSystem::new(name, func)));
        tracing::debug!(system = name, "registered update closure");
        self
    }

    // -- dispatch -----------------------------------------------------------

    /// Run every Init system once, in registration order.
    pub fn init(&mut self) {
        tracing::debug!(systems = self.phase_len(Phase::Init), "running init phase");
        for &index in &self.phases[Phase::Init.slot()] {
            let system = &mut self.systems[index];
            tracing::trace!(system = system.name(), "init");
            if let Some(system) = system.as_init() {
                system.init(&mut self.world);
            }
        }
    }

    /// Run every Update system once with `dt`, in registration order.
    pub fn update(&mut self, dt: f32) {
        for &index in &self.phases[Phase::Update.slot()] {
            let system = &mut self.systems[index];
            tracing::trace!(system = system.name(), dt, "update");
            if let Some(system) = system.as_update() {
                system.update(&mut self.world, dt);
            }
        }
    }

    /// Run every Destroy system once, then forget all registered systems.
    pub fn destroy(&mut self) {
        tracing::debug!(
            systems = self.phase_len(Phase::Destroy),
            "running destroy phase"
        );
        for &index in &self.phases[Phase::Destroy.slot()] {
            let system = &mut self.systems[index];
            tracing::trace!(system = system.name(), "destroy");
            if let Some(system) = system.as_destroy() {
                system.destroy(&mut self.world);
            }
        }
        for list in &mut self.phases {
            list.clear();
        }
        self.systems.clear();
    }

    // -- world --------------------------------------------------------------

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Bind a different world and return the previous one.
    ///
    /// With `reinit`, the Init phase runs against the new world immediately.
    pub fn set_world(&mut self, world: World, reinit: bool) -> World {
        let previous = std::mem::replace(&mut self.world, world);
        if reinit {
            self.init();
        }
        previous
    }

    /// Drop the systems and hand back the world.
    pub fn into_world(self) -> World {
        self.world
    }

    // -- introspection ------------------------------------------------------

    /// Number of systems registered for `phase`.
    pub fn phase_len(&self, phase: Phase) -> usize {
        self.phases[phase.slot()].len()
    }

    /// Names of the systems registered for `phase`, in dispatch order.
    pub fn system_names(&self, phase: Phase) -> Vec<&str> {
        self.phases[phase.slot()]
            .iter()
            .map(|&index| self.systems[index].name())
            .collect()
    }

    /// Total number of registered systems, each counted once.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }
}

impl fmt::Debug for SystemScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemScheduler")
            .field("world", &self.world)
            .field("init", &self.system_names(Phase::Init))
            .field("update", &self.system_names(Phase::Update))
            .field("destroy", &self.system_names(Phase::Destroy))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
