//! Fixed-timestep tick loop.
//!
//! The [`TickLoop`] drives a [`SystemScheduler`] through a world's life:
//!
//! 1. [`start`](TickLoop::start) runs the Init phase once.
//! 2. Each [`tick`](TickLoop::tick) runs the Update phase with the fixed time
//!    step and advances the tick counter.
//! 3. [`shutdown`](TickLoop::shutdown) runs the Destroy phase and hands the
//!    world back.
//!
//! Simulation time is computed as `tick_count * fixed_dt` rather than
//! accumulated, so it does not drift.
//!
//! # Example
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let config = TickConfig { fixed_dt: 1.0 / 60.0, ..Default::default() };
//! let mut tick_loop = TickLoop::new(World::new(), config);
//!
//! tick_loop.add_system("spawner", |world, _dt| {
//!     world.create_entity();
//! });
//!
//! tick_loop.run_ticks(10);
//! assert_eq!(tick_loop.tick_count(), 10);
//!
//! let world = tick_loop.shutdown();
//! assert_eq!(world.entity_count(), 10);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tessera_ecs::world::World;

use crate::scheduler::SystemScheduler;
use crate::system::{Phase, System};
use crate::EngineError;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep tick loop.
///
/// Missing fields take their defaults when deserialized:
///
/// ```
/// use tessera_engine::tick::TickConfig;
///
/// let config = TickConfig::from_json(r#"{ "fixed_dt": 0.02 }"#).unwrap();
/// assert_eq!(config.fixed_dt, 0.02);
/// assert_eq!(config.log_filter, "warn");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f32,
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for TickConfig {
    /// 60 Hz, warnings only.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            log_filter: "warn".to_owned(),
        }
    }
}

impl TickConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] if the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Number of update systems that ran.
    pub systems_run: usize,
    /// Wall-clock time for the whole Update phase.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// Fixed-timestep driver around a [`SystemScheduler`].
#[derive(Debug)]
pub struct TickLoop {
    scheduler: SystemScheduler,
    fixed_dt: f32,
    tick_counter: u64,
    started: bool,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// Create a tick loop over `world`. No phase runs until the first
    /// [`start`](Self::start) or [`tick`](Self::tick).
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(world: World, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            scheduler: SystemScheduler::new(world),
            fixed_dt: config.fixed_dt,
            tick_counter: 0,
            started: false,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Register a system with the underlying scheduler.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoPhases`] if the system implements no phase.
    pub fn add<S: System>(&mut self, system: S) -> Result<&mut Self, EngineError> {
        self.scheduler.add(system)?;
        Ok(self)
    }

    /// Register a closure to run every tick.
    pub fn add_system<F>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: FnMut(&mut World, f32) + 'static,
    {
        self.scheduler.add_update_fn(name, func);
        self
    }

    /// Run the Init phase. Only the first call has any effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.scheduler.init();
    }

    /// Execute one tick, starting the loop first if needed.
    pub fn tick(&mut self) {
        self.start();
        let tick_start = Instant::now();
        self.scheduler.update(self.fixed_dt);
        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            systems_run: self.scheduler.phase_len(Phase::Update),
            total_time: tick_start.elapsed(),
        };
    }

    /// Run `count` ticks in sequence.
    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
        tracing::debug!(
            ticks = count,
            total = self.tick_counter,
            "ran ticks"
        );
    }

    /// Run the Destroy phase and return the world.
    pub fn shutdown(mut self) -> World {
        tracing::debug!(ticks = self.tick_counter, "shutting down tick loop");
        self.scheduler.destroy();
        self.scheduler.into_world()
    }

    // -- accessors ----------------------------------------------------------

    /// The number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// The current simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * f64::from(self.fixed_dt)
    }

    /// The fixed time step in seconds per tick.
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Whether the Init phase has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn world(&self) -> &World {
        self.scheduler.world()
    }

    /// Mutable access to the world, for setup between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        self.scheduler.world_mut()
    }

    pub fn scheduler(&self) -> &SystemScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SystemScheduler {
        &mut self.scheduler
    }

    /// Diagnostics from the last tick.
    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::system::InitSystem;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
    }

    // -- construction -------------------------------------------------------

    #[test]
    fn new_tick_loop_starts_at_zero() {
        let tick_loop = TickLoop::new(World::new(), TickConfig::default());
        assert_eq!(tick_loop.tick_count(), 0);
        assert_eq!(tick_loop.sim_time(), 0.0);
        assert!(!tick_loop.is_started());
    }

    #[test]
    fn default_config_is_60hz() {
        let config = TickConfig::default();
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < f32::EPSILON);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn zero_dt_panics() {
        let _ = TickLoop::new(
            World::new(),
            TickConfig {
                fixed_dt: 0.0,
                ..Default::default()
            },
        );
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn nan_dt_panics() {
        let _ = TickLoop::new(
            World::new(),
            TickConfig {
                fixed_dt: f32::NAN,
                ..Default::default()
            },
        );
    }

    // -- configuration ------------------------------------------------------

    #[test]
    fn config_from_json() {
        let config = TickConfig::from_json(r#"{"fixed_dt": 0.5, "log_filter": "debug"}"#).unwrap();
        assert_eq!(
            config,
            TickConfig {
                fixed_dt: 0.5,
                log_filter: "debug".to_owned()
            }
        );

        let empty = TickConfig::from_json("{}").unwrap();
        assert_eq!(empty, TickConfig::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let err = TickConfig::from_json(r#"{"fixed_dt": "fast"}"#).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.to_string().starts_with("invalid tick configuration"));
    }

    // -- ticking ------------------------------------------------------------

    #[test]
    fn init_runs_once_before_first_tick() {
        struct Spawn(Rc<Cell<u32>>);

        impl InitSystem for Spawn {
            fn init(&mut self, world: &mut World) {
                self.0.set(self.0.get() + 1);
                world.create_entity();
            }
        }

        impl System for Spawn {
            fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
                Some(self)
            }
        }

        let calls = Rc::new(Cell::new(0));
        let mut tick_loop = TickLoop::new(World::new(), TickConfig::default());
        tick_loop.add(Spawn(Rc::clone(&calls))).unwrap();

        tick_loop.run_ticks(5);
        tick_loop.start();
        assert_eq!(calls.get(), 1);
        assert_eq!(tick_loop.world().entity_count(), 1);
    }

    #[test]
    fn sim_time_is_ticks_times_dt() {
        let config = TickConfig {
            fixed_dt: 0.25,
            ..Default::default()
        };
        let mut tick_loop = TickLoop::new(World::new(), config);
        tick_loop.run_ticks(8);
        assert_eq!(tick_loop.tick_count(), 8);
        assert_eq!(tick_loop.sim_time(), 2.0);
    }

    #[test]
    fn movement_integrates_fixed_dt() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 0.0 }).unwrap();
        world.add_component(e, Velocity { dx: 2.0 }).unwrap();

        let config = TickConfig {
            fixed_dt: 0.5,
            ..Default::default()
        };
        let mut tick_loop = TickLoop::new(world, config);
        tick_loop.add_system("movement", |world, dt| {
            let filter = world.filter::<(Position, Velocity)>().build();
            for (_, (mut pos, vel)) in filter.iter_mut() {
                pos.x += vel.dx * dt;
            }
        });

        tick_loop.run_ticks(4);
        let mut world = tick_loop.shutdown();
        assert_eq!(*world.pool::<Position>().get(e), Position { x: 4.0 });
    }

    #[test]
    fn diagnostics_count_update_systems() {
        let mut tick_loop = TickLoop::new(World::new(), TickConfig::default());
        tick_loop
            .add_system("a", |_, _| {})
            .add_system("b", |_, _| {});
        tick_loop.tick();
        assert_eq!(tick_loop.last_diagnostics().systems_run, 2);
        assert_eq!(
            tick_loop.scheduler().system_names(Phase::Update),
            ["a", "b"]
        );
    }
}
