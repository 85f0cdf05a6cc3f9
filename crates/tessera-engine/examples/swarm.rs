//! Headless swarm demo -- agents drift inside a box, bounce off the walls,
//! and are replaced by newcomers when their energy runs out.
//!
//! Run with:
//!   cargo run --example swarm -p tessera-engine [-- config.json]
//!
//! The optional argument is a JSON tick configuration, for example
//! `{ "fixed_dt": 0.02, "log_filter": "tessera_engine=debug" }`.

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tessera_engine::logging;
use tessera_engine::prelude::*;

const ARENA: f32 = 100.0;
const POPULATION: usize = 256;
const TICKS: u64 = 600;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Energy(f32);

/// Tag for agents that have run out of energy this tick.
#[derive(Debug, Clone, PartialEq)]
struct Exhausted;

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

fn spawn_agent(world: &mut World, rng: &mut Pcg64) -> anyhow::Result<EntityId> {
    let e = world.create_entity();
    let positions = world.pool::<Position>();
    let velocities = world.pool::<Velocity>();
    let energies = world.pool::<Energy>();
    positions.add(
        e,
        Position {
            x: rng.gen_range(0.0..ARENA),
            y: rng.gen_range(0.0..ARENA),
        },
    )?;
    velocities.add(
        e,
        Velocity {
            dx: rng.gen_range(-20.0..20.0),
            dy: rng.gen_range(-20.0..20.0),
        },
    )?;
    energies.add(e, Energy(rng.gen_range(1.0..5.0)))?;
    Ok(e)
}

/// Init: takes a census of the seeded arena. Update: replaces exhausted
/// agents. Destroy: reports.
struct Population {
    rng: Pcg64,
    spawned: usize,
    replaced: usize,
}

impl InitSystem for Population {
    fn init(&mut self, world: &mut World) {
        self.spawned = world.entity_count();
    }
}

impl UpdateSystem for Population {
    fn update(&mut self, world: &mut World, _dt: f32) {
        let exhausted: Vec<EntityId> = world.filter::<(Exhausted,)>().build().ids().collect();
        for e in exhausted {
            world.destroy_entity(e);
            // Reuses the id just freed.
            match spawn_agent(world, &mut self.rng) {
                Ok(_) => self.replaced += 1,
                Err(err) => tracing::error!(error = %err, "failed to spawn replacement agent"),
            }
        }
    }
}

impl DestroySystem for Population {
    fn destroy(&mut self, world: &mut World) {
        tracing::info!(
            spawned = self.spawned,
            replaced = self.replaced,
            alive = world.entity_count(),
            "population summary"
        );
    }
}

impl System for Population {
    fn name(&self) -> &str {
        "population"
    }

    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        Some(self)
    }

    fn as_update(&mut self) -> Option<&mut dyn UpdateSystem> {
        Some(self)
    }

    fn as_destroy(&mut self) -> Option<&mut dyn DestroySystem> {
        Some(self)
    }
}

fn movement(world: &mut World, dt: f32) {
    let filter = world.filter::<(Position, Velocity)>().build();
    for (_, (mut pos, mut vel)) in filter.iter_mut() {
        pos.x += vel.dx * dt;
        pos.y += vel.dy * dt;
        if !(0.0..=ARENA).contains(&pos.x) {
            vel.dx = -vel.dx;
            pos.x = pos.x.clamp(0.0, ARENA);
        }
        if !(0.0..=ARENA).contains(&pos.y) {
            vel.dy = -vel.dy;
            pos.y = pos.y.clamp(0.0, ARENA);
        }
    }
}

fn metabolism(world: &mut World, dt: f32) {
    let filter = world.filter::<(Energy,)>().exclude::<(Exhausted,)>().build();
    let mut spent = Vec::new();
    for (e, (mut energy,)) in filter.iter_mut() {
        energy.0 -= dt;
        if energy.0 <= 0.0 {
            spent.push(e);
        }
    }
    for e in spent {
        if let Err(err) = world.add_component(e, Exhausted) {
            tracing::warn!(error = %err, "metabolism: failed to mark agent exhausted");
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading tick configuration from {path}"))?;
            TickConfig::from_json(&text)?
        }
        None => TickConfig::default(),
    };
    logging::init_from_config(&config);

    let mut rng = Pcg64::seed_from_u64(42);
    let mut world = World::new();
    for _ in 0..POPULATION {
        spawn_agent(&mut world, &mut rng)?;
    }

    let mut tick_loop = TickLoop::new(world, config);
    tick_loop
        .add(Population {
            rng,
            spawned: 0,
            replaced: 0,
        })?
        .add_system("movement", movement)
        .add_system("metabolism", metabolism);

    tick_loop.run_ticks(TICKS);

    // Bounding box of the swarm, via a union filter over both kinematic pools.
    let (mut min, mut max) = ((ARENA, ARENA), (0.0f32, 0.0f32));
    let moving = tick_loop
        .world_mut()
        .filter::<(Position, Velocity)>()
        .build_union();
    for (_, (pos, _vel)) in moving.iter() {
        if let Some(pos) = pos {
            min = (min.0.min(pos.x), min.1.min(pos.y));
            max = (max.0.max(pos.x), max.1.max(pos.y));
        }
    }

    println!(
        "{} ticks ({:.1}s simulated), {} agents, bounds ({:.1}, {:.1})..({:.1}, {:.1}), last tick {:?}",
        tick_loop.tick_count(),
        tick_loop.sim_time(),
        tick_loop.world().entity_count(),
        min.0,
        min.1,
        max.0,
        max.1,
        tick_loop.last_diagnostics().total_time,
    );

    let world = tick_loop.shutdown();
    anyhow::ensure!(
        world.entity_count() == POPULATION,
        "population drifted to {}",
        world.entity_count()
    );
    Ok(())
}
