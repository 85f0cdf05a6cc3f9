//! Lifecycle test: systems registered across phases, driven by the tick loop
//! over a world with churning entities.

use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tessera_engine::prelude::*;

// -- Component types --------------------------------------------------------

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
struct Lifetime(u32);

#[derive(Debug, Clone, PartialEq)]
struct Dead;

type Trace = Rc<RefCell<Vec<String>>>;

// -- Systems ----------------------------------------------------------------

/// Init + Update: spawns the population, then moves it every tick.
struct Spawner {
    count: usize,
    trace: Trace,
}

impl InitSystem for Spawner {
    fn init(&mut self, world: &mut World) {
        self.trace.borrow_mut().push("spawner.init".to_owned());
        let positions = world.pool::<Position>();
        let velocities = world.pool::<Velocity>();
        let lifetimes = world.pool::<Lifetime>();
        for i in 0..self.count {
            let e = world.create_entity();
            positions.add(e, Position { x: i as f32, y: 0.0 }).unwrap();
            velocities.add(e, Velocity { dx: 1.0, dy: 1.0 }).unwrap();
            lifetimes.add(e, Lifetime(1 + (i % 5) as u32)).unwrap();
        }
    }
}

impl UpdateSystem for Spawner {
    fn update(&mut self, world: &mut World, dt: f32) {
        self.trace.borrow_mut().push("spawner.update".to_owned());
        let filter = world.filter::<(Position, Velocity)>().exclude::<(Dead,)>().build();
        for (_, (mut pos, vel)) in filter.iter_mut() {
            pos.x += vel.dx * dt;
            pos.y += vel.dy * dt;
        }
    }
}

impl System for Spawner {
    fn name(&self) -> &str {
        "spawner"
    }

    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        Some(self)
    }

    fn as_update(&mut self) -> Option<&mut dyn UpdateSystem> {
        Some(self)
    }
}

/// Update only: counts lifetimes down and marks expired entities Dead.
struct Aging {
    trace: Trace,
}

impl UpdateSystem for Aging {
    fn update(&mut self, world: &mut World, _dt: f32) {
        self.trace.borrow_mut().push("aging.update".to_owned());
        let filter = world.filter::<(Lifetime,)>().exclude::<(Dead,)>().build();
        let mut expired = Vec::new();
        for (e, (mut life,)) in filter.iter_mut() {
            life.0 -= 1;
            if life.0 == 0 {
                expired.push(e);
            }
        }
        // Structural changes only after iteration.
        for e in expired {
            world.add_component(e, Dead).unwrap();
        }
    }
}

impl System for Aging {
    fn name(&self) -> &str {
        "aging"
    }

    fn as_update(&mut self) -> Option<&mut dyn UpdateSystem> {
        Some(self)
    }
}

/// Init + Destroy: records the population at both ends.
struct Census {
    trace: Trace,
}

impl InitSystem for Census {
    fn init(&mut self, world: &mut World) {
        self.trace
            .borrow_mut()
            .push(format!("census.init:{}", world.entity_count()));
    }
}

impl DestroySystem for Census {
    fn destroy(&mut self, world: &mut World) {
        self.trace
            .borrow_mut()
            .push(format!("census.destroy:{}", world.entity_count()));
    }
}

impl System for Census {
    fn name(&self) -> &str {
        "census"
    }

    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        Some(self)
    }

    fn as_destroy(&mut self) -> Option<&mut dyn DestroySystem> {
        Some(self)
    }
}

fn reap(world: &mut World) {
    let dead: Vec<EntityId> = world.filter::<(Dead,)>().build().ids().collect();
    for e in dead {
        world.destroy_entity(e);
    }
}

// -- Tests ------------------------------------------------------------------

#[test]
fn phases_dispatch_in_registration_order() {
    let trace = Trace::default();
    let mut tick_loop = TickLoop::new(World::new(), TickConfig::default());
    tick_loop
        .add(Spawner {
            count: 10,
            trace: Rc::clone(&trace),
        })
        .unwrap()
        .add(Aging {
            trace: Rc::clone(&trace),
        })
        .unwrap()
        .add(Census {
            trace: Rc::clone(&trace),
        })
        .unwrap();

    let scheduler = tick_loop.scheduler();
    assert_eq!(scheduler.system_names(Phase::Init), ["spawner", "census"]);
    assert_eq!(scheduler.system_names(Phase::Update), ["spawner", "aging"]);
    assert_eq!(scheduler.system_names(Phase::Destroy), ["census"]);

    tick_loop.tick();
    assert_eq!(
        *trace.borrow(),
        [
            "spawner.init",
            "census.init:10",
            "spawner.update",
            "aging.update"
        ]
    );

    trace.borrow_mut().clear();
    let world = tick_loop.shutdown();
    assert_eq!(*trace.borrow(), ["census.destroy:10"]);
    assert_eq!(world.entity_count(), 10);
}

#[test]
fn expired_entities_are_reaped_and_ids_recycled() {
    let trace = Trace::default();
    let config = TickConfig {
        fixed_dt: 0.5,
        ..Default::default()
    };
    let mut tick_loop = TickLoop::new(World::new(), config);
    tick_loop
        .add(Spawner {
            count: 20,
            trace: Rc::clone(&trace),
        })
        .unwrap()
        .add(Aging {
            trace: Rc::clone(&trace),
        })
        .unwrap();
    tick_loop.add_system("reaper", |world, _dt| reap(world));

    // Lifetimes are 1..=5, four entities each, so one group expires per tick.
    for tick in 1..=5usize {
        tick_loop.tick();
        assert_eq!(tick_loop.world().entity_count(), 20 - 4 * tick);
    }

    // All ids are free again and come back lowest first.
    let world = tick_loop.world_mut();
    let reborn: Vec<usize> = (0..3).map(|_| world.create_entity().index()).collect();
    assert_eq!(reborn, [0, 1, 2]);
    for e in reborn {
        assert!(!world.has_component::<Position>(EntityId::new(e)));
        assert!(!world.has_component::<Dead>(EntityId::new(e)));
    }
}

#[test]
fn survivors_move_by_fixed_dt() {
    let trace = Trace::default();
    let config = TickConfig {
        fixed_dt: 0.5,
        ..Default::default()
    };
    let mut tick_loop = TickLoop::new(World::new(), config);
    tick_loop
        .add(Spawner {
            count: 5,
            trace: Rc::clone(&trace),
        })
        .unwrap()
        .add(Aging {
            trace: Rc::clone(&trace),
        })
        .unwrap();

    // Spawner runs before Aging, so an entity still moves on the tick its
    // lifetime runs out, and stops after that.
    tick_loop.run_ticks(3);
    let mut world = tick_loop.shutdown();
    let positions = world.pool::<Position>();
    let expected_steps: [f32; 5] = [1.0, 2.0, 3.0, 3.0, 3.0];
    for (i, &steps) in expected_steps.iter().enumerate() {
        let pos = positions.get(EntityId::new(i));
        assert_eq!(pos.x, i as f32 + steps * 0.5, "entity {i}");
        assert_eq!(pos.y, steps * 0.5, "entity {i}");
    }
}

#[test]
fn randomized_churn_keeps_pools_consistent() {
    let mut rng = Pcg64::seed_from_u64(0x7e55_e2a);
    let mut tick_loop = TickLoop::new(World::new(), TickConfig::default());
    tick_loop.add_system("movement", |world, dt| {
        let filter = world.filter::<(Position, Velocity)>().build();
        for (_, (mut pos, vel)) in filter.iter_mut() {
            pos.x += vel.dx * dt;
        }
    });

    for _ in 0..200 {
        {
            let world = tick_loop.world_mut();
            let positions = world.pool::<Position>();
            let velocities = world.pool::<Velocity>();
            match rng.gen_range(0..3) {
                0 | 1 => {
                    let e = world.create_entity();
                    positions.add(e, Position { x: 0.0, y: 0.0 }).unwrap();
                    if rng.gen_bool(0.5) {
                        velocities.add(e, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
                    }
                }
                _ => {
                    let live: Vec<usize> = world.entities().iter().collect();
                    if !live.is_empty() {
                        let victim = live[rng.gen_range(0..live.len())];
                        assert!(world.destroy_entity(EntityId::new(victim)));
                    }
                }
            }
        }
        tick_loop.tick();

        // Every component belongs to a live entity.
        let world = tick_loop.world_mut();
        let live = world.entities().clone();
        for id in world.pool::<Position>().entities().iter() {
            assert!(live.contains(id));
        }
        for id in world.pool::<Velocity>().entities().iter() {
            assert!(live.contains(id));
        }
        assert_eq!(world.pool::<Position>().len(), world.entity_count());
    }
}

/// Attaches a full kinematic set, propagating pool errors.
fn spawn_mover(world: &mut World, entity: EntityId) -> anyhow::Result<EntityId> {
    let positions = world.pool::<Position>();
    let velocities = world.pool::<Velocity>();
    positions.add(entity, Position { x: 0.0, y: 0.0 })?;
    velocities.add(entity, Velocity { dx: 1.0, dy: 0.0 })?;
    Ok(entity)
}

#[test]
fn pool_errors_propagate_with_question_mark() {
    let mut world = World::new();
    let e = world.create_entity();
    assert_eq!(spawn_mover(&mut world, e).unwrap(), e);

    // Second attach hits the duplicate check.
    let dup = spawn_mover(&mut world, e).unwrap_err();
    assert!(matches!(
        dup.downcast_ref::<EcsError>(),
        Some(EcsError::DuplicateComponent { .. })
    ));

    // A destroyed entity is rejected before anything is attached.
    world.destroy_entity(e);
    let dead = spawn_mover(&mut world, e).unwrap_err();
    assert_eq!(
        dead.downcast_ref::<EcsError>(),
        Some(&EcsError::EntityNotFound { entity: e })
    );
    assert!(!world.has_component::<Position>(e));
}

#[test]
fn registering_a_phaseless_system_fails() {
    struct Inert;
    impl System for Inert {}

    let mut scheduler = SystemScheduler::new(World::new());
    let err = scheduler.add(Inert).map(drop).unwrap_err();
    assert!(matches!(err, EngineError::NoPhases { ref system } if system.ends_with("Inert")));
    for phase in Phase::ALL {
        assert_eq!(scheduler.phase_len(phase), 0);
    }
}

// -- Property: dispatch order per phase -------------------------------------

/// A system whose phases are chosen at construction.
struct Flagged {
    name: String,
    phases: [bool; 3],
    trace: Trace,
}

impl Flagged {
    fn record(&self, phase: &str) {
        self.trace.borrow_mut().push(format!("{}.{phase}", self.name));
    }
}

impl InitSystem for Flagged {
    fn init(&mut self, _world: &mut World) {
        self.record("init");
    }
}

impl UpdateSystem for Flagged {
    fn update(&mut self, _world: &mut World, _dt: f32) {
        self.record("update");
    }
}

impl DestroySystem for Flagged {
    fn destroy(&mut self, _world: &mut World) {
        self.record("destroy");
    }
}

impl System for Flagged {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        self.phases[0].then_some(self as &mut dyn InitSystem)
    }

    fn as_update(&mut self) -> Option<&mut dyn UpdateSystem> {
        self.phases[1].then_some(self as &mut dyn UpdateSystem)
    }

    fn as_destroy(&mut self) -> Option<&mut dyn DestroySystem> {
        self.phases[2].then_some(self as &mut dyn DestroySystem)
    }
}

proptest::proptest! {
    #[test]
    fn each_phase_runs_its_systems_in_registration_order(
        flags in proptest::collection::vec(proptest::array::uniform3(proptest::bool::ANY), 0..12),
    ) {
        let trace = Trace::default();
        let mut scheduler = SystemScheduler::new(World::new());
        let mut expected: [Vec<String>; 3] = Default::default();

        for (i, phases) in flags.iter().enumerate() {
            let name = format!("s{i}");
            let result = scheduler.add(Flagged {
                name: name.clone(),
                phases: *phases,
                trace: Rc::clone(&trace),
            });
            proptest::prop_assert_eq!(result.is_ok(), phases.iter().any(|&p| p));
            for (slot, label) in ["init", "update", "destroy"].iter().enumerate() {
                if phases[slot] {
                    expected[slot].push(format!("{name}.{label}"));
                }
            }
        }

        scheduler.init();
        let init: Vec<String> = trace.borrow_mut().drain(..).collect();
        proptest::prop_assert_eq!(&init, &expected[0]);

        scheduler.update(1.0 / 60.0);
        let update: Vec<String> = trace.borrow_mut().drain(..).collect();
        proptest::prop_assert_eq!(&update, &expected[1]);

        scheduler.destroy();
        let destroy: Vec<String> = trace.borrow_mut().drain(..).collect();
        proptest::prop_assert_eq!(&destroy, &expected[2]);
        for phase in Phase::ALL {
            proptest::prop_assert_eq!(scheduler.phase_len(phase), 0);
        }
    }
}
