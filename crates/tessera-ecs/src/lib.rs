//! Tessera ECS -- sparse-set Entity Component System.
//!
//! Entities are plain integer ids. Each component type lives in its own pool
//! backed by a sparse set, so attaching and detaching components is O(1) and
//! never moves an entity between tables. Queries ("filters") combine the
//! presence bitsets of the pools with set algebra and then walk the result.
//!
//! # Quick Start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Debug, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut world = World::new();
//! let entity = world.create_entity();
//!
//! let positions = world.pool::<Position>();
//! positions.add(entity, Position { x: 0.0, y: 0.0 }).unwrap();
//! world.add_component(entity, Velocity { dx: 1.0, dy: 0.5 }).unwrap();
//!
//! let filter = world.filter::<(Position, Velocity)>().build();
//! for (_entity, (mut pos, vel)) in filter.iter_mut() {
//!     pos.x += vel.dx;
//!     pos.y += vel.dy;
//! }
//!
//! assert_eq!(*positions.get(entity), Position { x: 1.0, y: 0.5 });
//! ```
//!
//! Everything here is single-threaded: pools are shared through `Rc` and
//! guarded by `RefCell`, so none of these types are `Send`.

#![deny(unsafe_code)]

pub mod bitset;
pub mod entity;
pub mod filter;
pub mod pool;
pub mod sparse;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity is not live in the world that owns the pool.
    #[error("entity {entity} does not exist in the world")]
    EntityNotFound { entity: entity::EntityId },

    /// The entity already carries a component of this type.
    #[error("component '{component}' is already attached to entity {entity}")]
    DuplicateComponent {
        component: &'static str,
        entity: entity::EntityId,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bitset::EntitySet;
    pub use crate::entity::EntityId;
    pub use crate::filter::{ComponentSet, Filter, FilterBuilder, UnionFilter};
    pub use crate::pool::{AnyPool, ComponentPool, Pool, SharedPool};
    pub use crate::sparse::SparseSet;
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
