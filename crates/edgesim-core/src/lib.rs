//! Discrete-event simulation substrate for timed entities.
//!
//! Every simulated component is a [`TimedEntity`]: a state machine with a clock, a scheduled
//! next activation and three callbacks (internal transition, external transition, output).
//! Entities are registered in an [`Engine`] and wired together through a static routing table;
//! the engine advances them in strict timestamp order, delivering message batches atomically.

pub mod component;
pub mod context;
pub mod engine;
pub mod entity;
pub mod log;
pub mod message;
pub mod routing;
mod state;

pub use colored;
pub use component::Id;
pub use context::EntityContext;
pub use engine::Engine;
pub use entity::TimedEntity;
pub use message::{Message, MessageData};
pub use routing::{MissingRoutePolicy, RouterFn};
pub use state::EPSILON;
