//! Static wiring between entity ports.

use crate::component::Id;
use crate::message::MessageData;

/// What to do when a keyed route yields no destination for a message.
#[derive(Clone, Copy, PartialEq)]
pub enum MissingRoutePolicy {
    /// Abort the simulation, treating the missing route as a wiring bug.
    Panic,
    /// Log the message under `ERROR` level and discard it.
    Drop,
}

/// Routing function of a keyed (demultiplexing) route.
///
/// Inspects the message payload, typically by downcasting, and returns the destination entity.
pub type RouterFn = Box<dyn Fn(&dyn MessageData) -> Option<Id>>;

/// A single entry of the wiring table, attached to one (entity, output port) pair.
pub(crate) enum Route {
    /// Plain coupling: deliver to every listed destination, in wiring order.
    Direct(Vec<Id>),
    /// Multiplexer: one inbound stream demultiplexed into many destinations
    /// keyed by a routing function over message content.
    Keyed {
        router: RouterFn,
        policy: MissingRoutePolicy,
    },
}
