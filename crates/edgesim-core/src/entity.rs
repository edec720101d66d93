//! The timed entity abstraction.

use crate::message::Message;

/// A state-driven entity advancing in simulated time.
///
/// An entity keeps an internal state, a clock (the time of its last update) and a scheduled
/// next activation. The engine invokes the three callbacks below in strict timestamp order:
///
/// - [`on_internal`](TimedEntity::on_internal) fires when the entity's own timer expires
///   (`clock == next_activation`) and no input is pending;
/// - [`on_external`](TimedEntity::on_external) fires when messages arrive at any time not later
///   than the next activation;
/// - [`on_output`](TimedEntity::on_output) runs immediately before an imminent transition and is
///   the place to queue outgoing messages via [`EntityContext::send`](crate::EntityContext::send).
///
/// Both transition callbacks return the new next activation time, which must not lie in the past.
/// Returning [`f64::INFINITY`] makes the entity passive until the next input.
///
/// When an internal deadline and external input coincide at the same timestamp, the engine emits
/// the output first, then runs the external transition with the real elapsed time and finally
/// folds in the internal transition at the same instant (see [`Engine::step`](crate::Engine::step)).
pub trait TimedEntity {
    /// Processes the expiration of the entity's own timer, returns the new next activation.
    fn on_internal(&mut self, now: f64) -> f64;

    /// Processes a batch of arrived messages, returns the (possibly unchanged) next activation.
    ///
    /// `elapsed` is the time passed since the previous update of this entity. The batch is
    /// atomic: it contains every message produced for this entity during one engine cycle.
    fn on_external(&mut self, now: f64, elapsed: f64, messages: Vec<Message>) -> f64;

    /// Queues outgoing messages just before an imminent transition.
    ///
    /// The default implementation does nothing, which suits entities that queue messages
    /// directly inside their transitions.
    fn on_output(&mut self, _now: f64) {}
}

/// Enables pattern matching syntax for processing different types of messages
/// by downcasting the payload from [`MessageData`](crate::message::MessageData)
/// to user-defined types.
///
/// Match arms need not be exhaustive: a payload matching no arm is logged under `ERROR` level.
#[macro_export]
macro_rules! cast {
    ( match $msg:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $msg.data.is::<$type>() {
                if let Ok(__value) = $msg.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__value;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_message($msg);
        }
    }
}
