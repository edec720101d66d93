//! Messages exchanged between timed entities.

use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::{clone_trait_object, DynClone};
use serde::ser::Serialize;

use crate::component::Id;

/// Trait for message payloads.
///
/// Any clonable serializable type can be used as a payload. Serialization is needed only for
/// trace logging, the payload itself never leaves the process.
pub trait MessageData: Downcast + DynClone + erased_serde::Serialize {}

impl_downcast!(MessageData);

clone_trait_object!(MessageData);

erased_serde::serialize_trait_object!(MessageData);

impl<T: Serialize + Clone + 'static> MessageData for T {}

/// A message delivered to an entity input.
///
/// Carries the producer identifier, the name of the output port it left through and the payload.
/// All messages of one batch share the producer's clock as their logical arrival time.
pub struct Message {
    /// Identifier of the producing entity.
    pub src: Id,
    /// Output port the message was emitted through.
    pub port: &'static str,
    /// Opaque payload, downcast on the receiving side.
    pub data: Box<dyn MessageData>,
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Self {
            src: self.src,
            port: self.port,
            data: dyn_clone::clone_box(&*self.data),
        }
    }
}
