//! Accessing the engine from entities.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::component::Id;
use crate::message::MessageData;
use crate::state::EngineState;

/// A facade for accessing the engine state and producing messages from simulation entities.
pub struct EntityContext {
    id: Id,
    name: String,
    state: Rc<RefCell<EngineState>>,
}

impl EntityContext {
    pub(crate) fn new(id: Id, name: &str, state: Rc<RefCell<EngineState>>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            state,
        }
    }

    /// Returns the identifier of the entity associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of the entity associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.state.borrow_mut().sample_from_distribution(dist)
    }

    /// Queues a message on the specified output port.
    ///
    /// The message is appended to the entity's ordered outbound buffer and routed by the engine
    /// along the declared wiring at the end of the current activation. All messages queued during
    /// one activation are delivered atomically and observed as having arrived at the producer's
    /// clock.
    pub fn send<T>(&mut self, port: &'static str, data: T)
    where
        T: MessageData,
    {
        self.state.borrow_mut().push_message(self.id, port, data);
    }

    /// Lookup entity name by its identifier.
    pub fn lookup_name(&self, id: Id) -> String {
        self.state.borrow().lookup_name(id)
    }
}
