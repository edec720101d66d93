use std::collections::HashMap;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::component::Id;
use crate::message::MessageData;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

/// Message queued by an entity and not yet routed by the engine.
pub(crate) struct OutboundMessage {
    pub src: Id,
    pub port: &'static str,
    pub data: Box<dyn MessageData>,
}

pub(crate) struct EngineState {
    clock: f64,
    rand: Pcg64,
    outbox: Vec<OutboundMessage>,
    message_count: u64,

    entity_name_to_id: HashMap<String, Id>,
    entity_names: Vec<String>,
}

impl EngineState {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            outbox: Vec::new(),
            message_count: 0,
            entity_name_to_id: HashMap::new(),
            entity_names: Vec::new(),
        }
    }

    pub fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.entity_name_to_id.get(name) {
            return id;
        }
        let id = self.entity_name_to_id.len() as Id;
        self.entity_name_to_id.insert(name.to_owned(), id);
        self.entity_names.push(name.to_owned());
        id
    }

    pub fn lookup_id(&self, name: &str) -> Id {
        *self.entity_name_to_id.get(name).unwrap()
    }

    pub fn lookup_name(&self, id: Id) -> String {
        self.entity_names[id as usize].clone()
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn set_time(&mut self, time: f64) {
        assert!(
            time >= self.clock - EPSILON,
            "Time regression: cannot advance simulation from {} back to {}",
            self.clock,
            time
        );
        self.clock = time;
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    pub fn push_message<T>(&mut self, src: Id, port: &'static str, data: T)
    where
        T: MessageData,
    {
        self.outbox.push(OutboundMessage {
            src,
            port,
            data: Box::new(data),
        });
        self.message_count += 1;
    }

    pub fn drain_outbox(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn has_pending_outbox(&self) -> bool {
        !self.outbox.is_empty()
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }
}
