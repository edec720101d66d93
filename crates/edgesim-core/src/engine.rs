//! Engine configuration and execution.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use log::debug;
use serde_json::json;

use crate::component::Id;
use crate::context::EntityContext;
use crate::entity::TimedEntity;
use crate::log::log_unrouted_message;
use crate::message::Message;
use crate::routing::{MissingRoutePolicy, Route, RouterFn};
use crate::state::{EngineState, EPSILON};

/// Represents a simulation, provides methods for its configuration and execution.
///
/// The engine owns the registered entities, their clocks and next activations, and the static
/// wiring table. Execution is strictly timestamp-ordered; entities scheduled for the exact same
/// timestamp are processed in ascending identifier order, which makes runs deterministic for a
/// fixed seed and wiring.
pub struct Engine {
    state: Rc<RefCell<EngineState>>,
    entities: Vec<Option<Rc<RefCell<dyn TimedEntity>>>>,
    clocks: Vec<f64>,
    next_activations: Vec<f64>,
    routes: HashMap<(Id, &'static str), Route>,
    inbox: BTreeMap<Id, Vec<Message>>,
    inbox_time: f64,
}

impl Engine {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(EngineState::new(seed))),
            entities: Vec::new(),
            clocks: Vec::new(),
            next_activations: Vec::new(),
            routes: HashMap::new(),
            inbox: BTreeMap::new(),
            inbox_time: f64::INFINITY,
        }
    }

    fn register(&mut self, name: &str) -> Id {
        let id = self.state.borrow_mut().register(name);
        while self.entities.len() <= id as usize {
            self.entities.push(None);
            self.clocks.push(0.0);
            self.next_activations.push(f64::INFINITY);
        }
        id
    }

    /// Returns the identifier of entity by its name.
    ///
    /// Panics if an entity with such name does not exist.
    pub fn lookup_id(&self, name: &str) -> Id {
        self.state.borrow().lookup_id(name)
    }

    /// Returns the name of entity by its identifier.
    pub fn lookup_name(&self, id: Id) -> String {
        self.state.borrow().lookup_name(id)
    }

    /// Creates a new entity context with specified name.
    pub fn create_context<S>(&mut self, name: S) -> EntityContext
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        EntityContext::new(id, name.as_ref(), self.state.clone())
    }

    /// Registers the timed entity implementation under the specified name, returns its Id.
    ///
    /// The entity starts passive (next activation at infinity) with its clock set to the
    /// current simulation time; use [`schedule_activation`](Self::schedule_activation) to give
    /// it an initial wake-up.
    pub fn add_entity<S>(&mut self, name: S, entity: Rc<RefCell<dyn TimedEntity>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.entities[id as usize] = Some(entity);
        self.clocks[id as usize] = self.time();
        debug!(
            target: "engine",
            "[{:.3} {} engine] Added entity: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
        id
    }

    /// Sets the next activation of an entity to `time` if that is earlier than its current one.
    ///
    /// Panics if `time` lies in the past.
    pub fn schedule_activation(&mut self, id: Id, time: f64) {
        assert!(
            time >= self.time() - EPSILON,
            "Cannot schedule activation of `{}` at {} which is before current time {}",
            self.lookup_name(id),
            time,
            self.time()
        );
        let na = &mut self.next_activations[id as usize];
        if time < *na {
            *na = time;
        }
    }

    /// Declares a plain coupling: messages emitted by `src` on `port` are delivered to `dst`.
    ///
    /// Repeated calls with the same (src, port) append further destinations (fan-out); each
    /// destination observes its own copy of the message.
    pub fn connect(&mut self, src: Id, port: &'static str, dst: Id) {
        match self.routes.entry((src, port)) {
            std::collections::hash_map::Entry::Occupied(mut e) => match e.get_mut() {
                Route::Direct(dsts) => dsts.push(dst),
                Route::Keyed { .. } => panic!(
                    "Port `{}` of `{}` is already wired through a keyed route",
                    port,
                    self.state.borrow().lookup_name(src)
                ),
            },
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(Route::Direct(vec![dst]));
            }
        }
    }

    /// Declares a multiplexer route: one inbound stream demultiplexed into many destinations
    /// keyed by a routing function over message content.
    ///
    /// `policy` selects whether a message whose key has no route aborts the simulation or is
    /// logged and discarded.
    pub fn connect_keyed(&mut self, src: Id, port: &'static str, router: RouterFn, policy: MissingRoutePolicy) {
        let prev = self.routes.insert((src, port), Route::Keyed { router, policy });
        assert!(
            prev.is_none(),
            "Port `{}` of `{}` is wired twice",
            port,
            self.state.borrow().lookup_name(src)
        );
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.state.borrow().time()
    }

    /// Returns the total number of produced messages.
    pub fn message_count(&self) -> u64 {
        self.state.borrow().message_count()
    }

    /// Returns the time of the next scheduled activation or pending delivery, if any.
    ///
    /// Messages queued from outside the step loop (e.g. by a test driver) are due at the
    /// current time and keep the simulation runnable.
    pub fn next_time(&self) -> Option<f64> {
        let mut t = self.inbox_time;
        if self.state.borrow().has_pending_outbox() {
            t = t.min(self.state.borrow().time());
        }
        for &na in &self.next_activations {
            if na < t {
                t = na;
            }
        }
        if t.is_finite() {
            Some(t)
        } else {
            None
        }
    }

    /// Performs a single cycle through the simulation.
    ///
    /// Advances the time to the earliest of pending deliveries and scheduled activations, then:
    /// 1. invokes [`TimedEntity::on_output`] of every imminent entity (ascending Id order) and
    ///    routes the queued messages along the wiring table;
    /// 2. runs the transitions: internal for imminent entities without input, external for
    ///    entities with input only, and the confluent combination (external with the real
    ///    elapsed time, then internal at the same instant) when both coincide;
    /// 3. routes messages queued during the transitions, to be delivered in the next cycle at
    ///    the same timestamp.
    ///
    /// Message delivery is atomic: a batch produced by one activation is observed in full by
    /// each consumer. Returns `true` if some progress was made and `false` when no activity
    /// is pending (the simulation is exhausted).
    pub fn step(&mut self) -> bool {
        let t = match self.next_time() {
            Some(t) => t,
            None => return false,
        };
        self.state.borrow_mut().set_time(t);

        let imminent: Vec<Id> = (0..self.next_activations.len() as Id)
            .filter(|&id| self.next_activations[id as usize] <= t + EPSILON)
            .collect();

        let mut deliveries: BTreeMap<Id, Vec<Message>> = if self.inbox_time <= t + EPSILON {
            self.inbox_time = f64::INFINITY;
            std::mem::take(&mut self.inbox)
        } else {
            BTreeMap::new()
        };
        // Messages queued outside the step loop are routed now.
        self.route_outbox(t, &mut deliveries);

        // Output phase: imminent entities flush their buffers before transitioning.
        for &id in &imminent {
            if let Some(entity) = self.entities[id as usize].clone() {
                entity.borrow_mut().on_output(t);
            }
        }
        self.route_outbox(t, &mut deliveries);

        // Transition phase, in ascending Id order.
        let mut targets: Vec<Id> = imminent.clone();
        for &id in deliveries.keys() {
            if !targets.contains(&id) {
                targets.push(id);
            }
        }
        targets.sort_unstable();

        for id in targets {
            let entity = match self.entities[id as usize].clone() {
                Some(e) => e,
                None => {
                    if deliveries.contains_key(&id) {
                        log_unrouted_delivery(&self.state, t, id);
                    }
                    continue;
                }
            };
            let is_imminent = self.next_activations[id as usize] <= t + EPSILON;
            let messages = deliveries.remove(&id);
            let elapsed = t - self.clocks[id as usize];
            let na = match (is_imminent, messages) {
                (true, None) => entity.borrow_mut().on_internal(t),
                (false, Some(msgs)) => entity.borrow_mut().on_external(t, elapsed, msgs),
                (true, Some(msgs)) => {
                    // Confluent: output already flushed above, external sees the real elapsed
                    // time, then the internal transition is folded in at the same instant.
                    let mut e = entity.borrow_mut();
                    e.on_external(t, elapsed, msgs);
                    e.on_internal(t)
                }
                (false, None) => unreachable!(),
            };
            assert!(
                na >= t - EPSILON,
                "Entity `{}` returned next activation {} which is before current time {}",
                self.lookup_name(id),
                na,
                t
            );
            self.clocks[id as usize] = t;
            self.next_activations[id as usize] = na.max(t);
        }

        // Messages queued during transitions are delivered in the next cycle, same timestamp.
        let mut produced = BTreeMap::new();
        self.route_outbox(t, &mut produced);
        if !produced.is_empty() {
            self.inbox = produced;
            self.inbox_time = t;
        }
        true
    }

    /// Performs the specified number of cycles through the simulation.
    ///
    /// Returns `true` if there could be more pending activity and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until no pending activity is left.
    pub fn step_until_idle(&mut self) {
        while self.step() {}
    }

    /// Steps through the simulation with duration limit.
    ///
    /// Returns `true` if there could be more pending activity and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.time() + duration;
        loop {
            match self.next_time() {
                Some(t) if t <= end_time => {
                    self.step();
                }
                Some(_) => return true,
                None => return false,
            }
        }
    }

    fn route_outbox(&mut self, time: f64, deliveries: &mut BTreeMap<Id, Vec<Message>>) {
        let outbox = self.state.borrow_mut().drain_outbox();
        for msg in outbox {
            match self.routes.get(&(msg.src, msg.port)) {
                Some(Route::Direct(dsts)) => {
                    for &dst in dsts {
                        deliveries.entry(dst).or_default().push(Message {
                            src: msg.src,
                            port: msg.port,
                            data: dyn_clone::clone_box(&*msg.data),
                        });
                    }
                }
                Some(Route::Keyed { router, policy }) => match router(&*msg.data) {
                    Some(dst) => {
                        deliveries.entry(dst).or_default().push(Message {
                            src: msg.src,
                            port: msg.port,
                            data: msg.data,
                        });
                    }
                    None => match policy {
                        MissingRoutePolicy::Panic => panic!(
                            "No route for message on port `{}` of `{}`",
                            msg.port,
                            self.state.borrow().lookup_name(msg.src)
                        ),
                        MissingRoutePolicy::Drop => {
                            let src_name = self.state.borrow().lookup_name(msg.src);
                            log_unrouted_message(time, &src_name, msg.port, &msg.data);
                        }
                    },
                },
                None => {
                    let src_name = self.state.borrow().lookup_name(msg.src);
                    log_unrouted_message(time, &src_name, msg.port, &msg.data);
                }
            }
        }
    }
}

fn log_unrouted_delivery(state: &Rc<RefCell<EngineState>>, time: f64, id: Id) {
    log::error!(
        target: "engine",
        "[{:.3} {} engine] Messages delivered to `{}` which has no registered entity",
        time,
        crate::log::get_colored("ERROR", colored::Color::Red),
        state.borrow().lookup_name(id)
    );
}
