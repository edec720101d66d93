use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use sugars::{rc, refcell};

use edgesim_core::{cast, Engine, EntityContext, Message, MissingRoutePolicy, TimedEntity};

#[derive(Clone, Serialize)]
struct Ping {
    seq: u32,
}

struct Emitter {
    ctx: EntityContext,
    times: Vec<f64>,
    batch: u32,
}

impl Emitter {
    fn new(ctx: EntityContext, mut times: Vec<f64>, batch: u32) -> Self {
        times.sort_by(|a, b| a.total_cmp(b));
        times.reverse();
        Self { ctx, times, batch }
    }
}

impl TimedEntity for Emitter {
    fn on_internal(&mut self, _now: f64) -> f64 {
        self.times.pop();
        self.times.last().copied().unwrap_or(f64::INFINITY)
    }

    fn on_external(&mut self, _now: f64, _elapsed: f64, _messages: Vec<Message>) -> f64 {
        self.times.last().copied().unwrap_or(f64::INFINITY)
    }

    fn on_output(&mut self, _now: f64) {
        for seq in 0..self.batch {
            self.ctx.send("out", Ping { seq });
        }
    }
}

#[derive(Clone)]
struct Arrival {
    time: f64,
    src: u32,
    seq: u32,
    batch_size: usize,
}

struct Recorder {
    arrivals: Rc<RefCell<Vec<Arrival>>>,
}

impl TimedEntity for Recorder {
    fn on_internal(&mut self, _now: f64) -> f64 {
        f64::INFINITY
    }

    fn on_external(&mut self, now: f64, _elapsed: f64, messages: Vec<Message>) -> f64 {
        let batch_size = messages.len();
        for msg in messages {
            let src = msg.src;
            cast!(match msg.data {
                Ping { seq } => {
                    self.arrivals.borrow_mut().push(Arrival {
                        time: now,
                        src,
                        seq,
                        batch_size,
                    });
                }
            });
        }
        f64::INFINITY
    }
}

struct Forwarder {
    ctx: EntityContext,
    hops: Rc<RefCell<Vec<(f64, String)>>>,
}

impl TimedEntity for Forwarder {
    fn on_internal(&mut self, _now: f64) -> f64 {
        f64::INFINITY
    }

    fn on_external(&mut self, now: f64, _elapsed: f64, messages: Vec<Message>) -> f64 {
        self.hops.borrow_mut().push((now, self.ctx.name().to_string()));
        for _ in messages {
            self.ctx.send("out", Ping { seq: 0 });
        }
        f64::INFINITY
    }
}

struct TransitionLog {
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl TimedEntity for TransitionLog {
    fn on_internal(&mut self, _now: f64) -> f64 {
        self.log.borrow_mut().push("internal");
        f64::INFINITY
    }

    fn on_external(&mut self, _now: f64, _elapsed: f64, _messages: Vec<Message>) -> f64 {
        self.log.borrow_mut().push("external");
        f64::INFINITY
    }
}

#[test]
fn timestamp_order() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    let emitter = rc!(refcell!(Emitter::new(emitter_ctx, vec![2.5, 1.0, 4.0], 1)));
    engine.add_entity("emitter", emitter);

    let arrivals = rc!(refcell!(Vec::new()));
    let recorder = rc!(refcell!(Recorder {
        arrivals: arrivals.clone()
    }));
    let recorder_id = engine.add_entity("recorder", recorder);
    engine.connect(emitter_id, "out", recorder_id);
    engine.schedule_activation(emitter_id, 1.0);

    engine.step_until_idle();
    let times: Vec<f64> = arrivals.borrow().iter().map(|a| a.time).collect();
    assert_eq!(times, vec![1.0, 2.5, 4.0]);
    assert_eq!(engine.time(), 4.0);
}

#[test]
fn same_instant_secondary_order() {
    // Two emitters imminent at the same timestamp are processed in ascending Id order,
    // so the recorder observes first's messages before second's within one batch.
    let mut engine = Engine::new(123);
    let first_ctx = engine.create_context("first");
    let first_id = first_ctx.id();
    engine.add_entity("first", rc!(refcell!(Emitter::new(first_ctx, vec![1.0], 1))));
    let second_ctx = engine.create_context("second");
    let second_id = second_ctx.id();
    engine.add_entity("second", rc!(refcell!(Emitter::new(second_ctx, vec![1.0], 1))));

    let arrivals = rc!(refcell!(Vec::new()));
    let recorder_id = engine.add_entity(
        "recorder",
        rc!(refcell!(Recorder {
            arrivals: arrivals.clone()
        })),
    );
    engine.connect(first_id, "out", recorder_id);
    engine.connect(second_id, "out", recorder_id);
    engine.schedule_activation(first_id, 1.0);
    engine.schedule_activation(second_id, 1.0);

    engine.step_until_idle();
    let srcs: Vec<u32> = arrivals.borrow().iter().map(|a| a.src).collect();
    assert_eq!(srcs, vec![first_id, second_id]);
    assert_eq!(arrivals.borrow()[0].batch_size, 2);
}

#[test]
fn batch_delivery_is_atomic() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    engine.add_entity("emitter", rc!(refcell!(Emitter::new(emitter_ctx, vec![1.0], 3))));

    let arrivals = rc!(refcell!(Vec::new()));
    let recorder_id = engine.add_entity(
        "recorder",
        rc!(refcell!(Recorder {
            arrivals: arrivals.clone()
        })),
    );
    engine.connect(emitter_id, "out", recorder_id);
    engine.schedule_activation(emitter_id, 1.0);

    engine.step_until_idle();
    assert_eq!(arrivals.borrow().len(), 3);
    for arrival in arrivals.borrow().iter() {
        assert_eq!(arrival.batch_size, 3);
    }
}

#[test]
fn confluent_runs_external_then_internal() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    engine.add_entity("emitter", rc!(refcell!(Emitter::new(emitter_ctx, vec![1.0], 1))));

    let log = rc!(refcell!(Vec::new()));
    let target_id = engine.add_entity("target", rc!(refcell!(TransitionLog { log: log.clone() })));
    engine.connect(emitter_id, "out", target_id);
    engine.schedule_activation(emitter_id, 1.0);
    // The target's own timer expires at the very instant the message arrives.
    engine.schedule_activation(target_id, 1.0);

    engine.step_until_idle();
    assert_eq!(*log.borrow(), vec!["external", "internal"]);
}

#[test]
fn zero_delay_cascade_stays_at_same_instant() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    engine.add_entity("emitter", rc!(refcell!(Emitter::new(emitter_ctx, vec![1.0], 1))));

    let hops = rc!(refcell!(Vec::new()));
    let a_ctx = engine.create_context("a");
    let a_id = a_ctx.id();
    engine.add_entity(
        "a",
        rc!(refcell!(Forwarder {
            ctx: a_ctx,
            hops: hops.clone()
        })),
    );
    let b_ctx = engine.create_context("b");
    let b_id = b_ctx.id();
    engine.add_entity(
        "b",
        rc!(refcell!(Forwarder {
            ctx: b_ctx,
            hops: hops.clone()
        })),
    );
    engine.connect(emitter_id, "out", a_id);
    engine.connect(a_id, "out", b_id);
    engine.schedule_activation(emitter_id, 1.0);

    engine.step_until_idle();
    assert_eq!(
        *hops.borrow(),
        vec![(1.0, "a".to_string()), (1.0, "b".to_string())]
    );
    assert_eq!(engine.time(), 1.0);
}

#[test]
fn fan_out_copies_to_every_destination() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    engine.add_entity("emitter", rc!(refcell!(Emitter::new(emitter_ctx, vec![1.0], 1))));

    let arrivals = rc!(refcell!(Vec::new()));
    for name in ["rec_a", "rec_b"] {
        let recorder_id = engine.add_entity(
            name,
            rc!(refcell!(Recorder {
                arrivals: arrivals.clone()
            })),
        );
        engine.connect(emitter_id, "out", recorder_id);
    }
    engine.schedule_activation(emitter_id, 1.0);

    engine.step_until_idle();
    assert_eq!(arrivals.borrow().len(), 2);
}

#[test]
fn keyed_route_demultiplexes_by_content() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    engine.add_entity("emitter", rc!(refcell!(Emitter::new(emitter_ctx, vec![1.0], 3))));

    let arrivals_a = rc!(refcell!(Vec::new()));
    let rec_a = engine.add_entity(
        "rec_a",
        rc!(refcell!(Recorder {
            arrivals: arrivals_a.clone()
        })),
    );
    let arrivals_b = rc!(refcell!(Vec::new()));
    let rec_b = engine.add_entity(
        "rec_b",
        rc!(refcell!(Recorder {
            arrivals: arrivals_b.clone()
        })),
    );
    engine.connect_keyed(
        emitter_id,
        "out",
        Box::new(move |data| {
            data.downcast_ref::<Ping>().and_then(|ping| match ping.seq {
                0 => Some(rec_a),
                1 => Some(rec_b),
                _ => None,
            })
        }),
        MissingRoutePolicy::Drop,
    );
    engine.schedule_activation(emitter_id, 1.0);

    engine.step_until_idle();
    // seq 2 has no route and is dropped under the Drop policy
    assert_eq!(arrivals_a.borrow().len(), 1);
    assert_eq!(arrivals_b.borrow().len(), 1);
    assert_eq!(arrivals_a.borrow()[0].seq, 0);
    assert_eq!(arrivals_b.borrow()[0].seq, 1);
}

#[test]
#[should_panic(expected = "No route for message")]
fn keyed_route_miss_panics_when_strict() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    engine.add_entity("emitter", rc!(refcell!(Emitter::new(emitter_ctx, vec![1.0], 1))));
    engine.connect_keyed(
        emitter_id,
        "out",
        Box::new(|_| None),
        MissingRoutePolicy::Panic,
    );
    engine.schedule_activation(emitter_id, 1.0);
    engine.step_until_idle();
}

#[test]
#[should_panic(expected = "Cannot schedule activation")]
fn scheduling_in_the_past_is_fatal() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    engine.add_entity("emitter", rc!(refcell!(Emitter::new(emitter_ctx, vec![5.0], 1))));
    engine.schedule_activation(emitter_id, 5.0);
    engine.step_until_idle();
    engine.schedule_activation(emitter_id, 1.0);
}

#[test]
fn step_for_duration_respects_limit() {
    let mut engine = Engine::new(123);
    let emitter_ctx = engine.create_context("emitter");
    let emitter_id = emitter_ctx.id();
    engine.add_entity("emitter", rc!(refcell!(Emitter::new(emitter_ctx, vec![1.0, 2.0, 3.5], 1))));

    let arrivals = rc!(refcell!(Vec::new()));
    let recorder_id = engine.add_entity(
        "recorder",
        rc!(refcell!(Recorder {
            arrivals: arrivals.clone()
        })),
    );
    engine.connect(emitter_id, "out", recorder_id);
    engine.schedule_activation(emitter_id, 1.0);

    assert!(engine.step_for_duration(2.5));
    assert_eq!(arrivals.borrow().len(), 2);
    assert!(!engine.step_for_duration(10.0));
    assert_eq!(arrivals.borrow().len(), 3);
}
