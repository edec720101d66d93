//! Task scheduling strategies of processing units.

use crate::core::config::parse_config_value;
use crate::core::process::Process;

/// Trait for implementation of task scheduling strategies.
///
/// Given the ready tasks of a processing unit, the strategy decides which of them run during the
/// next period. All strategies pick from a single service (processing units are homogeneous once
/// occupied) and never exceed the service's configured parallelism; they differ only in the
/// priority assigned to each candidate before truncation. Lower priority values run first and
/// ties are broken by insertion order.
pub trait SchedulingStrategy {
    /// Returns the ranking value of the process, lower runs first.
    fn priority(&self, now: f64, process: &Process) -> f64;

    /// Selects the indices of ready processes to run, at most `limit` of them.
    fn select(&self, now: f64, limit: usize, ready: &[&Process]) -> Vec<usize> {
        debug_assert!(
            ready.windows(2).all(|w| w[0].service_id() == w[1].service_id()),
            "Scheduling candidates must belong to a single service"
        );
        let mut order: Vec<usize> = (0..ready.len()).collect();
        order.sort_by(|&a, &b| {
            self.priority(now, ready[a])
                .total_cmp(&self.priority(now, ready[b]))
                .then(a.cmp(&b))
        });
        order.truncate(limit);
        order
    }
}

/// First-Come-First-Served: ranks candidates by arrival time.
pub struct Fcfs;

impl SchedulingStrategy for Fcfs {
    fn priority(&self, _now: f64, process: &Process) -> f64 {
        process.t_created()
    }
}

/// Shortest-Job-First: ranks candidates by expected total processing time.
pub struct Sjf;

impl SchedulingStrategy for Sjf {
    fn priority(&self, _now: f64, process: &Process) -> f64 {
        process.expected_time()
    }
}

/// Longest-Job-First: ranks candidates by expected total processing time, longest first.
pub struct Ljf;

impl SchedulingStrategy for Ljf {
    fn priority(&self, _now: f64, process: &Process) -> f64 {
        -process.expected_time()
    }
}

/// Shortest-Remaining-Time-First: ranks candidates by the time left to completion.
pub struct Srtf;

impl SchedulingStrategy for Srtf {
    fn priority(&self, _now: f64, process: &Process) -> f64 {
        process.remaining_nominal()
    }
}

/// Longest-Remaining-Time-First: ranks candidates by the time left to completion, longest first.
pub struct Lrtf;

impl SchedulingStrategy for Lrtf {
    fn priority(&self, _now: f64, process: &Process) -> f64 {
        -process.remaining_nominal()
    }
}

/// Earliest-Deadline-First: ranks candidates by absolute deadline.
pub struct Edf;

impl SchedulingStrategy for Edf {
    fn priority(&self, _now: f64, process: &Process) -> f64 {
        process.deadline()
    }
}

/// Least-Laxity-First: ranks candidates by the slack left before their deadline.
pub struct Llf;

impl SchedulingStrategy for Llf {
    fn priority(&self, now: f64, process: &Process) -> f64 {
        process.deadline() - now - process.remaining_nominal()
    }
}

/// Resolves scheduling strategy id into a strategy instance.
pub fn scheduling_strategy_resolver(config_str: &str) -> Box<dyn SchedulingStrategy> {
    let (name, _options) = parse_config_value(config_str);
    match name.as_str() {
        "FCFS" => Box::new(Fcfs),
        "SJF" => Box::new(Sjf),
        "LJF" => Box::new(Ljf),
        "SRTF" => Box::new(Srtf),
        "LRTF" => Box::new(Lrtf),
        "EDF" => Box::new(Edf),
        "LLF" => Box::new(Llf),
        _ => panic!("Can't resolve: {}", config_str),
    }
}
