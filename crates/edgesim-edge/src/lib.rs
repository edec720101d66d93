//! Simulation of edge data centers serving sessions and requests of mobile clients.
//!
//! An edge data center (EDC) is a pool of heterogeneous processing units (PUs) managed by a
//! resource manager. The resource manager maps session and request lifecycles onto PUs using
//! pluggable mapping strategies, reserves per-service capacity through dynamic resource slicing
//! and aggregates the power drawn by the pool into a cooling model. Each PU hosts sessions and
//! tasks as explicitly tracked processes, re-scheduled on every change of the ready set by a
//! pluggable scheduling strategy.

pub mod core;
pub mod simulation;
