//! A running unit of work hosted by a processing unit.

use edgesim_core::EPSILON;

use crate::core::events::requests::{CloseSessionRequest, OpenSessionRequest, SrvRequest};

/// What a process accomplishes once its progress reaches 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessKind {
    OpenSession,
    Task,
    CloseSession,
}

/// The request a process was spawned for.
#[derive(Clone, Debug)]
pub enum ProcessRequest {
    Open(OpenSessionRequest),
    Task(SrvRequest),
    Close(CloseSessionRequest),
}

/// A session handshake or request execution in progress.
///
/// Progress grows from 0 to 100 proportionally to `elapsed × utilization` relative to the
/// declared operation time at the declared nominal share, so a process may be stopped and later
/// restarted at a different utilization share without losing accumulated progress. This is the
/// mechanism that lets processing units re-schedule whenever the ready set changes.
#[derive(Clone, Debug)]
pub struct Process {
    kind: ProcessKind,
    request: ProcessRequest,
    service_id: String,
    client_id: String,
    t_created: f64,
    /// Absolute completion deadline.
    deadline: f64,
    /// Operation time in seconds when running at the nominal share.
    t_operation: f64,
    /// Nominal utilization share in percent.
    max_u: f64,
    progress: f64,
    utilization: f64,
    t_last_start: f64,
}

impl Process {
    pub fn new(kind: ProcessKind, request: ProcessRequest, now: f64, deadline: f64, t_operation: f64, max_u: f64) -> Self {
        assert!(max_u > 0. && max_u <= 100., "Nominal share must lie in (0, 100]");
        let (service_id, client_id) = match &request {
            ProcessRequest::Open(r) => (r.service_id.clone(), r.client_id.clone()),
            ProcessRequest::Task(r) => (r.service_id.clone(), r.client_id.clone()),
            ProcessRequest::Close(r) => (r.service_id.clone(), r.client_id.clone()),
        };
        Self {
            kind,
            request,
            service_id,
            client_id,
            t_created: now,
            deadline,
            t_operation,
            max_u,
            progress: 0.,
            utilization: 0.,
            t_last_start: now,
        }
    }

    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    pub fn request(&self) -> &ProcessRequest {
        &self.request
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn t_created(&self) -> f64 {
        self.t_created
    }

    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    pub fn running(&self) -> bool {
        self.utilization > 0.
    }

    pub fn finished(&self) -> bool {
        self.progress >= 100. - EPSILON
    }

    /// Starts the process at the given utilization share.
    ///
    /// Starting an already running process is a scheduling bug.
    pub fn start(&mut self, now: f64, utilization: f64) {
        assert!(
            !self.running(),
            "Process of `{}`/`{}` is started while already running",
            self.service_id,
            self.client_id
        );
        assert!(utilization > 0., "Process must be started at a positive share");
        self.utilization = utilization;
        self.t_last_start = now;
    }

    /// Stops the process, crediting the progress accumulated since the last start.
    ///
    /// Stopping an idle process is a no-op.
    pub fn stop(&mut self, now: f64) {
        if !self.running() {
            return;
        }
        assert!(
            now >= self.t_last_start - EPSILON,
            "Process stopped at {} before its last start {}",
            now,
            self.t_last_start
        );
        if self.t_operation <= 0. {
            self.progress = 100.;
        } else {
            self.progress += 100. * (now - self.t_last_start) * self.utilization / (self.t_operation * self.max_u);
            self.progress = self.progress.min(100.);
        }
        self.utilization = 0.;
    }

    /// Returns the total operation time at the nominal share.
    pub fn expected_time(&self) -> f64 {
        self.t_operation
    }

    /// Returns the time to completion when running at the given utilization share.
    pub fn remaining_time(&self, utilization: f64) -> f64 {
        assert!(utilization > 0.);
        (100. - self.progress).max(0.) / 100. * self.t_operation * self.max_u / utilization
    }

    /// Returns the time to completion at the nominal share.
    pub fn remaining_nominal(&self) -> f64 {
        self.remaining_time(self.max_u)
    }
}
