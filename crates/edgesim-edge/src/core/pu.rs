//! Processing unit: the unit of compute capacity inside an edge data center.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use edgesim_core::{cast, log_debug, log_trace, EntityContext, Message, TimedEntity, EPSILON};
use edgesim_models::power::PowerModel;
use edgesim_models::thermal::TemperatureModel;

use crate::core::config::{
    power_model_resolver, temperature_model_resolver, ProcTimeModelConfig, PuConfig, PuServiceConfig, ServiceConfig,
};
use crate::core::events::dispatch::{CloseSessionDispatch, OpenSessionDispatch, SetStandby, TaskDispatch};
use crate::core::events::reports::ProcessingUnitReport;
use crate::core::events::requests::{CloseSessionRequest, OpenSessionRequest, SrvRequest};
use crate::core::events::responses::{CloseSessionResponse, OpenSessionResponse, SrvResponse};
use crate::core::mapping_strategy::PuView;
use crate::core::process::{Process, ProcessKind, ProcessRequest};
use crate::core::pu_twin::PuTwin;
use crate::core::scheduling::{scheduling_strategy_resolver, SchedulingStrategy};

/// Power phase of a processing unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PuPhase {
    Off,
    TurningOn,
    On,
    TurningOff,
}

impl Display for PuPhase {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PuPhase::Off => write!(f, "off"),
            PuPhase::TurningOn => write!(f, "turning_on"),
            PuPhase::On => write!(f, "on"),
            PuPhase::TurningOff => write!(f, "turning_off"),
        }
    }
}

/// Responses produced by one scheduling pass, along with the time of the next one.
pub struct AdvanceOutcome {
    pub opened: Vec<OpenSessionResponse>,
    pub completed: Vec<SrvResponse>,
    pub closed: Vec<CloseSessionResponse>,
    pub next_activation: f64,
}

/// A processing unit hosting service sessions and standalone tasks.
///
/// The unit is service-homogeneous: its first accepted work binds it to that service and the
/// binding is cleared only when the unit empties completely. Admission failures are returned as
/// negative responses carrying a short trace; capacity over-commit is a fatal scheduling bug.
///
/// Every transition re-runs the scheduling pass: all running processes are stopped with their
/// partial progress credited, session handshakes are restarted first and the remaining capacity
/// is handed to tasks picked by the configured scheduling strategy.
pub struct ProcessingUnit {
    pu_id: String,
    edc_id: String,
    pu_type: String,
    t_on: f64,
    t_off: f64,
    services: IndexMap<String, PuServiceConfig>,
    service_catalog: Rc<HashMap<String, ServiceConfig>>,
    scheduler: Box<dyn SchedulingStrategy>,
    power_model: Box<dyn PowerModel>,
    temperature_model: Box<dyn TemperatureModel>,

    phase: PuPhase,
    phase_until: f64,
    standby: bool,
    bound_service: Option<String>,
    /// Active sessions of the bound service, client id to session opening time.
    sessions: BTreeMap<String, f64>,
    /// Session handshakes and tasks that are ready or running.
    processes: Vec<Process>,

    ctx: EntityContext,
}

impl ProcessingUnit {
    pub fn new(
        config: &PuConfig,
        edc_id: &str,
        service_catalog: Rc<HashMap<String, ServiceConfig>>,
        ctx: EntityContext,
    ) -> Self {
        Self {
            pu_id: config.id.clone(),
            edc_id: edc_id.to_string(),
            pu_type: config.pu_type.clone(),
            t_on: config.t_on,
            t_off: config.t_off,
            services: config.services.clone(),
            service_catalog,
            scheduler: scheduling_strategy_resolver(&config.scheduling),
            power_model: power_model_resolver(&config.power),
            temperature_model: temperature_model_resolver(&config.temperature),
            phase: PuPhase::Off,
            phase_until: f64::INFINITY,
            standby: false,
            bound_service: None,
            sessions: BTreeMap::new(),
            processes: Vec::new(),
            ctx,
        }
    }

    pub fn phase(&self) -> PuPhase {
        self.phase
    }

    pub fn bound_service(&self) -> Option<&str> {
        self.bound_service.as_deref()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn standby(&self) -> bool {
        self.standby
    }

    /// Returns the running utilization as a fraction of the unit capacity, in 0.0-1.0 range.
    pub fn utilization(&self) -> f64 {
        self.processes.iter().map(Process::utilization).sum::<f64>() / 100.
    }

    /// Returns the current power draw of the unit in W.
    pub fn power(&self) -> f64 {
        match self.phase {
            PuPhase::Off => 0.,
            PuPhase::TurningOn | PuPhase::TurningOff => self.power_model.get_power(0.),
            PuPhase::On => self.power_model.get_power(self.utilization()),
        }
    }

    /// Returns the current temperature of the unit in Celsius degrees.
    pub fn temperature(&self) -> f64 {
        match self.phase {
            PuPhase::Off => self.temperature_model.get_temperature(0.),
            _ => self.temperature_model.get_temperature(self.utilization()),
        }
    }

    /// Creates a disposable digital twin of this unit for planning components.
    pub fn twin(&self) -> PuTwin {
        PuTwin::new(&self.pu_id, self.services.clone(), self.power_model.clone())
    }

    /// Returns the best empty-state capacity over all services the unit supports.
    pub fn max_capacity_any(&self) -> u32 {
        self.services.values().map(|cfg| cfg.max_concurrent).max().unwrap_or(0)
    }

    /// Returns the best remaining capacity over all services the unit supports.
    pub fn additional_capacity_any(&self) -> u32 {
        self.services
            .keys()
            .map(|service| self.additional_capacity(service))
            .max()
            .unwrap_or(0)
    }

    fn used_capacity(&self, service_id: &str) -> u32 {
        let session_required = self
            .service_catalog
            .get(service_id)
            .map_or(false, |s| s.session_required);
        if session_required {
            let opening = self
                .processes
                .iter()
                .filter(|p| p.kind() == ProcessKind::OpenSession)
                .count();
            (self.sessions.len() + opening) as u32
        } else {
            self.processes.iter().filter(|p| p.kind() == ProcessKind::Task).count() as u32
        }
    }

    fn find_process(&self, kind: ProcessKind, client_id: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.kind() == kind && p.client_id() == client_id)
    }

    fn sample_proc_time(&mut self, model: &ProcTimeModelConfig) -> f64 {
        match model {
            ProcTimeModelConfig::Constant { value } => *value,
            ProcTimeModelConfig::Uniform { min, max } => self.ctx.gen_range(*min..*max),
        }
    }

    /// Reserves a session slot and queues the opening handshake for the next scheduling pass.
    ///
    /// Returns an immediate negative response on admission failure and `None` when the request
    /// is pending. Re-opening an already active session succeeds immediately; an open already
    /// in flight is merged into the pending one.
    pub fn add_open_session(&mut self, now: f64, request: OpenSessionRequest) -> Option<OpenSessionResponse> {
        let service_id = request.service_id.clone();
        let reject = |trace: &str| {
            Some(OpenSessionResponse {
                request: request.clone(),
                edc_id: None,
                t: now,
                trace: Some(trace.to_string()),
            })
        };
        if !self.services.contains_key(&service_id) || !self.service_catalog.contains_key(&service_id) {
            return reject("bad mapping: unsupported service");
        }
        if !self.service_catalog[&service_id].session_required {
            return reject("bad mapping: service has no sessions");
        }
        if let Some(bound) = &self.bound_service {
            if *bound != service_id {
                return reject("bad mapping: service mismatch");
            }
        }
        if self.find_process(ProcessKind::CloseSession, &request.client_id).is_some() {
            return reject("session closing");
        }
        if self.sessions.contains_key(&request.client_id) {
            return Some(OpenSessionResponse {
                request,
                edc_id: Some(self.edc_id.clone()),
                t: now,
                trace: None,
            });
        }
        if self.find_process(ProcessKind::OpenSession, &request.client_id).is_some() {
            return None;
        }
        if self.additional_capacity(&service_id) == 0 {
            return reject("out of resources");
        }
        let cfg = &self.services[&service_id];
        let deadline = request.t_sent + self.service_catalog[&service_id].deadline;
        let process = Process::new(
            ProcessKind::OpenSession,
            ProcessRequest::Open(request),
            now,
            deadline,
            cfg.t_open,
            cfg.share(),
        );
        self.bound_service = Some(service_id);
        self.processes.push(process);
        None
    }

    /// Enqueues a task for the next scheduling pass.
    ///
    /// Session-bound tasks require an active session of the same client; best-effort tasks are
    /// admitted against the unit's remaining capacity.
    pub fn add_task(&mut self, now: f64, request: SrvRequest) -> Option<SrvResponse> {
        let service_id = request.service_id.clone();
        let reject = |trace: &str| {
            Some(SrvResponse {
                request: request.clone(),
                success: false,
                t: now,
                trace: Some(trace.to_string()),
            })
        };
        if !self.services.contains_key(&service_id) || !self.service_catalog.contains_key(&service_id) {
            return reject("bad mapping: unsupported service");
        }
        let service = &self.service_catalog[&service_id];
        if service.session_required {
            if !self.sessions.contains_key(&request.client_id) {
                return reject("session not found");
            }
            if self.find_process(ProcessKind::CloseSession, &request.client_id).is_some() {
                return reject("session closing");
            }
        } else {
            if let Some(bound) = &self.bound_service {
                if *bound != service_id {
                    return reject("bad mapping: service mismatch");
                }
            }
            if self.additional_capacity(&service_id) == 0 {
                return reject("out of resources");
            }
        }
        let proc_time_model = self.service_catalog[&service_id].proc_time.clone();
        let proc_time = self.sample_proc_time(&proc_time_model);
        let cfg = &self.services[&service_id];
        let deadline = request.t_sent + self.service_catalog[&service_id].deadline;
        let process = Process::new(
            ProcessKind::Task,
            ProcessRequest::Task(request),
            now,
            deadline,
            proc_time,
            cfg.share(),
        );
        self.bound_service = Some(service_id);
        self.processes.push(process);
        None
    }

    /// Queues the closing handshake of a session for the next scheduling pass.
    ///
    /// Closing fails fast when the session does not exist or still has in-flight tasks.
    pub fn add_close_session(&mut self, now: f64, request: CloseSessionRequest) -> Option<CloseSessionResponse> {
        let reject = |trace: &str| {
            Some(CloseSessionResponse {
                request: request.clone(),
                session_duration: -1.,
                t: now,
                trace: Some(trace.to_string()),
            })
        };
        if !self.services.contains_key(&request.service_id) || !self.service_catalog.contains_key(&request.service_id) {
            return reject("bad mapping: unsupported service");
        }
        if !self.sessions.contains_key(&request.client_id) {
            return reject("session not found");
        }
        if self.find_process(ProcessKind::Task, &request.client_id).is_some() {
            return reject("session busy");
        }
        if self.find_process(ProcessKind::CloseSession, &request.client_id).is_some() {
            return None;
        }
        let cfg = &self.services[&request.service_id];
        let deadline = request.t_sent + self.service_catalog[&request.service_id].deadline;
        let process = Process::new(
            ProcessKind::CloseSession,
            ProcessRequest::Close(request),
            now,
            deadline,
            cfg.t_close,
            cfg.share(),
        );
        self.processes.push(process);
        None
    }

    /// Sets the standby flag; the phase follows gracefully on the next scheduling pass.
    pub fn set_standby(&mut self, standby: bool) {
        self.standby = standby;
    }

    /// Sets the standby flag and applies the matching phase immediately, skipping switch delays.
    ///
    /// Used when the very first slicing is applied at construction time.
    pub fn set_standby_immediate(&mut self, standby: bool) {
        self.standby = standby;
        let busy = !self.processes.is_empty() || !self.sessions.is_empty();
        if standby || busy {
            self.phase = PuPhase::On;
        } else {
            self.phase = PuPhase::Off;
        }
        self.phase_until = f64::INFINITY;
    }

    fn update_phase(&mut self, now: f64) {
        let busy = !self.processes.is_empty() || !self.sessions.is_empty();
        let want_on = busy || self.standby;
        loop {
            match self.phase {
                PuPhase::Off => {
                    if !want_on {
                        break;
                    }
                    if self.t_on > 0. {
                        self.phase = PuPhase::TurningOn;
                        self.phase_until = now + self.t_on;
                        break;
                    }
                    self.phase = PuPhase::On;
                }
                PuPhase::TurningOn => {
                    if now + EPSILON < self.phase_until {
                        break;
                    }
                    self.phase = PuPhase::On;
                    self.phase_until = f64::INFINITY;
                }
                PuPhase::On => {
                    if want_on {
                        break;
                    }
                    if self.t_off > 0. {
                        self.phase = PuPhase::TurningOff;
                        self.phase_until = now + self.t_off;
                        break;
                    }
                    self.phase = PuPhase::Off;
                }
                PuPhase::TurningOff => {
                    if now + EPSILON < self.phase_until {
                        break;
                    }
                    self.phase = PuPhase::Off;
                    self.phase_until = f64::INFINITY;
                }
            }
        }
    }

    /// The scheduling pass.
    ///
    /// Stops all running processes crediting their partial progress, collects responses for
    /// everything that reached full progress, re-selects the running set (session handshakes
    /// first, then tasks picked by the scheduling strategy up to the remaining capacity) and
    /// updates the power phase.
    pub fn advance(&mut self, now: f64) -> AdvanceOutcome {
        let mut outcome = AdvanceOutcome {
            opened: Vec::new(),
            completed: Vec::new(),
            closed: Vec::new(),
            next_activation: f64::INFINITY,
        };

        for process in &mut self.processes {
            process.stop(now);
        }

        let mut remaining = Vec::new();
        for process in self.processes.drain(..) {
            if !process.finished() {
                remaining.push(process);
                continue;
            }
            match (process.kind(), process.request().clone()) {
                (ProcessKind::OpenSession, ProcessRequest::Open(request)) => {
                    self.sessions.insert(request.client_id.clone(), now);
                    outcome.opened.push(OpenSessionResponse {
                        request,
                        edc_id: Some(self.edc_id.clone()),
                        t: now,
                        trace: None,
                    });
                }
                (ProcessKind::Task, ProcessRequest::Task(request)) => {
                    outcome.completed.push(SrvResponse {
                        request,
                        success: true,
                        t: now,
                        trace: None,
                    });
                }
                (ProcessKind::CloseSession, ProcessRequest::Close(request)) => {
                    let opened_at = self
                        .sessions
                        .remove(&request.client_id)
                        .expect("closing a session that does not exist");
                    outcome.closed.push(CloseSessionResponse {
                        request,
                        session_duration: now - opened_at,
                        t: now,
                        trace: None,
                    });
                }
                _ => unreachable!(),
            }
        }
        self.processes = remaining;

        if self.processes.is_empty() && self.sessions.is_empty() {
            self.bound_service = None;
        }

        self.update_phase(now);

        if self.phase == PuPhase::On {
            let mut capacity = 100.;
            for process in &mut self.processes {
                if process.kind() != ProcessKind::Task {
                    let share = self.services[process.service_id()].share();
                    assert!(
                        capacity + EPSILON >= share,
                        "Utilization over-commit on `{}`: session handshakes exceed unit capacity",
                        self.pu_id
                    );
                    process.start(now, share);
                    capacity -= share;
                }
            }
            let task_indices: Vec<usize> = self
                .processes
                .iter()
                .enumerate()
                .filter(|(_, p)| p.kind() == ProcessKind::Task)
                .map(|(i, _)| i)
                .collect();
            if !task_indices.is_empty() {
                let service_id = self.processes[task_indices[0]].service_id().to_string();
                let share = self.services[&service_id].share();
                let slots = ((capacity + EPSILON) / share).floor() as usize;
                let limit = slots.min(self.service_catalog[&service_id].max_parallel_tasks as usize);
                let ready: Vec<&Process> = task_indices.iter().map(|&i| &self.processes[i]).collect();
                let selected = self.scheduler.select(now, limit, &ready);
                for position in selected {
                    self.processes[task_indices[position]].start(now, share);
                }
            }
            let total: f64 = self.processes.iter().map(Process::utilization).sum();
            assert!(
                total <= 100. + EPSILON,
                "Utilization over-commit on `{}`: running processes use {}%",
                self.pu_id,
                total
            );
        }

        if matches!(self.phase, PuPhase::TurningOn | PuPhase::TurningOff) {
            outcome.next_activation = self.phase_until;
        }
        for process in &self.processes {
            if process.running() {
                let completion = now + process.remaining_time(process.utilization());
                outcome.next_activation = outcome.next_activation.min(completion);
            }
        }
        outcome
    }

    fn report(&self) -> ProcessingUnitReport {
        let capacity = match &self.bound_service {
            Some(service) => self.additional_capacity(service),
            None => self.services.values().map(|cfg| cfg.max_concurrent).max().unwrap_or(0),
        };
        let queue_time = match &self.bound_service {
            Some(service) => self.queue_time(service),
            None => 0.,
        };
        ProcessingUnitReport {
            edc_id: self.edc_id.clone(),
            pu_id: self.pu_id.clone(),
            pu_type: self.pu_type.clone(),
            status: self.phase.to_string(),
            bound_service: self.bound_service.clone(),
            n_sessions: self.sessions.len() as u32,
            capacity,
            queue_time,
            power: self.power(),
            temperature: self.temperature(),
        }
    }

    fn activate(&mut self, now: f64) -> f64 {
        let outcome = self.advance(now);
        for response in outcome.opened {
            log_debug!(self.ctx, "session of `{}` opened for `{}`", response.request.service_id, response.request.client_id);
            self.ctx.send("control", response);
        }
        for response in outcome.completed {
            log_debug!(self.ctx, "task of `{}` completed for `{}`", response.request.service_id, response.request.client_id);
            self.ctx.send("control", response);
        }
        for response in outcome.closed {
            log_debug!(self.ctx, "session of `{}` closed for `{}`", response.request.service_id, response.request.client_id);
            self.ctx.send("control", response);
        }
        let report = self.report();
        self.ctx.send("control", report);
        outcome.next_activation
    }
}

impl PuView for ProcessingUnit {
    fn pu_id(&self) -> &str {
        &self.pu_id
    }

    fn additional_capacity(&self, service_id: &str) -> u32 {
        let cfg = match self.services.get(service_id) {
            Some(cfg) => cfg,
            None => return 0,
        };
        let service = match self.service_catalog.get(service_id) {
            Some(service) => service,
            None => return 0,
        };
        if let Some(bound) = &self.bound_service {
            if bound != service_id {
                return 0;
            }
        }
        if self.queue_time(service_id) + service.proc_time.expected() > service.deadline {
            return 0;
        }
        cfg.max_concurrent.saturating_sub(self.used_capacity(service_id))
    }

    fn max_capacity(&self, service_id: &str) -> u32 {
        self.services.get(service_id).map_or(0, |cfg| cfg.max_concurrent)
    }

    fn occupancy_ratio(&self) -> f64 {
        match &self.bound_service {
            Some(service) => {
                let max = self.max_capacity(service);
                if max == 0 {
                    0.
                } else {
                    self.used_capacity(service) as f64 / max as f64
                }
            }
            None => 0.,
        }
    }

    fn queue_time(&self, service_id: &str) -> f64 {
        let backlog: f64 = self.processes.iter().map(Process::remaining_nominal).sum();
        let parallelism = match (self.services.get(service_id), self.service_catalog.get(service_id)) {
            (Some(cfg), Some(service)) => cfg.max_concurrent.min(service.max_parallel_tasks).max(1),
            _ => 1,
        };
        backlog / parallelism as f64
    }

    fn power_increment(&self, service_id: &str) -> f64 {
        let share = match self.services.get(service_id) {
            Some(cfg) => cfg.share() / 100.,
            None => return f64::INFINITY,
        };
        let utilization = self.utilization();
        self.power_model.get_power((utilization + share).min(1.)) - self.power_model.get_power(utilization)
    }
}

impl TimedEntity for ProcessingUnit {
    fn on_internal(&mut self, now: f64) -> f64 {
        self.activate(now)
    }

    fn on_external(&mut self, now: f64, _elapsed: f64, messages: Vec<Message>) -> f64 {
        for msg in messages {
            cast!(match msg.data {
                OpenSessionDispatch { pu_id: _, request } => {
                    log_trace!(self.ctx, "open session request of `{}` for `{}`", request.service_id, request.client_id);
                    if let Some(response) = self.add_open_session(now, request) {
                        self.ctx.send("control", response);
                    }
                }
                TaskDispatch { pu_id: _, request } => {
                    log_trace!(self.ctx, "task request of `{}` for `{}`", request.service_id, request.client_id);
                    if let Some(response) = self.add_task(now, request) {
                        self.ctx.send("control", response);
                    }
                }
                CloseSessionDispatch { pu_id: _, request } => {
                    log_trace!(self.ctx, "close session request of `{}` for `{}`", request.service_id, request.client_id);
                    if let Some(response) = self.add_close_session(now, request) {
                        self.ctx.send("control", response);
                    }
                }
                SetStandby { pu_id: _, standby } => {
                    log_trace!(self.ctx, "standby set to {}", standby);
                    self.set_standby(standby);
                }
            })
        }
        self.activate(now)
    }
}

#[cfg(test)]
mod tests {
    use sugars::rc;

    use edgesim_core::Engine;

    use super::*;
    use crate::core::config::{PowerModelConfig, TemperatureModelConfig};

    fn catalog() -> Rc<HashMap<String, ServiceConfig>> {
        let mut services = HashMap::new();
        for id in ["sess", "sess2"] {
            services.insert(
                id.to_string(),
                ServiceConfig {
                    id: id.to_string(),
                    deadline: 100.,
                    session_required: true,
                    max_parallel_tasks: 2,
                    proc_time: ProcTimeModelConfig::Constant { value: 2. },
                    stream: true,
                },
            );
        }
        services.insert(
            "req".to_string(),
            ServiceConfig {
                id: "req".to_string(),
                deadline: 3.,
                session_required: false,
                max_parallel_tasks: 1,
                proc_time: ProcTimeModelConfig::Constant { value: 2. },
                stream: false,
            },
        );
        rc!(services)
    }

    fn pu_config(t_on: f64, t_off: f64) -> PuConfig {
        let mut services = IndexMap::new();
        for service in ["sess", "sess2"] {
            services.insert(
                service.to_string(),
                PuServiceConfig {
                    max_concurrent: 2,
                    t_open: 0.,
                    t_close: 0.,
                },
            );
        }
        services.insert(
            "req".to_string(),
            PuServiceConfig {
                max_concurrent: 1,
                t_open: 0.,
                t_close: 0.,
            },
        );
        PuConfig {
            id: "pu_1_0".to_string(),
            pu_type: "edge".to_string(),
            t_on,
            t_off,
            services,
            power: PowerModelConfig::Linear {
                idle_power: 100.,
                max_power: 200.,
            },
            temperature: TemperatureModelConfig::Constant { temperature: 25. },
            scheduling: "FCFS".to_string(),
        }
    }

    fn pu(engine: &mut Engine, t_on: f64, t_off: f64) -> ProcessingUnit {
        let ctx = engine.create_context("edc_1.pu_1_0");
        ProcessingUnit::new(&pu_config(t_on, t_off), "edc_1", catalog(), ctx)
    }

    fn open(service: &str, client: &str, t: f64) -> OpenSessionRequest {
        OpenSessionRequest {
            service_id: service.to_string(),
            client_id: client.to_string(),
            ap_id: "ap_0".to_string(),
            gateway_id: "gw_0".to_string(),
            edc_id: "edc_1".to_string(),
            t_sent: t,
        }
    }

    fn task(service: &str, client: &str, t: f64) -> SrvRequest {
        SrvRequest {
            service_id: service.to_string(),
            client_id: client.to_string(),
            ap_id: "ap_0".to_string(),
            gateway_id: "gw_0".to_string(),
            edc_id: "edc_1".to_string(),
            t_sent: t,
        }
    }

    fn close(service: &str, client: &str, t: f64) -> CloseSessionRequest {
        CloseSessionRequest {
            service_id: service.to_string(),
            client_id: client.to_string(),
            ap_id: "ap_0".to_string(),
            gateway_id: "gw_0".to_string(),
            edc_id: "edc_1".to_string(),
            t_sent: t,
        }
    }

    // Zero-duration handshakes need two passes: one to start the process at the current
    // instant and one to credit its progress, just like the engine re-activates the entity.
    fn advance_twice(pu: &mut ProcessingUnit, now: f64) -> AdvanceOutcome {
        pu.advance(now);
        pu.advance(now)
    }

    #[test]
    fn session_lifecycle_produces_responses() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 0., 0.);

        assert!(pu.add_open_session(0., open("sess", "client_1", 0.)).is_none());
        let outcome = advance_twice(&mut pu, 0.);
        assert_eq!(outcome.opened.len(), 1);
        assert!(outcome.opened[0].accepted());
        assert_eq!(pu.session_count(), 1);
        assert_eq!(pu.bound_service(), Some("sess"));
        assert_eq!(pu.phase(), PuPhase::On);

        assert!(pu.add_task(1., task("sess", "client_1", 1.)).is_none());
        let outcome = pu.advance(1.);
        assert_eq!(outcome.next_activation, 3.);
        let outcome = pu.advance(3.);
        assert_eq!(outcome.completed.len(), 1);
        assert!(outcome.completed[0].success);

        assert!(pu.add_close_session(5., close("sess", "client_1", 5.)).is_none());
        let outcome = advance_twice(&mut pu, 5.);
        assert_eq!(outcome.closed.len(), 1);
        assert_eq!(outcome.closed[0].session_duration, 5.);
        assert_eq!(pu.session_count(), 0);
        assert_eq!(pu.bound_service(), None);
        assert_eq!(pu.phase(), PuPhase::Off);
    }

    #[test]
    fn open_on_pu_bound_to_other_service_is_rejected() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 0., 0.);

        assert!(pu.add_open_session(0., open("sess", "client_1", 0.)).is_none());
        advance_twice(&mut pu, 0.);

        let response = pu.add_open_session(0., open("sess2", "client_2", 0.)).unwrap();
        assert!(!response.accepted());
        assert_eq!(response.trace.as_deref(), Some("bad mapping: service mismatch"));
    }

    #[test]
    fn full_pu_rejects_further_sessions() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 0., 0.);

        assert!(pu.add_open_session(0., open("sess", "client_1", 0.)).is_none());
        assert!(pu.add_open_session(0., open("sess", "client_2", 0.)).is_none());
        advance_twice(&mut pu, 0.);
        assert_eq!(pu.session_count(), 2);

        let response = pu.add_open_session(0., open("sess", "client_3", 0.)).unwrap();
        assert_eq!(response.trace.as_deref(), Some("out of resources"));
    }

    #[test]
    fn running_utilization_never_exceeds_capacity() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 0., 0.);

        assert!(pu.add_open_session(0., open("sess", "client_1", 0.)).is_none());
        assert!(pu.add_open_session(0., open("sess", "client_2", 0.)).is_none());
        advance_twice(&mut pu, 0.);

        assert!(pu.add_task(1., task("sess", "client_1", 1.)).is_none());
        assert!(pu.add_task(1., task("sess", "client_2", 1.)).is_none());
        assert!(pu.add_task(1., task("sess", "client_1", 1.)).is_none());
        let outcome = pu.advance(1.);
        // Two tasks run at half capacity each, the third waits for a free slot.
        assert_eq!(pu.utilization(), 1.);
        assert_eq!(outcome.next_activation, 3.);

        let outcome = pu.advance(3.);
        assert_eq!(outcome.completed.len(), 2);
        assert_eq!(pu.utilization(), 0.5);
        let outcome = pu.advance(5.);
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.next_activation, f64::INFINITY);
    }

    #[test]
    fn closing_busy_session_is_rejected() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 0., 0.);

        assert!(pu.add_open_session(0., open("sess", "client_1", 0.)).is_none());
        advance_twice(&mut pu, 0.);
        assert!(pu.add_task(0., task("sess", "client_1", 0.)).is_none());

        let response = pu.add_close_session(0., close("sess", "client_1", 0.)).unwrap();
        assert!(!response.accepted());
        assert_eq!(response.trace.as_deref(), Some("session busy"));
    }

    #[test]
    fn task_without_session_is_rejected() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 0., 0.);

        let response = pu.add_task(0., task("sess", "client_1", 0.)).unwrap();
        assert!(!response.success);
        assert_eq!(response.trace.as_deref(), Some("session not found"));
    }

    #[test]
    fn infeasible_deadline_zeroes_additional_capacity() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 0., 0.);

        // `req` allows a single concurrent task with proc time 2 against deadline 3:
        // a queued task pushes the queue-time estimate past the deadline.
        assert!(pu.add_task(0., task("req", "client_1", 0.)).is_none());
        let response = pu.add_task(0., task("req", "client_2", 0.)).unwrap();
        assert_eq!(response.trace.as_deref(), Some("out of resources"));
    }

    #[test]
    fn switching_delays_defer_the_first_scheduling_pass() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 2., 1.);

        assert!(pu.add_open_session(0., open("sess", "client_1", 0.)).is_none());
        let outcome = pu.advance(0.);
        assert_eq!(pu.phase(), PuPhase::TurningOn);
        assert_eq!(outcome.next_activation, 2.);
        assert!(outcome.opened.is_empty());

        let outcome = advance_twice(&mut pu, 2.);
        assert_eq!(pu.phase(), PuPhase::On);
        assert_eq!(outcome.opened.len(), 1);

        assert!(pu.add_close_session(3., close("sess", "client_1", 3.)).is_none());
        let outcome = advance_twice(&mut pu, 3.);
        assert_eq!(outcome.closed.len(), 1);
        assert_eq!(pu.phase(), PuPhase::TurningOff);
        assert_eq!(outcome.next_activation, 4.);
        pu.advance(4.);
        assert_eq!(pu.phase(), PuPhase::Off);
    }

    #[test]
    fn standby_keeps_idle_pu_powered() {
        let mut engine = Engine::new(123);
        let mut pu = pu(&mut engine, 2., 1.);

        pu.set_standby_immediate(true);
        assert_eq!(pu.phase(), PuPhase::On);
        assert!(pu.power() > 0.);

        // Dropping standby powers the idle unit off gracefully.
        pu.set_standby(false);
        let outcome = pu.advance(10.);
        assert_eq!(pu.phase(), PuPhase::TurningOff);
        assert_eq!(outcome.next_activation, 11.);
        pu.advance(11.);
        assert_eq!(pu.phase(), PuPhase::Off);
        assert_eq!(pu.power(), 0.);
    }
}
