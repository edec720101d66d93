//! Simulation facade wiring edge data centers, clients and the engine together.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use indexmap::IndexMap;
use sugars::{rc, refcell};

use edgesim_core::{cast, Engine, EntityContext, Id, Message, MessageData, MissingRoutePolicy, TimedEntity};

use crate::core::config::{EdcConfig, ServiceConfig};
use crate::core::events::control::{NewEdcMapping, NewEdcSlicing};
use crate::core::events::dispatch::{CloseSessionDispatch, OpenSessionDispatch, SetStandby, TaskDispatch};
use crate::core::events::reports::EdgeDataCenterReport;
use crate::core::events::requests::{CloseSessionRequest, OpenSessionRequest, SrvRequest};
use crate::core::events::responses::{CloseSessionResponse, OpenSessionResponse, SrvResponse};
use crate::core::pu::ProcessingUnit;
use crate::core::resource_manager::ResourceManager;

/// Passive entity standing in for the client side: collects responses, EDC reports and the
/// requests escalated to the cloud.
#[derive(Default)]
pub struct MessageSink {
    open_responses: Vec<OpenSessionResponse>,
    srv_responses: Vec<SrvResponse>,
    close_responses: Vec<CloseSessionResponse>,
    reports: Vec<EdgeDataCenterReport>,
    forwarded_opens: Vec<OpenSessionRequest>,
    forwarded_tasks: Vec<SrvRequest>,
}

impl MessageSink {
    pub fn new() -> Self {
        Default::default()
    }
}

impl TimedEntity for MessageSink {
    fn on_internal(&mut self, _now: f64) -> f64 {
        f64::INFINITY
    }

    fn on_external(&mut self, _now: f64, _elapsed: f64, messages: Vec<Message>) -> f64 {
        for msg in messages {
            cast!(match msg.data {
                OpenSessionResponse { request, edc_id, t, trace } => {
                    self.open_responses.push(OpenSessionResponse {
                        request,
                        edc_id,
                        t,
                        trace,
                    });
                }
                SrvResponse { request, success, t, trace } => {
                    self.srv_responses.push(SrvResponse {
                        request,
                        success,
                        t,
                        trace,
                    });
                }
                CloseSessionResponse { request, session_duration, t, trace } => {
                    self.close_responses.push(CloseSessionResponse {
                        request,
                        session_duration,
                        t,
                        trace,
                    });
                }
                EdgeDataCenterReport {
                    edc_id,
                    slices,
                    free_pool,
                    congested,
                    it_power,
                    cooling_power,
                    pue,
                    edc_temperature
                } => {
                    self.reports.push(EdgeDataCenterReport {
                        edc_id,
                        slices,
                        free_pool,
                        congested,
                        it_power,
                        cooling_power,
                        pue,
                        edc_temperature,
                    });
                }
                OpenSessionRequest {
                    service_id,
                    client_id,
                    ap_id,
                    gateway_id,
                    edc_id,
                    t_sent
                } => {
                    self.forwarded_opens.push(OpenSessionRequest {
                        service_id,
                        client_id,
                        ap_id,
                        gateway_id,
                        edc_id,
                        t_sent,
                    });
                }
                SrvRequest {
                    service_id,
                    client_id,
                    ap_id,
                    gateway_id,
                    edc_id,
                    t_sent
                } => {
                    self.forwarded_tasks.push(SrvRequest {
                        service_id,
                        client_id,
                        ap_id,
                        gateway_id,
                        edc_id,
                        t_sent,
                    });
                }
            })
        }
        f64::INFINITY
    }
}

fn dispatch_target(data: &dyn MessageData, pu_ids: &HashMap<String, Id>) -> Option<Id> {
    if let Some(d) = data.downcast_ref::<OpenSessionDispatch>() {
        return pu_ids.get(&d.pu_id).copied();
    }
    if let Some(d) = data.downcast_ref::<TaskDispatch>() {
        return pu_ids.get(&d.pu_id).copied();
    }
    if let Some(d) = data.downcast_ref::<CloseSessionDispatch>() {
        return pu_ids.get(&d.pu_id).copied();
    }
    if let Some(d) = data.downcast_ref::<SetStandby>() {
        return pu_ids.get(&d.pu_id).copied();
    }
    None
}

fn request_target(data: &dyn MessageData, edc_ids: &HashMap<String, Id>) -> Option<Id> {
    let edc_id = if let Some(r) = data.downcast_ref::<OpenSessionRequest>() {
        &r.edc_id
    } else if let Some(r) = data.downcast_ref::<SrvRequest>() {
        &r.edc_id
    } else if let Some(r) = data.downcast_ref::<CloseSessionRequest>() {
        &r.edc_id
    } else if let Some(r) = data.downcast_ref::<NewEdcMapping>() {
        &r.edc_id
    } else if let Some(r) = data.downcast_ref::<NewEdcSlicing>() {
        &r.edc_id
    } else {
        return None;
    };
    edc_ids.get(edc_id).copied()
}

/// Represents a simulation of an edge computing infrastructure, provides methods for its
/// configuration and execution.
pub struct EdgeSimulation {
    engine: Engine,
    ctx: EntityContext,
    service_catalog: Rc<HashMap<String, ServiceConfig>>,
    rms: BTreeMap<String, Rc<RefCell<ResourceManager>>>,
    pus: BTreeMap<String, BTreeMap<String, Rc<RefCell<ProcessingUnit>>>>,
    edc_ids: Rc<RefCell<HashMap<String, Id>>>,
    sink: Rc<RefCell<MessageSink>>,
}

impl EdgeSimulation {
    /// Creates a new simulation with the given seed and service catalog.
    pub fn new(seed: u64, services: Vec<ServiceConfig>) -> Self {
        let mut engine = Engine::new(seed);
        let ctx = engine.create_context("simulation");
        let sink = rc!(refcell!(MessageSink::new()));
        engine.add_entity("client", sink.clone());

        let edc_ids: Rc<RefCell<HashMap<String, Id>>> = rc!(refcell!(HashMap::new()));
        let router_map = edc_ids.clone();
        engine.connect_keyed(
            ctx.id(),
            "requests",
            Box::new(move |data| request_target(data, &router_map.borrow())),
            MissingRoutePolicy::Panic,
        );

        let service_catalog = rc!(services.into_iter().map(|s| (s.id.clone(), s)).collect::<HashMap<_, _>>());
        Self {
            engine,
            ctx,
            service_catalog,
            rms: BTreeMap::new(),
            pus: BTreeMap::new(),
            edc_ids,
            sink,
        }
    }

    /// Builds an edge data center: the resource manager, its processing units and the wiring
    /// between them, the clients and the cloud side.
    pub fn add_edc(&mut self, config: &EdcConfig) {
        let rm_ctx = self.engine.create_context(&config.id);
        let rm_id = rm_ctx.id();

        let mut pu_map = BTreeMap::new();
        let mut pu_ids = HashMap::new();
        for pu_config in &config.pus {
            let name = format!("{}.{}", config.id, pu_config.id);
            let pu_ctx = self.engine.create_context(&name);
            let pu = rc!(refcell!(ProcessingUnit::new(
                pu_config,
                &config.id,
                self.service_catalog.clone(),
                pu_ctx
            )));
            let pu_entity_id = self.engine.add_entity(&name, pu.clone());
            self.engine.connect(pu_entity_id, "control", rm_id);
            pu_ids.insert(pu_config.id.clone(), pu_entity_id);
            pu_map.insert(pu_config.id.clone(), pu);
        }

        let rm = rc!(refcell!(ResourceManager::new(
            config,
            pu_map.clone(),
            self.service_catalog.clone(),
            rm_ctx
        )));
        self.engine.add_entity(&config.id, rm.clone());

        let sink_id = self.engine.lookup_id("client");
        self.engine.connect_keyed(
            rm_id,
            "dispatch",
            Box::new(move |data| dispatch_target(data, &pu_ids)),
            MissingRoutePolicy::Panic,
        );
        self.engine.connect(rm_id, "response", sink_id);
        self.engine.connect(rm_id, "report", sink_id);
        self.engine.connect(rm_id, "cloud", sink_id);

        self.edc_ids.borrow_mut().insert(config.id.clone(), rm_id);
        self.rms.insert(config.id.clone(), rm);
        self.pus.insert(config.id.clone(), pu_map);
    }

    fn request_fields(&self, edc_id: &str, service_id: &str, client_id: &str) -> (String, String, String, String, String, f64) {
        (
            service_id.to_string(),
            client_id.to_string(),
            "ap_0".to_string(),
            "gw_0".to_string(),
            edc_id.to_string(),
            self.ctx.time(),
        )
    }

    /// Issues an open session request to the given EDC.
    pub fn open_session(&mut self, edc_id: &str, service_id: &str, client_id: &str) {
        let (service_id, client_id, ap_id, gateway_id, edc_id, t_sent) =
            self.request_fields(edc_id, service_id, client_id);
        self.ctx.send(
            "requests",
            OpenSessionRequest {
                service_id,
                client_id,
                ap_id,
                gateway_id,
                edc_id,
                t_sent,
            },
        );
    }

    /// Issues a service request to the given EDC.
    pub fn send_request(&mut self, edc_id: &str, service_id: &str, client_id: &str) {
        let (service_id, client_id, ap_id, gateway_id, edc_id, t_sent) =
            self.request_fields(edc_id, service_id, client_id);
        self.ctx.send(
            "requests",
            SrvRequest {
                service_id,
                client_id,
                ap_id,
                gateway_id,
                edc_id,
                t_sent,
            },
        );
    }

    /// Issues a close session request to the given EDC.
    pub fn close_session(&mut self, edc_id: &str, service_id: &str, client_id: &str) {
        let (service_id, client_id, ap_id, gateway_id, edc_id, t_sent) =
            self.request_fields(edc_id, service_id, client_id);
        self.ctx.send(
            "requests",
            CloseSessionRequest {
                service_id,
                client_id,
                ap_id,
                gateway_id,
                edc_id,
                t_sent,
            },
        );
    }

    /// Switches the mapping strategy of the given EDC.
    pub fn set_mapping(&mut self, edc_id: &str, mapping: &str) {
        self.ctx.send(
            "requests",
            NewEdcMapping {
                edc_id: edc_id.to_string(),
                mapping: mapping.to_string(),
            },
        );
    }

    /// Requests re-slicing of the given EDC to the new per-service demand targets.
    pub fn set_slicing(&mut self, edc_id: &str, slicing: IndexMap<String, u32>) {
        self.ctx.send(
            "requests",
            NewEdcSlicing {
                edc_id: edc_id.to_string(),
                slicing,
            },
        );
    }

    /// Returns the resource manager of the given EDC.
    pub fn resource_manager(&self, edc_id: &str) -> Rc<RefCell<ResourceManager>> {
        self.rms[edc_id].clone()
    }

    /// Returns the processing unit of the given EDC.
    pub fn pu(&self, edc_id: &str, pu_id: &str) -> Rc<RefCell<ProcessingUnit>> {
        self.pus[edc_id][pu_id].clone()
    }

    /// Returns all open session responses received by the client side.
    pub fn open_responses(&self) -> Vec<OpenSessionResponse> {
        self.sink.borrow().open_responses.clone()
    }

    /// Returns all service responses received by the client side.
    pub fn srv_responses(&self) -> Vec<SrvResponse> {
        self.sink.borrow().srv_responses.clone()
    }

    /// Returns all close session responses received by the client side.
    pub fn close_responses(&self) -> Vec<CloseSessionResponse> {
        self.sink.borrow().close_responses.clone()
    }

    /// Returns all EDC reports received by the client side.
    pub fn reports(&self) -> Vec<EdgeDataCenterReport> {
        self.sink.borrow().reports.clone()
    }

    /// Returns the open session requests escalated to the cloud.
    pub fn forwarded_opens(&self) -> Vec<OpenSessionRequest> {
        self.sink.borrow().forwarded_opens.clone()
    }

    /// Returns the service requests escalated to the cloud.
    pub fn forwarded_tasks(&self) -> Vec<SrvRequest> {
        self.sink.borrow().forwarded_tasks.clone()
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.engine.time()
    }

    /// Performs one engine cycle.
    pub fn step(&mut self) -> bool {
        self.engine.step()
    }

    /// Steps through the simulation until no pending activity is left.
    pub fn step_until_idle(&mut self) {
        self.engine.step_until_idle();
    }

    /// Steps through the simulation with duration limit.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.engine.step_for_duration(duration)
    }
}
