//! Resource manager: maps session and request lifecycles onto the processing unit pool.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use indexmap::IndexMap;

use edgesim_core::{cast, log_debug, log_info, log_trace, log_warn, EntityContext, Message, TimedEntity};

use crate::core::common::RequestKey;
use crate::core::config::{cooling_model_resolver, temperature_model_resolver, EdcConfig, ServiceConfig};
use crate::core::cooler::Cooler;
use crate::core::events::control::{NewEdcMapping, NewEdcSlicing};
use crate::core::events::dispatch::{CloseSessionDispatch, OpenSessionDispatch, SetStandby, TaskDispatch};
use crate::core::events::reports::{EdgeDataCenterReport, ProcessingUnitReport, SliceReport};
use crate::core::events::requests::{CloseSessionRequest, OpenSessionRequest, SrvRequest};
use crate::core::events::responses::{CloseSessionResponse, OpenSessionResponse, SrvResponse};
use crate::core::mapping_strategy::{mapping_strategy_resolver, MappingStrategy, PuView};
use crate::core::pu::ProcessingUnit;
use crate::core::slicing::{ResourceSlicer, Slicing};

/// The EDC-level entity owning the processing unit pool, the active slicing, the mapping
/// strategy and the request routing table.
///
/// Incoming lifecycle requests are routed to a processing unit chosen within the service's
/// slice, falling back to the unassigned pool and finally to the configured parent server.
/// Responses bubbling up from the pool are forwarded to the issuing client, processing unit
/// reports are folded into the cooling model, and at most one EDC report is emitted per
/// activation, only when the state changed.
pub struct ResourceManager {
    edc_id: String,
    pus: BTreeMap<String, Rc<RefCell<ProcessingUnit>>>,
    /// Request routing table, (service, client) to the responsible processing unit.
    req_map: BTreeMap<RequestKey, String>,
    mapping: Box<dyn MappingStrategy>,
    cooler: Cooler,
    service_catalog: Rc<HashMap<String, ServiceConfig>>,
    hot_standby: bool,
    has_parent: bool,
    expected_slicing: IndexMap<String, u32>,
    slicing: Slicing,
    report_required: bool,
    ctx: EntityContext,
}

impl ResourceManager {
    /// Creates the resource manager and applies the initial slicing.
    ///
    /// The very first slicing application toggles standby instantaneously, skipping switch
    /// delays; later re-slicing requests go through the regular graceful path.
    pub fn new(
        config: &EdcConfig,
        pus: BTreeMap<String, Rc<RefCell<ProcessingUnit>>>,
        service_catalog: Rc<HashMap<String, ServiceConfig>>,
        ctx: EntityContext,
    ) -> Self {
        let mapping = mapping_strategy_resolver(&config.mapping);
        let cooler = Cooler::new(
            cooling_model_resolver(&config.cooling),
            temperature_model_resolver(&config.edc_temperature),
            config.rated_it_power,
        );
        let twins = pus.values().map(|pu| pu.borrow().twin()).collect();
        let slicing = ResourceSlicer::slice(&config.initial_slicing, twins, &*mapping);
        if config.hot_standby {
            for (pu_id, pu) in &pus {
                let standby = slicing.service_of(pu_id).is_some();
                pu.borrow_mut().set_standby_immediate(standby);
            }
        }
        Self {
            edc_id: config.id.clone(),
            pus,
            req_map: BTreeMap::new(),
            mapping,
            cooler,
            service_catalog,
            hot_standby: config.hot_standby,
            has_parent: config.parent.is_some(),
            expected_slicing: config.initial_slicing.clone(),
            slicing,
            report_required: false,
            ctx,
        }
    }

    pub fn slicing(&self) -> &Slicing {
        &self.slicing
    }

    /// Returns the processing unit currently responsible for the (service, client) pair.
    pub fn mapped_pu(&self, service_id: &str, client_id: &str) -> Option<String> {
        self.req_map.get(&RequestKey::new(service_id, client_id)).cloned()
    }

    /// Asks the mapping strategy for the best unit among the candidates.
    fn select_pu(&self, service_id: &str, candidates: &BTreeSet<String>) -> Option<String> {
        let borrows: Vec<std::cell::Ref<ProcessingUnit>> = candidates
            .iter()
            .filter_map(|pu_id| self.pus.get(pu_id))
            .map(|pu| pu.borrow())
            .collect();
        let views: Vec<&dyn PuView> = borrows.iter().map(|pu| &**pu as &dyn PuView).collect();
        self.mapping
            .map_task(service_id, &views)
            .map(|i| views[i].pu_id().to_string())
    }

    /// Picks a unit within the service's slice, falling back to the unassigned pool.
    fn find_pu(&self, service_id: &str) -> Option<String> {
        if let Some(slice) = self.slicing.slices.get(service_id) {
            if let Some(pu_id) = self.select_pu(service_id, &slice.pus) {
                return Some(pu_id);
            }
        }
        self.select_pu(service_id, &self.slicing.unassigned)
    }

    fn on_open_session_request(&mut self, now: f64, request: OpenSessionRequest) {
        let key = RequestKey::new(&request.service_id, &request.client_id);
        if !self.service_catalog.contains_key(&request.service_id) {
            self.ctx.send(
                "response",
                OpenSessionResponse {
                    request,
                    edc_id: None,
                    t: now,
                    trace: Some("unknown service".to_string()),
                },
            );
            return;
        }
        let pu_id = match self.req_map.get(&key) {
            Some(pu_id) => Some(pu_id.clone()),
            None => self.find_pu(&request.service_id),
        };
        match pu_id {
            Some(pu_id) => {
                log_debug!(
                    self.ctx,
                    "routing open session of `{}` for `{}` to `{}`",
                    request.service_id,
                    request.client_id,
                    pu_id
                );
                self.req_map.insert(key, pu_id.clone());
                self.ctx.send("dispatch", OpenSessionDispatch { pu_id, request });
            }
            None if self.has_parent => {
                log_debug!(
                    self.ctx,
                    "out of resources, forwarding open session of `{}` for `{}` upstream",
                    request.service_id,
                    request.client_id
                );
                self.ctx.send("cloud", request);
            }
            None => {
                self.ctx.send(
                    "response",
                    OpenSessionResponse {
                        request,
                        edc_id: None,
                        t: now,
                        trace: Some("out of resources".to_string()),
                    },
                );
            }
        }
    }

    fn on_srv_request(&mut self, now: f64, request: SrvRequest) {
        let reject = |ctx: &mut EntityContext, request: SrvRequest, trace: &str| {
            ctx.send(
                "response",
                SrvResponse {
                    request,
                    success: false,
                    t: now,
                    trace: Some(trace.to_string()),
                },
            );
        };
        let service = match self.service_catalog.get(&request.service_id) {
            Some(service) => service,
            None => {
                reject(&mut self.ctx, request, "unknown service");
                return;
            }
        };
        if service.session_required {
            // Session-bound requests fail fast when no session was opened.
            match self.req_map.get(&RequestKey::new(&request.service_id, &request.client_id)) {
                Some(pu_id) => {
                    let pu_id = pu_id.clone();
                    self.ctx.send("dispatch", TaskDispatch { pu_id, request });
                }
                None => reject(&mut self.ctx, request, "session not found"),
            }
            return;
        }
        match self.find_pu(&request.service_id) {
            Some(pu_id) => {
                log_debug!(
                    self.ctx,
                    "routing task of `{}` for `{}` to `{}`",
                    request.service_id,
                    request.client_id,
                    pu_id
                );
                self.ctx.send("dispatch", TaskDispatch { pu_id, request });
            }
            None if self.has_parent => {
                log_debug!(
                    self.ctx,
                    "out of resources, forwarding task of `{}` for `{}` upstream",
                    request.service_id,
                    request.client_id
                );
                self.ctx.send("cloud", request);
            }
            None => reject(&mut self.ctx, request, "out of resources"),
        }
    }

    fn on_close_session_request(&mut self, now: f64, request: CloseSessionRequest) {
        match self.req_map.get(&RequestKey::new(&request.service_id, &request.client_id)) {
            Some(pu_id) => {
                let pu_id = pu_id.clone();
                self.ctx.send("dispatch", CloseSessionDispatch { pu_id, request });
            }
            None => {
                self.ctx.send(
                    "response",
                    CloseSessionResponse {
                        request,
                        session_duration: -1.,
                        t: now,
                        trace: Some("session not found".to_string()),
                    },
                );
            }
        }
    }

    fn on_new_mapping(&mut self, mapping: String) {
        log_info!(self.ctx, "switching mapping strategy to `{}`", mapping);
        self.mapping = mapping_strategy_resolver(&mapping);
    }

    fn on_new_slicing(&mut self, expected: IndexMap<String, u32>) {
        let twins = self.pus.values().map(|pu| pu.borrow().twin()).collect();
        let slicing = ResourceSlicer::slice(&expected, twins, &*self.mapping);
        if slicing == self.slicing {
            log_debug!(self.ctx, "re-slicing produced no change, keeping current slicing");
            self.expected_slicing = expected;
            return;
        }
        for (service, slice) in &slicing.slices {
            if slice.congested() {
                log_warn!(
                    self.ctx,
                    "slice of `{}` covers only {} of {} expected units",
                    service,
                    slice.capacity,
                    slice.target
                );
            }
        }
        self.expected_slicing = expected;
        self.slicing = slicing;
        if self.hot_standby {
            for pu_id in self.pus.keys() {
                let standby = self.slicing.service_of(pu_id).is_some();
                self.ctx.send(
                    "dispatch",
                    SetStandby {
                        pu_id: pu_id.clone(),
                        standby,
                    },
                );
            }
        }
        self.report_required = true;
    }

    fn on_open_session_response(&mut self, response: OpenSessionResponse) {
        if !response.accepted() {
            let key = RequestKey::new(&response.request.service_id, &response.request.client_id);
            self.req_map.remove(&key);
        }
        self.ctx.send("response", response);
    }

    fn on_close_session_response(&mut self, response: CloseSessionResponse) {
        if response.accepted() {
            let key = RequestKey::new(&response.request.service_id, &response.request.client_id);
            self.req_map.remove(&key);
        }
        self.ctx.send("response", response);
    }

    fn build_report(&mut self) -> EdgeDataCenterReport {
        let it_power: f64 = self.pus.values().map(|pu| pu.borrow().power()).sum();
        let (cooling_power, edc_temperature) = self.cooler.update(it_power);

        let mut slices = Vec::new();
        for (service, slice) in &self.slicing.slices {
            let free = slice
                .pus
                .iter()
                .map(|pu_id| self.pus[pu_id].borrow().additional_capacity(service))
                .sum();
            slices.push(SliceReport {
                service: Some(service.clone()),
                target: slice.target,
                capacity: slice.capacity,
                free,
                congested: slice.congested(),
            });
        }
        let mut free_pool = SliceReport {
            service: None,
            target: 0,
            capacity: 0,
            free: 0,
            congested: false,
        };
        for pu_id in &self.slicing.unassigned {
            let pu = self.pus[pu_id].borrow();
            free_pool.capacity += pu.max_capacity_any();
            free_pool.free += pu.additional_capacity_any();
        }
        free_pool.congested = free_pool.free == 0;

        EdgeDataCenterReport {
            edc_id: self.edc_id.clone(),
            congested: free_pool.congested,
            slices,
            free_pool,
            it_power,
            cooling_power,
            pue: self.cooler.pue(),
            edc_temperature,
        }
    }
}

impl TimedEntity for ResourceManager {
    fn on_internal(&mut self, _now: f64) -> f64 {
        f64::INFINITY
    }

    fn on_external(&mut self, now: f64, _elapsed: f64, messages: Vec<Message>) -> f64 {
        for msg in messages {
            cast!(match msg.data {
                OpenSessionRequest {
                    service_id,
                    client_id,
                    ap_id,
                    gateway_id,
                    edc_id,
                    t_sent
                } => {
                    self.on_open_session_request(
                        now,
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
                SrvRequest {
                    service_id,
                    client_id,
                    ap_id,
                    gateway_id,
                    edc_id,
                    t_sent
                } => {
                    self.on_srv_request(
                        now,
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
                CloseSessionRequest {
                    service_id,
                    client_id,
                    ap_id,
                    gateway_id,
                    edc_id,
                    t_sent
                } => {
                    self.on_close_session_request(
                        now,
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
                NewEdcMapping { edc_id: _, mapping } => {
                    self.on_new_mapping(mapping);
                }
                NewEdcSlicing { edc_id: _, slicing } => {
                    self.on_new_slicing(slicing);
                }
                OpenSessionResponse { request, edc_id, t, trace } => {
                    self.on_open_session_response(OpenSessionResponse {
                        request,
                        edc_id,
                        t,
                        trace,
                    });
                }
                SrvResponse { request, success, t, trace } => {
                    self.ctx.send(
                        "response",
                        SrvResponse {
                            request,
                            success,
                            t,
                            trace,
                        },
                    );
                }
                CloseSessionResponse { request, session_duration, t, trace } => {
                    self.on_close_session_response(CloseSessionResponse {
                        request,
                        session_duration,
                        t,
                        trace,
                    });
                }
                ProcessingUnitReport { pu_id, .. } => {
                    log_trace!(self.ctx, "received state update from `{}`", pu_id);
                    self.report_required = true;
                }
            })
        }
        if self.report_required {
            let report = self.build_report();
            self.ctx.send("report", report);
            self.report_required = false;
        }
        f64::INFINITY
    }
}
