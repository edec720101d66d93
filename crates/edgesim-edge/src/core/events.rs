//! Messages exchanged with and within an edge data center.

// CLIENT REQUESTS /////////////////////////////////////////////////////////////////////////////////

pub mod requests {
    use serde::Serialize;

    #[derive(Serialize, Clone, Debug)]
    pub struct OpenSessionRequest {
        pub service_id: String,
        pub client_id: String,
        pub ap_id: String,
        pub gateway_id: String,
        pub edc_id: String,
        pub t_sent: f64,
    }

    #[derive(Serialize, Clone, Debug)]
    pub struct SrvRequest {
        pub service_id: String,
        pub client_id: String,
        pub ap_id: String,
        pub gateway_id: String,
        pub edc_id: String,
        pub t_sent: f64,
    }

    #[derive(Serialize, Clone, Debug)]
    pub struct CloseSessionRequest {
        pub service_id: String,
        pub client_id: String,
        pub ap_id: String,
        pub gateway_id: String,
        pub edc_id: String,
        pub t_sent: f64,
    }
}

// CLIENT RESPONSES ////////////////////////////////////////////////////////////////////////////////

pub mod responses {
    use serde::Serialize;

    use super::requests::{CloseSessionRequest, OpenSessionRequest, SrvRequest};

    #[derive(Serialize, Clone, Debug)]
    pub struct OpenSessionResponse {
        pub request: OpenSessionRequest,
        /// EDC that accepted the session, `None` on rejection.
        pub edc_id: Option<String>,
        pub t: f64,
        pub trace: Option<String>,
    }

    impl OpenSessionResponse {
        pub fn accepted(&self) -> bool {
            self.edc_id.is_some()
        }
    }

    #[derive(Serialize, Clone, Debug)]
    pub struct SrvResponse {
        pub request: SrvRequest,
        pub success: bool,
        pub t: f64,
        pub trace: Option<String>,
    }

    #[derive(Serialize, Clone, Debug)]
    pub struct CloseSessionResponse {
        pub request: CloseSessionRequest,
        /// Duration of the closed session, negative on rejection.
        pub session_duration: f64,
        pub t: f64,
        pub trace: Option<String>,
    }

    impl CloseSessionResponse {
        pub fn accepted(&self) -> bool {
            self.session_duration >= 0.
        }
    }
}

// CONFIGURATION DIRECTIVES ////////////////////////////////////////////////////////////////////////

pub mod control {
    use indexmap::IndexMap;
    use serde::Serialize;

    /// Switches the mapping strategy of an EDC; takes effect immediately.
    #[derive(Serialize, Clone, Debug)]
    pub struct NewEdcMapping {
        pub edc_id: String,
        /// Strategy id of the `Name[option=value,...]` form.
        pub mapping: String,
    }

    /// Requests re-slicing of the EDC pool to the given per-service demand targets.
    ///
    /// Services are reserved in the iteration order of the map.
    #[derive(Serialize, Clone, Debug)]
    pub struct NewEdcSlicing {
        pub edc_id: String,
        pub slicing: IndexMap<String, u32>,
    }
}

// DISPATCH BETWEEN RESOURCE MANAGER AND PROCESSING UNITS //////////////////////////////////////////

pub mod dispatch {
    use serde::Serialize;

    use super::requests::{CloseSessionRequest, OpenSessionRequest, SrvRequest};

    #[derive(Serialize, Clone, Debug)]
    pub struct OpenSessionDispatch {
        pub pu_id: String,
        pub request: OpenSessionRequest,
    }

    #[derive(Serialize, Clone, Debug)]
    pub struct TaskDispatch {
        pub pu_id: String,
        pub request: SrvRequest,
    }

    #[derive(Serialize, Clone, Debug)]
    pub struct CloseSessionDispatch {
        pub pu_id: String,
        pub request: CloseSessionRequest,
    }

    /// Toggles hot standby of a processing unit, honoring its switching delays.
    #[derive(Serialize, Clone, Debug)]
    pub struct SetStandby {
        pub pu_id: String,
        pub standby: bool,
    }
}

// MONITORING REPORTS //////////////////////////////////////////////////////////////////////////////

pub mod reports {
    use serde::Serialize;

    /// Capacity accounting of one slice, or of the unassigned pool when `service` is `None`.
    #[derive(Serialize, Clone, Debug)]
    pub struct SliceReport {
        pub service: Option<String>,
        /// Demand target the slice was created for.
        pub target: u32,
        /// Total capacity of the processing units reserved for the slice.
        pub capacity: u32,
        /// Capacity still available on the slice's processing units.
        pub free: u32,
        /// Set when the reserved capacity does not cover the demand target.
        pub congested: bool,
    }

    #[derive(Serialize, Clone, Debug)]
    pub struct EdgeDataCenterReport {
        pub edc_id: String,
        pub slices: Vec<SliceReport>,
        /// Accounting of the unassigned processing unit pool.
        pub free_pool: SliceReport,
        /// Set when the unassigned pool has no capacity left for any service.
        pub congested: bool,
        pub it_power: f64,
        pub cooling_power: f64,
        pub pue: f64,
        pub edc_temperature: f64,
    }

    #[derive(Serialize, Clone, Debug)]
    pub struct ProcessingUnitReport {
        pub edc_id: String,
        pub pu_id: String,
        pub pu_type: String,
        pub status: String,
        pub bound_service: Option<String>,
        pub n_sessions: u32,
        /// Remaining capacity for the bound service, or the best empty-state capacity when idle.
        pub capacity: u32,
        pub queue_time: f64,
        pub power: f64,
        pub temperature: f64,
    }
}
