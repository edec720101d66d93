use serde::Serialize;

/// Identifies the stream of requests exchanged between one client and one service.
///
/// Used as the key of the request routing table of the resource manager.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestKey {
    pub service_id: String,
    pub client_id: String,
}

impl RequestKey {
    pub fn new(service_id: &str, client_id: &str) -> Self {
        Self {
            service_id: service_id.to_string(),
            client_id: client_id.to_string(),
        }
    }
}
