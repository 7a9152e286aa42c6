//! Per-request context carried through every call.

use std::{
    fmt,
    net::IpAddr,
    time::Instant,
};

/// Immutable context of one inbound rpc call.
///
/// Created at the transport boundary and threaded through every layer; used
/// for log correlation, cache-key scoping and limiter lookups. The masked ip
/// is what reaches log output, the raw ip only ever feeds plan lookups.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id of the request.
    pub request_id: String,
    /// Ip the request arrived from, when the transport knows it.
    pub client_ip: Option<IpAddr>,
    /// Log-safe rendering of `client_ip`.
    pub masked_client_ip: String,
    /// When the request entered the relay.
    pub arrival_time: Instant,
}

// === impl RequestContext ===

impl RequestContext {
    /// Creates a context for a request arriving now.
    pub fn new(request_id: String, client_ip: Option<IpAddr>) -> Self {
        let masked_client_ip = client_ip.map(mask_ip).unwrap_or_else(|| "unknown".to_owned());
        Self { request_id, client_ip, masked_client_ip, arrival_time: Instant::now() }
    }

    /// Elapsed wall time since the request arrived.
    pub fn elapsed(&self) -> std::time::Duration {
        self.arrival_time.elapsed()
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]", self.request_id, self.masked_client_ip)
    }
}

/// Masks the host part of an address for logging.
fn mask_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            format!("{a}.{b}.{c}.xxx")
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            format!("{:x}:{:x}:{:x}::xxxx", segments[0], segments[1], segments[2])
        }
    }
}
