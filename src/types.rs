use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// A host as named by the user, plus the address it resolved to (if any).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub hostname: String,
    pub address: Option<IpAddr>,
}

impl Target {
    pub fn new(hostname: impl Into<String>, address: Option<IpAddr>) -> Self {
        Self {
            hostname: hostname.into(),
            address,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(ip) if ip.to_string() != self.hostname => write!(f, "{} ({})", self.hostname, ip),
            _ => f.write_str(&self.hostname),
        }
    }
}

/// Classification of a single TCP connect probe.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Handshake completed.
    Open,
    /// Connection actively refused.
    Closed,
    /// No answer before the per-port deadline.
    Filtered,
    /// Any other transport failure.
    Error,
}

impl ProbeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeStatus::Open => "Open",
            ProbeStatus::Closed => "Closed",
            ProbeStatus::Filtered => "Filtered",
            ProbeStatus::Error => "Error",
        }
    }

    /// Whether another attempt could change the outcome.
    pub fn is_retryable(self) -> bool {
        matches!(self, ProbeStatus::Filtered | ProbeStatus::Error)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one port.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub port: u16,
    pub status: ProbeStatus,
    #[serde(rename = "latency_ms", serialize_with = "duration_ms")]
    pub latency: Duration,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Ordered results of a scan plus timing.
#[derive(Serialize, Debug, Clone)]
pub struct ScanReport {
    pub target: Target,
    pub results: Vec<ProbeResult>,
    pub started_at: String,
    pub finished_at: String,
    #[serde(rename = "total_duration_ms", serialize_with = "duration_ms")]
    pub total_duration: Duration,
    /// Number of distinct ports requested.
    pub requested: usize,
    /// Set when the scan was cancelled before every port reported.
    pub partial: bool,
}

impl ScanReport {
    /// Open ports, in input order.
    pub fn open_ports(&self) -> Vec<u16> {
        self.results
            .iter()
            .filter(|r| r.status == ProbeStatus::Open)
            .map(|r| r.port)
            .collect()
    }

    pub fn count(&self, status: ProbeStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn result_for(&self, port: u16) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.port == port)
    }
}

fn duration_ms<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn result(port: u16, status: ProbeStatus) -> ProbeResult {
        ProbeResult {
            port,
            status,
            latency: Duration::from_millis(3),
            attempts: 1,
            error_detail: None,
        }
    }

    #[test]
    fn open_ports_keep_report_order() {
        let report = ScanReport {
            target: Target::new("localhost", Some(IpAddr::V4(Ipv4Addr::LOCALHOST))),
            results: vec![
                result(8080, ProbeStatus::Open),
                result(22, ProbeStatus::Closed),
                result(80, ProbeStatus::Open),
            ],
            started_at: String::new(),
            finished_at: String::new(),
            total_duration: Duration::ZERO,
            requested: 3,
            partial: false,
        };
        assert_eq!(report.open_ports(), vec![8080, 80]);
        assert_eq!(report.count(ProbeStatus::Closed), 1);
        assert_eq!(report.result_for(22).map(|r| r.status), Some(ProbeStatus::Closed));
    }

    #[test]
    fn probe_result_serializes_latency_as_millis() {
        let json = serde_json::to_value(result(443, ProbeStatus::Filtered)).unwrap();
        assert_eq!(json["latency_ms"], 3);
        assert_eq!(json["status"], "filtered");
        assert!(json.get("error_detail").is_none());
    }

    #[test]
    fn target_display_shows_address_once() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(Target::new("gw.lan", Some(ip)).to_string(), "gw.lan (10.0.0.1)");
        assert_eq!(Target::new("10.0.0.1", Some(ip)).to_string(), "10.0.0.1");
        assert_eq!(Target::new("nowhere", None).to_string(), "nowhere");
    }
}
