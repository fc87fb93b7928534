//! Library crate for netdiag: host resolution, reachability, TCP port scanning and path tracing.
pub mod cli;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod tools;
pub mod types;

pub use error::DiagError;
pub use orchestrator::{Orchestrator, Plan, RunOutcome, StepOutcome};
pub use ports::PortSpec;
pub use scanner::{scan, scan_with, scan_with_cancel, Connector, ScanOptions, TcpConnector};
pub use types::{ProbeResult, ProbeStatus, ScanReport, Target};
