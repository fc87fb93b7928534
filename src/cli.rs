use crate::orchestrator::Plan;
use crate::ports::PortSpec;
use crate::scanner::ScanOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// netdiag: resolve a host, ping it, scan TCP ports and trace the route.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "netdiag",
    version,
    about = "A simple network diagnostic tool.",
    long_about = None,
    after_help = "Ports may be listed one by one or as ranges, e.g. '22,80,8000-8010'."
)]
pub struct Cli {
    /// The target host or IP address to diagnose.
    pub host: String,

    /// Perform a simple ping test.
    #[arg(short, long)]
    pub ping: bool,

    /// Perform a TCP port scan. Comma separated list of ports (e.g. '80,443,8080').
    #[arg(short, long, value_name = "PORTS")]
    pub scan: Option<PortSpec>,

    /// Perform a traceroute to the host.
    #[arg(short, long)]
    pub traceroute: bool,

    /// Run all diagnostic checks (ping, scan common ports, traceroute).
    #[arg(short, long)]
    pub all: bool,

    /// Max concurrent TCP connect attempts.
    #[arg(long, default_value_t = 100)]
    pub concurrency: usize,

    /// Per-port connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Extra attempts for ports that do not answer.
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Give up on the whole scan after this many milliseconds.
    #[arg(long = "deadline-ms")]
    pub deadline_ms: Option<u64>,

    /// Write scan results as pretty JSON to this path.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Do not print the startup banner.
    #[arg(long = "no-banner", default_value_t = false)]
    pub no_banner: bool,

    /// Disable ANSI colours.
    #[arg(long = "no-color", default_value_t = false)]
    pub no_color: bool,
}

impl Cli {
    /// Steps requested on the command line. `--all` wins over the individual flags.
    pub fn plan(&self) -> Plan {
        if self.all {
            return Plan::all();
        }
        Plan {
            ping: self.ping,
            scan: self.scan.clone(),
            trace: self.traceroute,
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            concurrency_limit: self.concurrency,
            per_port_timeout: Duration::from_millis(self.timeout_ms),
            retry_count: self.retries,
            scan_deadline: self.deadline_ms.map(Duration::from_millis),
        }
    }
}
