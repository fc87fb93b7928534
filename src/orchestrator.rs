//! Runs the requested diagnostics in a fixed order: resolve, ping, scan, trace.
//!
//! A failed lookup never aborts the run. Ping still goes ahead with the raw
//! hostname, since the ping tool resolves on its own. Scan and trace need an
//! address and are skipped with a message instead. Every step failure is
//! printed and recorded in the returned [`RunOutcome`]; nothing propagates.

use crate::error::DiagError;
use crate::ports::PortSpec;
use crate::report;
use crate::resolver::{resolve_target, Resolver, SystemResolver};
use crate::scanner::{self, Connector, ScanOptions, TcpConnector};
use crate::tools::{self, Reachability, ToolConfig};
use crate::types::{ScanReport, Target};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which steps to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub ping: bool,
    pub scan: Option<PortSpec>,
    pub trace: bool,
}

impl Plan {
    /// Ping, scan the default port set, then trace.
    pub fn all() -> Self {
        Self {
            ping: true,
            scan: Some(PortSpec::default_set()),
            trace: true,
        }
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    Completed(T),
    /// Not attempted; carries the reason.
    Skipped(String),
    /// Attempted and failed; carries the error text.
    Failed(String),
}

impl<T> StepOutcome<T> {
    pub fn completed(&self) -> Option<&T> {
        match self {
            StepOutcome::Completed(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::Skipped(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSummary {
    pub lines: usize,
    pub exited_ok: bool,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub target: Target,
    pub ping: Option<StepOutcome<Reachability>>,
    pub scan: Option<StepOutcome<ScanReport>>,
    pub trace: Option<StepOutcome<TraceSummary>>,
}

pub struct Orchestrator<R, C> {
    resolver: R,
    connector: Arc<C>,
    tools: ToolConfig,
    scan_options: ScanOptions,
    output: Option<PathBuf>,
    cancel: CancellationToken,
}

impl Orchestrator<SystemResolver, TcpConnector> {
    /// Real resolver, real TCP connects, platform tools.
    pub fn system() -> Self {
        Self::new(SystemResolver, TcpConnector)
    }
}

impl<R: Resolver, C: Connector> Orchestrator<R, C> {
    pub fn new(resolver: R, connector: C) -> Self {
        Self {
            resolver,
            connector: Arc::new(connector),
            tools: ToolConfig::default(),
            scan_options: ScanOptions::default(),
            output: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_tools(mut self, tools: ToolConfig) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.scan_options = options;
        self
    }

    /// Also write each scan report as JSON to `path`.
    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.output = path;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, host: &str, plan: &Plan) -> RunOutcome {
        println!("{}", report::resolving(host));
        let target = resolve_target(&self.resolver, host).await;
        println!("{}", report::resolution(&target));

        let ping = if plan.ping {
            Some(self.ping_step(&target).await)
        } else {
            None
        };
        let scan = match &plan.scan {
            Some(ports) => Some(self.scan_step(&target, ports).await),
            None => None,
        };
        let trace = if plan.trace {
            Some(self.trace_step(&target).await)
        } else {
            None
        };

        RunOutcome {
            target,
            ping,
            scan,
            trace,
        }
    }

    fn interrupted<T>(&self, step: &str) -> Option<StepOutcome<T>> {
        if self.cancel.is_cancelled() {
            info!(step, "skipping step after cancellation");
            Some(StepOutcome::Skipped("cancelled".into()))
        } else {
            None
        }
    }

    async fn ping_step(&self, target: &Target) -> StepOutcome<Reachability> {
        if let Some(skip) = self.interrupted("ping") {
            return skip;
        }
        println!("{}", report::pinging(&target.hostname));
        // Losing the race drops the ping future, which kills the child.
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("ping cancelled");
                return StepOutcome::Skipped("cancelled".into());
            }
            r = tools::probe_reachability(&self.tools, &target.hostname) => r,
        };
        match outcome {
            Ok(r) => {
                println!("{}", report::reachability(r.reachable));
                if r.reachable {
                    println!("{}", r.raw_output);
                }
                StepOutcome::Completed(r)
            }
            Err(e) => fail(e),
        }
    }

    async fn scan_step(&self, target: &Target, ports: &PortSpec) -> StepOutcome<ScanReport> {
        if let Some(skip) = self.interrupted("scan") {
            return skip;
        }
        let Some(ip) = target.address else {
            println!("{}", report::skipped(&target.hostname, "port scan"));
            return StepOutcome::Skipped(format!("'{}' did not resolve", target.hostname));
        };

        println!("{}", report::scan_header(&target.hostname, ip));
        let mut scan_report = scanner::scan_with(
            self.connector.clone(),
            ip,
            ports,
            &self.scan_options,
            self.cancel.clone(),
        )
        .await;
        scan_report.target = target.clone();

        for line in report::scan_lines(&scan_report) {
            println!("{line}");
        }

        if let Some(path) = &self.output {
            match report::write_report_json(path, &scan_report) {
                Ok(()) => println!("Wrote JSON results to {}", path.display()),
                Err(e) => {
                    warn!(error = %e, "json export failed");
                    eprintln!("Failed to write JSON to {}: {:#}", path.display(), e);
                }
            }
        }
        StepOutcome::Completed(scan_report)
    }

    async fn trace_step(&self, target: &Target) -> StepOutcome<TraceSummary> {
        if let Some(skip) = self.interrupted("trace") {
            return skip;
        }
        let Some(ip) = target.address else {
            println!("{}", report::skipped(&target.hostname, "traceroute"));
            return StepOutcome::Skipped(format!("'{}' did not resolve", target.hostname));
        };

        println!("{}", report::trace_header(&target.hostname, ip));
        let mut trace = match tools::trace_path(&self.tools, &target.hostname).await {
            Ok(t) => t,
            Err(e) => return fail(e),
        };

        let mut lines = 0usize;
        while let Some(line) = trace.next_line_or_cancel(&self.cancel).await {
            println!("{line}");
            lines += 1;
        }

        if self.cancel.is_cancelled() {
            warn!(lines, "traceroute cancelled");
            // Dropping `trace` kills the tool.
            return StepOutcome::Completed(TraceSummary {
                lines,
                exited_ok: false,
                cancelled: true,
            });
        }

        match trace.finish().await {
            Ok(exited_ok) => StepOutcome::Completed(TraceSummary {
                lines,
                exited_ok,
                cancelled: false,
            }),
            Err(e) => fail(e),
        }
    }
}

fn fail<T>(e: DiagError) -> StepOutcome<T> {
    println!("{}", report::step_failed(&e));
    StepOutcome::Failed(e.to_string())
}
