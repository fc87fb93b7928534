use crate::ports::PortSpec;
use crate::types::{ProbeResult, ProbeStatus, ScanReport, Target};
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{self, error::Elapsed, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ::time::{format_description::well_known, OffsetDateTime};

/// Upper bound on simultaneous connects regardless of configuration.
pub const MAX_CONCURRENCY: usize = 5_000;

/// Upper bound on extra attempts per port regardless of configuration.
pub const MAX_RETRIES: u32 = 10;

/// Knobs for a single scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Max in-flight connect attempts.
    pub concurrency_limit: usize,
    /// Deadline for one connect attempt.
    pub per_port_timeout: Duration,
    /// Extra attempts for ports that come back Filtered or Error.
    pub retry_count: u32,
    /// Overall deadline; expiry behaves like cancellation.
    pub scan_deadline: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: 100,
            per_port_timeout: Duration::from_secs(1),
            retry_count: 0,
            scan_deadline: None,
        }
    }
}

/// The TCP connect primitive used by the scanner.
///
/// Implementations only attempt the connection; deadlines are applied by the caller.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, addr: SocketAddr) -> io::Result<()>;
}

/// Plain tokio TCP connect. The stream is closed as soon as the handshake completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: SocketAddr) -> io::Result<()> {
        TcpStream::connect(addr).await.map(drop)
    }
}

/// Scan `ports` on `address` with real TCP connects.
pub async fn scan(address: IpAddr, ports: &PortSpec, options: &ScanOptions) -> ScanReport {
    scan_with(
        Arc::new(TcpConnector),
        address,
        ports,
        options,
        CancellationToken::new(),
    )
    .await
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
pub async fn scan_with_cancel(
    address: IpAddr,
    ports: &PortSpec,
    options: &ScanOptions,
    cancel: CancellationToken,
) -> ScanReport {
    scan_with(Arc::new(TcpConnector), address, ports, options, cancel).await
}

/// Scan using any `Connector`.
///
/// - Limits concurrent connect attempts using a `Semaphore`.
/// - Bounds every attempt with `tokio::time::timeout`.
/// - Each port owns one result slot, written at most once.
/// - Results come back in `ports` order, whatever order the probes finish in.
/// - On cancellation (token or `scan_deadline`) in-flight probes are aborted and the
///   report carries only completed ports with `partial` set.
pub async fn scan_with<C: Connector>(
    connector: Arc<C>,
    address: IpAddr,
    ports: &PortSpec,
    options: &ScanOptions,
    cancel: CancellationToken,
) -> ScanReport {
    let started = Instant::now();
    let started_at = now_iso_like();
    let ports = ports.ports();

    info!(%address, ports = ports.len(), concurrency = options.concurrency_limit, "starting scan");

    let slots: Arc<[OnceLock<ProbeResult>]> = ports.iter().map(|_| OnceLock::new()).collect();
    let sem = Arc::new(Semaphore::new(options.concurrency_limit.clamp(1, MAX_CONCURRENCY)));
    let deadline = options.scan_deadline.map(|d| started + d);
    let mut set = JoinSet::new();

    let interrupted = if ports.is_empty() {
        false
    } else {
        let drive = spawn_probes(
            &mut set,
            connector,
            address,
            ports,
            options,
            sem,
            slots.clone(),
        );
        tokio::select! {
            biased;
            _ = stop_signal(&cancel, deadline) => true,
            _ = drive => false,
        }
    };

    // Abort whatever is still running and wait for it to unwind.
    set.shutdown().await;

    let mut results = Vec::with_capacity(ports.len());
    for (slot, &port) in slots.iter().zip(ports) {
        match slot.get() {
            Some(r) => results.push(r.clone()),
            None if !interrupted => {
                // Only reachable when a probe task panicked.
                results.push(ProbeResult {
                    port,
                    status: ProbeStatus::Error,
                    latency: Duration::ZERO,
                    attempts: 0,
                    error_detail: Some("probe task failed".to_string()),
                });
            }
            None => {}
        }
    }

    let partial = results.len() < ports.len();
    if interrupted {
        warn!(completed = results.len(), requested = ports.len(), "scan interrupted");
    }

    let report = ScanReport {
        target: Target::new(address.to_string(), Some(address)),
        results,
        started_at,
        finished_at: now_iso_like(),
        total_duration: started.elapsed(),
        requested: ports.len(),
        partial,
    };
    info!(
        open = report.count(ProbeStatus::Open),
        elapsed_ms = report.total_duration.as_millis() as u64,
        partial,
        "scan finished"
    );
    report
}

async fn spawn_probes<C: Connector>(
    set: &mut JoinSet<()>,
    connector: Arc<C>,
    address: IpAddr,
    ports: &[u16],
    options: &ScanOptions,
    sem: Arc<Semaphore>,
    slots: Arc<[OnceLock<ProbeResult>]>,
) {
    for (idx, &port) in ports.iter().enumerate() {
        let permit = match sem.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let connector = connector.clone();
        let slots = slots.clone();
        let timeout = options.per_port_timeout;
        let retries = options.retry_count;

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes
            let result = probe_port(&*connector, SocketAddr::new(address, port), timeout, retries).await;
            if slots[idx].set(result).is_err() {
                warn!(port, "result already recorded; ignoring second outcome");
            }
        });
    }

    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            if e.is_panic() {
                warn!(error = %e, "probe task panicked");
            }
        }
    }
}

async fn stop_signal(cancel: &CancellationToken, deadline: Option<Instant>) {
    match deadline {
        Some(at) => {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = time::sleep_until(at) => debug!("scan deadline reached"),
            }
        }
        None => cancel.cancelled().await,
    }
}

/// Probe one socket address, retrying Filtered/Error outcomes up to `retries` times
/// (capped at `MAX_RETRIES`).
pub async fn probe_port<C: Connector + ?Sized>(
    connector: &C,
    addr: SocketAddr,
    timeout: Duration,
    retries: u32,
) -> ProbeResult {
    let retries = retries.min(MAX_RETRIES);
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let start = Instant::now();
        let outcome = time::timeout(timeout, connector.connect(addr)).await;
        let latency = start.elapsed();
        let (status, error_detail) = classify(outcome);

        if !status.is_retryable() || attempts > retries {
            debug!(port = addr.port(), %status, attempts, latency_ms = latency.as_millis() as u64, "probe done");
            return ProbeResult {
                port: addr.port(),
                status,
                latency,
                attempts,
                error_detail,
            };
        }
        debug!(port = addr.port(), %status, attempts, "retrying probe");
    }
}

/// Map a bounded connect outcome onto a port status.
pub fn classify(outcome: Result<io::Result<()>, Elapsed>) -> (ProbeStatus, Option<String>) {
    match outcome {
        Ok(Ok(())) => (ProbeStatus::Open, None),
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => (ProbeStatus::Closed, None),
        // The OS gave up waiting before we did.
        Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => {
            (ProbeStatus::Filtered, Some(e.to_string()))
        }
        Ok(Err(e)) => (ProbeStatus::Error, Some(e.to_string())),
        Err(_) => (ProbeStatus::Filtered, None),
    }
}

fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
