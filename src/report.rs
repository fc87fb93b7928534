//! Human-readable status lines and JSON export.

use crate::types::{ProbeResult, ProbeStatus, ScanReport, Target};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs::File;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

const BANNER: &str = r"
    _   __     __  ____  _
   / | / /__  / /_/ __ \(_)___ _____ _
  /  |/ / _ \/ __/ / / / / __ `/ __ `/
 / /|  /  __/ /_/ /_/ / / /_/ / /_/ /
/_/ |_/\___/\__/_____/_/\__,_/\__, /
                             /____/
        Network Diagnostic Tool";

pub fn banner() -> String {
    BANNER.blue().to_string()
}

pub fn resolving(host: &str) -> String {
    format!("[*] Resolving hostname '{host}'...").yellow().to_string()
}

pub fn resolution(target: &Target) -> String {
    match target.address {
        Some(ip) => format!("[+] '{}' resolved to IP address: {}", target.hostname, ip)
            .green()
            .to_string(),
        None => format!(
            "[-] Could not resolve '{}'. Some functions may fail.",
            target.hostname
        )
        .red()
        .to_string(),
    }
}

/// Printed when a step needs an address and none is available.
pub fn skipped(host: &str, step: &str) -> String {
    format!("[-] Cannot resolve hostname '{host}'. Aborting {step}.")
        .red()
        .to_string()
}

pub fn pinging(host: &str) -> String {
    format!("\n[*] Pinging {host}...").yellow().to_string()
}

pub fn reachability(reachable: bool) -> String {
    if reachable {
        "[+] Host is reachable.".green().to_string()
    } else {
        "[-] Host is unreachable.".red().to_string()
    }
}

pub fn step_failed(err: &dyn std::fmt::Display) -> String {
    format!("[-] {err}").red().to_string()
}

pub fn scan_header(host: &str, ip: IpAddr) -> String {
    format!("\n[*] Starting TCP port scan on {host} ({ip})...")
        .yellow()
        .to_string()
}

pub fn trace_header(host: &str, ip: IpAddr) -> String {
    format!("\n[*] Performing traceroute to {host} ({ip})...")
        .yellow()
        .to_string()
}

/// One status line for a port.
pub fn port_line(r: &ProbeResult) -> String {
    match r.status {
        ProbeStatus::Open => format!("[+] Port {}: Open ({} ms)", r.port, r.latency.as_millis())
            .green()
            .to_string(),
        ProbeStatus::Closed => format!("[-] Port {}: Closed", r.port),
        ProbeStatus::Filtered => format!("[?] Port {}: Filtered (no response)", r.port)
            .yellow()
            .to_string(),
        ProbeStatus::Error => format!(
            "[!] Port {}: Error ({})",
            r.port,
            r.error_detail.as_deref().unwrap_or("unknown error")
        )
        .red()
        .to_string(),
    }
}

/// Every line printed after a scan finishes, in order.
pub fn scan_lines(report: &ScanReport) -> Vec<String> {
    let mut lines: Vec<String> = report.results.iter().map(port_line).collect();

    if report.partial {
        lines.push(
            format!(
                "[!] Scan interrupted: {}/{} ports completed.",
                report.results.len(),
                report.requested
            )
            .red()
            .to_string(),
        );
    }

    lines.push(
        format!(
            "\n[*] Port scan completed in: {}",
            format_duration(report.total_duration)
        )
        .yellow()
        .to_string(),
    );

    let open = report.open_ports();
    if open.is_empty() {
        lines.push(
            "Summary: No open ports found in the specified list."
                .red()
                .to_string(),
        );
    } else {
        let list: Vec<String> = open.iter().map(u16::to_string).collect();
        lines.push(
            format!("Summary: Open ports found: {}", list.join(", "))
                .green()
                .to_string(),
        );
    }
    lines
}

pub fn format_duration(d: Duration) -> String {
    format!("{:.3}s", d.as_secs_f64())
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
