use clap::Parser;
use netdiag::cli::Cli;
use netdiag::ports::PortSpec;
use std::time::Duration;

#[test]
fn host_only_requests_nothing() {
    let cli = Cli::parse_from(["netdiag", "example.com"]);
    assert_eq!(cli.host, "example.com");
    let plan = cli.plan();
    assert!(!plan.ping && !plan.trace && plan.scan.is_none());
}

#[test]
fn short_flags() {
    let cli = Cli::parse_from(["netdiag", "10.0.0.1", "-p", "-s", "80,443,80", "-t"]);
    let plan = cli.plan();
    assert!(plan.ping);
    assert!(plan.trace);
    assert_eq!(plan.scan.unwrap().ports(), &[80, 443]);
}

#[test]
fn all_expands_to_default_ports() {
    let cli = Cli::parse_from(["netdiag", "--all", "host.lan"]);
    let plan = cli.plan();
    assert!(plan.ping && plan.trace);
    assert_eq!(plan.scan, Some(PortSpec::default_set()));
}

#[test]
fn scan_tuning_maps_onto_options() {
    let cli = Cli::parse_from([
        "netdiag",
        "host.lan",
        "--scan",
        "22",
        "--concurrency",
        "8",
        "--timeout-ms",
        "250",
        "--retries",
        "2",
        "--deadline-ms",
        "5000",
    ]);
    let o = cli.scan_options();
    assert_eq!(o.concurrency_limit, 8);
    assert_eq!(o.per_port_timeout, Duration::from_millis(250));
    assert_eq!(o.retry_count, 2);
    assert_eq!(o.scan_deadline, Some(Duration::from_secs(5)));
}

#[test]
fn defaults_match_scanner_defaults() {
    let cli = Cli::parse_from(["netdiag", "host.lan"]);
    assert_eq!(cli.scan_options(), netdiag::ScanOptions::default());
}

#[test]
fn bad_port_list_is_a_usage_error() {
    assert!(Cli::try_parse_from(["netdiag", "host", "-s", "80,99999"]).is_err());
    assert!(Cli::try_parse_from(["netdiag", "-p"]).is_err());
}
