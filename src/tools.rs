//! Thin wrappers around the platform's `ping` and `traceroute` binaries.

use crate::error::DiagError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Which executables to run and how long a ping may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub ping_program: String,
    /// Flag preceding the echo count (`-c` or `-n`).
    pub ping_count_flag: String,
    pub ping_timeout: Duration,
    pub trace_program: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        if cfg!(windows) {
            Self {
                ping_program: "ping".into(),
                ping_count_flag: "-n".into(),
                ping_timeout: Duration::from_secs(10),
                trace_program: "tracert".into(),
            }
        } else {
            Self {
                ping_program: "ping".into(),
                ping_count_flag: "-c".into(),
                ping_timeout: Duration::from_secs(10),
                trace_program: "traceroute".into(),
            }
        }
    }
}

/// Result of a single echo round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reachability {
    pub reachable: bool,
    pub raw_output: String,
}

/// Send one echo request to `host` via the configured ping binary.
///
/// Stdout and stderr are merged line by line in arrival order. A non-zero
/// exit, or no exit within `ping_timeout`, counts as unreachable.
pub async fn probe_reachability(tools: &ToolConfig, host: &str) -> Result<Reachability, DiagError> {
    debug!(program = %tools.ping_program, host, "spawning reachability probe");
    let mut cmd = Command::new(&tools.ping_program);
    cmd.arg(&tools.ping_count_flag).arg("1").arg(host);
    let mut output = spawn_merged(&mut cmd, &tools.ping_program)?;

    let collect = async {
        let mut lines = Vec::new();
        while let Some(line) = output.next_line().await {
            lines.push(line);
        }
        let status = output.child.wait().await?;
        Ok::<_, std::io::Error>((lines, status))
    };

    match time::timeout(tools.ping_timeout, collect).await {
        Ok(Ok((lines, status))) => Ok(Reachability {
            reachable: status.success(),
            raw_output: lines.join("\n"),
        }),
        Ok(Err(e)) => Err(DiagError::Io(e)),
        Err(_) => {
            // `output` is dropped on return, which kills the child.
            warn!(host, timeout_ms = tools.ping_timeout.as_millis() as u64, "ping timed out");
            Ok(Reachability {
                reachable: false,
                raw_output: String::new(),
            })
        }
    }
}

/// Incremental output of a running path trace.
///
/// Stdout and stderr are merged line by line in arrival order. The child is
/// killed if this is dropped before the tool exits.
pub struct TraceLines {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl TraceLines {
    /// Next line of tool output, or `None` once the tool closed its pipes.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Like `next_line`, but returns `None` early when `cancel` fires.
    pub async fn next_line_or_cancel(&mut self, cancel: &CancellationToken) -> Option<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            line = self.lines.recv() => line,
        }
    }

    /// Wait for the tool to exit and report whether it succeeded.
    pub async fn finish(mut self) -> Result<bool, DiagError> {
        Ok(self.child.wait().await?.success())
    }
}

/// Start tracing the path to `host`.
pub async fn trace_path(tools: &ToolConfig, host: &str) -> Result<TraceLines, DiagError> {
    debug!(program = %tools.trace_program, host, "spawning path trace");
    let mut cmd = Command::new(&tools.trace_program);
    cmd.arg(host);
    spawn_merged(&mut cmd, &tools.trace_program)
}

/// Spawn `cmd` with stdout and stderr feeding one line channel.
fn spawn_merged(cmd: &mut Command, program: &str) -> Result<TraceLines, DiagError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DiagError::from_spawn(program, e))?;

    let (tx, rx) = mpsc::channel(64);
    if let Some(out) = child.stdout.take() {
        tokio::spawn(forward_lines(out, tx.clone()));
    }
    if let Some(err) = child.stderr.take() {
        tokio::spawn(forward_lines(err, tx));
    }

    Ok(TraceLines { child, lines: rx })
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "reading tool output failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(ping: &str, trace: &str) -> ToolConfig {
        ToolConfig {
            ping_program: ping.into(),
            trace_program: trace.into(),
            ..ToolConfig::default()
        }
    }

    #[tokio::test]
    async fn missing_ping_binary_is_tool_missing() {
        let err = probe_reachability(&tools("netdiag-no-such-ping", "x"), "localhost")
            .await
            .unwrap_err();
        assert!(matches!(err, DiagError::ToolMissing { ref tool } if tool == "netdiag-no-such-ping"));
    }

    #[tokio::test]
    async fn missing_trace_binary_is_tool_missing() {
        let res = trace_path(&tools("x", "netdiag-no-such-trace"), "localhost").await;
        assert!(matches!(res, Err(DiagError::ToolMissing { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_decides_reachability() {
        let up = probe_reachability(&tools("true", "x"), "localhost").await.unwrap();
        assert!(up.reachable);
        let down = probe_reachability(&tools("false", "x"), "localhost").await.unwrap();
        assert!(!down.reachable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ping_output_is_captured() {
        let r = probe_reachability(&tools("echo", "x"), "example.org").await.unwrap();
        assert!(r.reachable);
        assert_eq!(r.raw_output.trim(), "-c 1 example.org");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ping_output_includes_stderr() {
        // Runs `sh <script> 1 <host>`; the script writes to both streams.
        let script = std::env::temp_dir().join(format!("netdiag-ping-{}.sh", std::process::id()));
        std::fs::write(&script, "echo out-line\necho err-line >&2\nexit 3\n").unwrap();
        let cfg = ToolConfig {
            ping_program: "sh".into(),
            ping_count_flag: script.display().to_string(),
            ..ToolConfig::default()
        };

        let r = probe_reachability(&cfg, "localhost").await.unwrap();
        let _ = std::fs::remove_file(&script);

        assert!(!r.reachable);
        let lines: Vec<&str> = r.raw_output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&"out-line"));
        assert!(lines.contains(&"err-line"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn trace_streams_lines_until_exit() {
        let mut trace = trace_path(&tools("x", "echo"), "hop-one").await.unwrap();
        assert_eq!(trace.next_line().await.as_deref(), Some("hop-one"));
        assert_eq!(trace.next_line().await, None);
        assert!(trace.finish().await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn trace_can_be_cancelled() {
        // `sleep 30` prints nothing, so only cancellation ends the wait.
        let mut trace = trace_path(&tools("x", "sleep"), "30").await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(trace.next_line_or_cancel(&cancel).await, None);
    }
}
