//! Blocking runner for external tools with a hard deadline.

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, sleep};
use std::time::{Duration, Instant};

use crate::error::ToolError;

/// Upper bound on any single external-tool invocation.
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run `program` with `args` and return its standard output.
///
/// Standard error is inherited, so tool diagnostics reach the daemon's
/// stderr while the tool runs. The child is killed once `timeout` elapses.
pub fn run_tool<I, S>(program: &str, args: I, timeout: Duration) -> Result<String, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let spawn_err = |source| ToolError::Spawn {
        program: program.to_string(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_err)?;

    // Drain stdout on its own thread so a chatty tool never blocks on a full pipe.
    let stdout = child.stdout.take();
    let (output_tx, output_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut stdout) = stdout {
            let _ = stdout.read_to_string(&mut buf);
        }
        let _ = output_tx.send(buf);
    });
    let timed_out = || ToolError::TimedOut {
        program: program.to_string(),
        after: timeout,
    };

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out());
            }
            Ok(None) => sleep(POLL_INTERVAL),
            Err(err) => {
                let _ = child.kill();
                return Err(spawn_err(err));
            }
        }
    };

    if !status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            status,
        });
    }

    // A background descendant may still hold stdout open after the tool exits.
    let remaining = deadline.saturating_duration_since(Instant::now());
    match output_rx.recv_timeout(remaining) {
        Ok(output) => Ok(output),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(timed_out()),
        Err(mpsc::RecvTimeoutError::Disconnected) => Ok(String::new()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_of_successful_tool() {
        let out = run_tool("sh", ["-c", "echo mounted"], Duration::from_secs(5)).unwrap();
        assert_eq!(out, "mounted\n");
    }

    #[test]
    fn non_zero_exit_is_failure() {
        let err = run_tool("sh", ["-c", "exit 3"], Duration::from_secs(5)).unwrap_err();
        match err {
            ToolError::Failed { program, status } => {
                assert_eq!(program, "sh");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected Failed, got {other}"),
        }
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = run_tool(
            "courier-no-such-tool",
            std::iter::empty::<&str>(),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }), "got: {err}");
    }

    #[test]
    fn background_child_holding_stdout_cannot_outlast_deadline() {
        let started = Instant::now();
        let err = run_tool("sh", ["-c", "sleep 3 & echo hi"], Duration::from_millis(200))
            .unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { .. }), "got: {err}");
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn hung_tool_is_killed_at_deadline() {
        let started = Instant::now();
        let err = run_tool("sh", ["-c", "exec sleep 30"], Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { .. }), "got: {err}");
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "runner must not wait for the hung tool"
        );
    }
}
