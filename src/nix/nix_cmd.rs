use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Result, VisualizeError};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub(super) fn query_graph(package: &str, timeout: Duration) -> Result<String> {
    run_with_timeout("nix-store", &["-q", "--graph", package], package, timeout)
}

pub(super) fn run_with_timeout(
    program: &str,
    args: &[&str],
    package: &str,
    timeout: Duration,
) -> Result<String> {
    debug!(program, ?args, "spawning discovery command");

    let deadline = Instant::now() + timeout;
    let timed_out = || VisualizeError::DiscoveryTimeout {
        package: package.to_string(),
        seconds: timeout.as_secs(),
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| VisualizeError::DiscoveryFailure {
            package: package.to_string(),
            stderr: format!("failed to spawn {program}: {err}"),
        })?;

    // Drain both pipes off-thread so a large closure cannot block the child.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_until(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => {
            reap(&mut child);
            return Err(timed_out());
        }
        Err(err) => {
            reap(&mut child);
            return Err(VisualizeError::io(format!("failed waiting for {program}"), err));
        }
    };

    // A grandchild can keep the pipes open after the child exits.
    let stdout = collect_until(&stdout, deadline).ok_or_else(timed_out)?;
    let stderr = collect_until(&stderr, deadline).ok_or_else(timed_out)?;

    if status.success() {
        String::from_utf8(stdout).map_err(|_| VisualizeError::DiscoveryFailure {
            package: package.to_string(),
            stderr: format!("{program} output was not valid UTF-8"),
        })
    } else {
        Err(VisualizeError::DiscoveryFailure {
            package: package.to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim_end().to_string(),
        })
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        warn!("failed to kill discovery command: {err}");
    }
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    match pipe {
        Some(mut pipe) => {
            thread::spawn(move || {
                let mut buffer = Vec::new();
                let _ = pipe.read_to_end(&mut buffer);
                let _ = sender.send(buffer);
            });
        }
        None => {
            let _ = sender.send(Vec::new());
        }
    }
    receiver
}

fn collect_until(receiver: &Receiver<Vec<u8>>, deadline: Instant) -> Option<Vec<u8>> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match receiver.recv_timeout(remaining) {
        Ok(buffer) => Some(buffer),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn returns_stdout_on_success() {
        let output =
            run_with_timeout("sh", &["-c", "printf hello"], "pkg", Duration::from_secs(10));
        assert_eq!(output.unwrap(), "hello");
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let err = run_with_timeout(
            "sh",
            &["-c", "echo 'path is not valid' >&2; exit 1"],
            "/nix/store/bogus",
            Duration::from_secs(10),
        )
        .unwrap_err();

        match err {
            VisualizeError::DiscoveryFailure { package, stderr } => {
                assert_eq!(package, "/nix/store/bogus");
                assert_eq!(stderr, "path is not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn slow_command_times_out() {
        let err = run_with_timeout("sh", &["-c", "sleep 5"], "pkg", Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, VisualizeError::DiscoveryTimeout { .. }));
    }

    #[test]
    fn background_process_holding_stdout_times_out() {
        let started = Instant::now();
        let err = run_with_timeout(
            "sh",
            &["-c", "sleep 5 & echo hi"],
            "pkg",
            Duration::from_millis(200),
        )
        .unwrap_err();

        assert!(matches!(err, VisualizeError::DiscoveryTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn reap_kills_and_waits_for_a_running_child() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        reap(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn missing_program_is_a_discovery_failure() {
        let err = run_with_timeout(
            "definitely-not-a-real-binary-3f9a",
            &[],
            "pkg",
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, VisualizeError::DiscoveryFailure { .. }));
    }
}
