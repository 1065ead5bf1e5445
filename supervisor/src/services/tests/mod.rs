//! Service-specific tests
//!
//! Process handle, prober, and supervisor tests with shared fixtures.
//! Child processes are real `sh` scripts written to a temp directory;
//! the network side is stubbed with wiremock or mock probers.

mod supervisor;

// Common test utilities for services
pub mod common {
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::time::timeout;

    use crate::config::RecommenderConfig;
    use crate::services::process_handle::{ExitEvent, ProcessHandle};

    /// Write a shell script the supervisor can launch via `sh`
    pub fn script_entry(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create script");
        writeln!(file, "#!/bin/sh").expect("write shebang");
        writeln!(file, "{body}").expect("write script body");
        path
    }

    /// Supervisor config pointing at a scratch script, with short timers
    pub fn test_config(entry: &Path, dir: &TempDir) -> RecommenderConfig {
        RecommenderConfig::new(59999, entry)
            .with_runtime("sh")
            .with_working_dir(dir.path())
            .with_log_path(dir.path().join("recommender.log"))
            .with_startup_probe(Duration::from_millis(20), Duration::from_millis(250))
            .with_probe_timeout(Duration::from_millis(100))
            .with_stop_grace(Duration::from_millis(500))
    }

    /// Await the handle's exit event, bounded
    pub async fn wait_for_exit(handle: &ProcessHandle, wait: Duration) -> Option<ExitEvent> {
        let mut rx = handle.exit_events();
        timeout(wait, async move {
            loop {
                if let Some(event) = *rx.borrow() {
                    return event;
                }
                if rx.changed().await.is_err() {
                    return ExitEvent { code: None };
                }
            }
        })
        .await
        .ok()
    }

    /// Force-kill a process left running by a test
    #[cfg(unix)]
    pub fn force_kill(pid: u32) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}
