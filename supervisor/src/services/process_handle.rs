//! Child process wrapper for the companion recommender service
//!
//! Spawns exactly one OS process with its output captured into an
//! append-only log sink and reports its exit through a watch channel.
//! Spawn failures surface synchronously; post-spawn crashes are only
//! observable through the exit channel, never thrown at unrelated
//! callers.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{watch, Mutex};

use crate::error::{SupervisorError, SupervisorResult};

/// What to launch and where to sink its output
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
    pub log_path: PathBuf,
}

/// Exit observed for the child; `code` is `None` when killed by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitEvent {
    pub code: Option<i32>,
}

type LogSink = Arc<Mutex<File>>;

/// Handle to one spawned companion process
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    exit: watch::Receiver<Option<ExitEvent>>,
}

impl ProcessHandle {
    /// Spawn the process with piped stdout/stderr and a null stdin
    ///
    /// A missing executable or an OS refusal is reported here, before any
    /// state changes. Every captured output line is appended to the log
    /// sink, stream-tagged and timestamped.
    pub async fn spawn(spec: SpawnSpec) -> SupervisorResult<ProcessHandle> {
        let sink = open_log_sink(&spec.log_path).await?;

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SupervisorError::spawn(format!("{}: {e}", spec.program)))?;

        let pid = child.id().unwrap_or(0);
        write_line(&sink, "SYSTEM", &format!("spawned {} (pid {pid})", spec.program)).await;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_stream(stdout, "STDOUT", Arc::clone(&sink)));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_stream(stderr, "STDERR", Arc::clone(&sink)));
        }

        let (exit_tx, exit_rx) = watch::channel(None::<ExitEvent>);
        let waiter_sink = Arc::clone(&sink);
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!("Failed to wait on recommender process {pid}: {e}");
                    None
                }
            };
            write_line(&waiter_sink, "SYSTEM", &format!("process exited with code {code:?}")).await;
            let _ = exit_tx.send(Some(ExitEvent { code }));
        });

        Ok(ProcessHandle { pid, exit: exit_rx })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// True while no exit event has been observed
    pub fn is_alive(&self) -> bool {
        self.exit.borrow().is_none()
    }

    /// Channel that resolves to `Some` once the process exits
    pub fn exit_events(&self) -> watch::Receiver<Option<ExitEvent>> {
        self.exit.clone()
    }

    /// Request graceful termination (SIGTERM); never force-kills
    ///
    /// Callers bound their own wait for the exit event before considering
    /// the process stuck.
    pub fn terminate(&self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Err(e) = kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM) {
                tracing::warn!("Failed to signal recommender process {}: {e}", self.pid);
            }
        }
        #[cfg(not(unix))]
        tracing::warn!(
            "Graceful termination is not supported on this platform; process {} left running",
            self.pid
        );
    }
}

async fn open_log_sink(path: &Path) -> SupervisorResult<LogSink> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SupervisorError::spawn(format!("failed to create log directory: {e}")))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| SupervisorError::spawn(format!("failed to open log sink {}: {e}", path.display())))?;

    Ok(Arc::new(Mutex::new(file)))
}

async fn pump_stream<R>(stream: R, tag: &'static str, sink: LogSink)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        write_line(&sink, tag, &line).await;
    }
}

async fn write_line(sink: &LogSink, tag: &str, line: &str) {
    let stamped = format!(
        "[{}] [{}] {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        tag,
        line
    );

    let mut file = sink.lock().await;
    if let Err(e) = file.write_all(stamped.as_bytes()).await {
        tracing::warn!("Failed to write recommender log line: {e}");
    }
}
