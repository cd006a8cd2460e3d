//! Engine process supervision.
//!
//! A managed engine is spawned as a child process whose output lines feed
//! the [`ProgressMonitor`]. Both managed and external engines are polled on
//! `GET /health` until they answer; the resulting [`Readiness`] is published
//! on a watch channel that handlers wait on before generating.

use crate::engines::error::EngineError;
use medreason_application::{HandlerError, ProgressMonitor, Readiness};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace, warn};

/// Timeout for a single health probe.
const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to bring one engine endpoint up.
#[derive(Debug, Clone)]
pub struct EngineSpec {
    /// Short name for logs, e.g. `vllm:Qwen/Qwen2.5-Coder-7B`.
    pub label: String,
    pub command: String,
    pub args: Vec<String>,
    pub base_url: String,
    pub managed: bool,
    pub load_timeout: Duration,
    pub health_interval: Duration,
}

impl EngineSpec {
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

/// A running (or loading) engine endpoint.
///
/// Dropping the handle stops supervision and kills a managed child process.
pub struct EngineHandle {
    base_url: String,
    readiness: watch::Receiver<Readiness>,
    _stop: DropGuard,
}

impl EngineHandle {
    /// Spawn (when managed) and start supervising an engine.
    ///
    /// Returns as soon as the process is running; loading continues in the
    /// background.
    pub fn start(
        spec: EngineSpec,
        client: reqwest::Client,
        monitor: Arc<ProgressMonitor>,
    ) -> Result<Self, EngineError> {
        let child = if spec.managed {
            if !monitor.is_loading() {
                monitor.reset();
            }
            Some(spawn_engine(&spec, &monitor)?)
        } else {
            debug!("Using external engine at {}", spec.base_url);
            None
        };

        let (tx, rx) = watch::channel(Readiness::Loading);
        let cancel = CancellationToken::new();
        let base_url = spec.base_url.clone();

        tokio::spawn(supervise(spec, child, client, monitor, tx, cancel.clone()));

        Ok(Self {
            base_url,
            readiness: rx,
            _stop: cancel.drop_guard(),
        })
    }

    /// Handle over an externally driven readiness channel.
    #[cfg(test)]
    pub(crate) fn detached(base_url: &str, readiness: watch::Receiver<Readiness>) -> Self {
        Self {
            base_url: base_url.to_string(),
            readiness,
            _stop: CancellationToken::new().drop_guard(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.borrow().clone()
    }

    /// Wait until the engine is ready or has failed to load.
    pub async fn wait_ready(&self) -> Result<(), HandlerError> {
        let mut rx = self.readiness.clone();
        loop {
            match &*rx.borrow_and_update() {
                Readiness::Ready => return Ok(()),
                Readiness::Failed(reason) => return Err(HandlerError::LoadFailed(reason.clone())),
                Readiness::Loading => {}
            }
            if rx.changed().await.is_err() {
                return Err(HandlerError::LoadFailed(
                    "engine supervisor stopped".to_string(),
                ));
            }
        }
    }
}

fn spawn_engine(spec: &EngineSpec, monitor: &Arc<ProgressMonitor>) -> Result<Child, EngineError> {
    info!("Launching {}: {} {}", spec.label, spec.command, spec.args.join(" "));

    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Linux: SIGTERM the engine if this process dies without running Drop.
    #[cfg(target_os = "linux")]
    unsafe {
        cmd.pre_exec(|| {
            libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
            Ok(())
        });
    }

    let mut child = cmd.spawn()?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(scan_output(stdout, Arc::clone(monitor), spec.label.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(scan_output(stderr, Arc::clone(monitor), spec.label.clone()));
    }

    Ok(child)
}

/// Feed every output line to the progress scanner.
async fn scan_output<R>(stream: R, monitor: Arc<ProgressMonitor>, label: String)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                trace!("[{}] {}", label, line);
                monitor.scan_line(&line);
            }
            Ok(None) => break,
            Err(e) => {
                debug!("[{}] output stream error: {}", label, e);
                break;
            }
        }
    }
}

async fn wait_child(child: &mut Option<Child>) -> String {
    match child {
        Some(child) => match child.wait().await {
            Ok(status) => status.to_string(),
            Err(e) => e.to_string(),
        },
        None => std::future::pending().await,
    }
}

async fn is_healthy(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).timeout(HEALTH_REQUEST_TIMEOUT).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            trace!("Health probe {} failed: {}", url, e);
            false
        }
    }
}

async fn wait_healthy(
    client: &reqwest::Client,
    url: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<(), EngineError> {
    let poll = async {
        while !is_healthy(client, url).await {
            tokio::time::sleep(interval).await;
        }
    };
    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| EngineError::Timeout(timeout))
}

async fn supervise(
    spec: EngineSpec,
    mut child: Option<Child>,
    client: reqwest::Client,
    monitor: Arc<ProgressMonitor>,
    tx: watch::Sender<Readiness>,
    cancel: CancellationToken,
) {
    let health_url = spec.health_url();

    let loaded = tokio::select! {
        _ = cancel.cancelled() => return,
        status = wait_child(&mut child) => Err(EngineError::Exited(status)),
        result = wait_healthy(&client, &health_url, spec.health_interval, spec.load_timeout) => result,
    };

    match loaded {
        Ok(()) => {
            info!("{} is ready at {}", spec.label, spec.base_url);
            monitor.mark_loading_complete();
            let _ = tx.send(Readiness::Ready);
        }
        Err(e) => {
            warn!("{} failed to load: {}", spec.label, e);
            monitor.reset();
            let _ = tx.send(Readiness::Failed(e.to_string()));
            return;
        }
    }

    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Stopping {}", spec.label);
        }
        status = wait_child(&mut child) => {
            warn!("{} exited: {}", spec.label, status);
            monitor.reset();
            let _ = tx.send(Readiness::Failed(format!("engine exited: {}", status)));
        }
    }
}
