//! Host capability detection.
//!
//! Probes for a CUDA GPU or Apple Metal and for the engine binaries, then
//! defers the recommendation to [`select_backend`].

use crate::config::{FileEngineProcessConfig, FileEnginesConfig};
use medreason_domain::{
    AcceleratorKind, BackendKind, Eligibility, HostProbe, SystemProfile, fallback_eligibility,
    high_throughput_eligibility, select_backend,
};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Read-only capability detector with a cached host probe.
pub struct CapabilityDetector {
    engines: FileEnginesConfig,
    force: Option<String>,
    probe: OnceLock<HostProbe>,
}

impl CapabilityDetector {
    pub fn new(engines: FileEnginesConfig, force: Option<String>) -> Self {
        Self {
            engines,
            force,
            probe: OnceLock::new(),
        }
    }

    /// Detector over a fixed probe (no host access).
    pub fn with_probe(probe: HostProbe, force: Option<String>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(probe);
        Self {
            engines: FileEnginesConfig::default(),
            force,
            probe: cell,
        }
    }

    pub fn probe(&self) -> &HostProbe {
        self.probe.get_or_init(|| {
            let probe = HostProbe {
                accelerator: detect_accelerator(),
                high_throughput_engine: engine_available(&self.engines.high_throughput),
                fallback_engine: engine_available(&self.engines.fallback),
            };
            info!(
                "Host probe: accelerator={}, high_throughput_engine={}, fallback_engine={}",
                probe.accelerator, probe.high_throughput_engine, probe.fallback_engine
            );
            probe
        })
    }

    /// Run host detection on the blocking pool so async callers never
    /// wait on `nvidia-smi` or `PATH` lookups.
    pub async fn warm_up(self: &Arc<Self>) -> &HostProbe {
        if self.probe.get().is_none() {
            let detector = Arc::clone(self);
            if let Err(e) = tokio::task::spawn_blocking(move || {
                detector.probe();
            })
            .await
            {
                warn!("Host detection task failed: {}", e);
            }
        }
        self.probe()
    }

    /// Supported override, if any. Unsupported values are logged and ignored.
    pub fn forced_backend(&self) -> Option<BackendKind> {
        let raw = self.force.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let parsed = BackendKind::parse_override(raw);
        if parsed.is_none() {
            warn!("Ignoring unsupported backend override '{}'", raw);
        }
        parsed
    }

    pub fn detect(&self) -> SystemProfile {
        let profile = select_backend(self.probe(), self.forced_backend());
        debug!(
            "Recommended backend: {} (forced: {})",
            profile.recommended, profile.forced
        );
        profile
    }

    pub fn can_use_high_throughput(&self) -> Eligibility {
        high_throughput_eligibility(self.probe())
    }

    pub fn can_use_fallback(&self) -> Eligibility {
        fallback_eligibility(self.probe())
    }
}

/// An unmanaged engine is provisioned externally; a managed one needs its binary.
fn engine_available(engine: &FileEngineProcessConfig) -> bool {
    if !engine.managed {
        return true;
    }
    if engine.command.is_empty() {
        return false;
    }
    which::which(&engine.command).is_ok()
}

fn detect_accelerator() -> AcceleratorKind {
    if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
        return AcceleratorKind::AppleMetal;
    }
    if check_nvidia_gpu() {
        return AcceleratorKind::CudaGpu;
    }
    AcceleratorKind::None
}

/// A device node or an `nvidia-smi` that lists at least one GPU.
fn check_nvidia_gpu() -> bool {
    if Path::new("/dev/nvidia0").exists() {
        return true;
    }
    std::process::Command::new("nvidia-smi")
        .arg("--query-gpu=name")
        .arg("--format=csv,noheader")
        .output()
        .map(|output| output.status.success() && !output.stdout.is_empty())
        .unwrap_or(false)
}
