//! Inference backend selection.
//!
//! Host probing happens in infrastructure; this module turns the probe
//! result into a [`SystemProfile`] with a pure function so selection can be
//! tested without hardware.

use serde::{Deserialize, Serialize};

/// Accelerator present on the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorKind {
    #[default]
    None,
    CudaGpu,
    AppleMetal,
}

impl AcceleratorKind {
    /// Discrete accelerator suitable for batched generation.
    pub fn is_discrete(&self) -> bool {
        matches!(self, AcceleratorKind::CudaGpu)
    }
}

impl std::fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AcceleratorKind::None => "none",
            AcceleratorKind::CudaGpu => "cuda_gpu",
            AcceleratorKind::AppleMetal => "apple_metal",
        };
        write!(f, "{}", s)
    }
}

/// Backend recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    HighThroughput,
    Fallback,
    Cpu,
}

impl BackendKind {
    /// Parse an override value. Unsupported names yield `None`.
    pub fn parse_override(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high_throughput" | "high-throughput" | "vllm" => Some(BackendKind::HighThroughput),
            "fallback" | "transformers" | "llama" | "llama.cpp" => Some(BackendKind::Fallback),
            "cpu" => Some(BackendKind::Cpu),
            _ => None,
        }
    }

    /// Handler variant that serves this recommendation.
    pub fn variant(&self) -> HandlerVariant {
        match self {
            BackendKind::HighThroughput => HandlerVariant::HighThroughput,
            BackendKind::Fallback | BackendKind::Cpu => HandlerVariant::Fallback,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendKind::HighThroughput => "high_throughput",
            BackendKind::Fallback => "fallback",
            BackendKind::Cpu => "cpu",
        };
        write!(f, "{}", s)
    }
}

/// The two interchangeable model handler implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerVariant {
    HighThroughput,
    Fallback,
}

impl HandlerVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerVariant::HighThroughput => "high_throughput",
            HandlerVariant::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for HandlerVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw facts gathered about the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostProbe {
    pub accelerator: AcceleratorKind,
    /// High-throughput engine binary or endpoint available.
    pub high_throughput_engine: bool,
    /// Fallback engine binary or endpoint available.
    pub fallback_engine: bool,
}

/// Detection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemProfile {
    pub accelerator: AcceleratorKind,
    pub recommended: BackendKind,
    /// True when an override chose the recommendation.
    #[serde(default)]
    pub forced: bool,
}

/// Whether a handler variant can run here, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub usable: bool,
    pub reason: String,
}

impl Eligibility {
    pub fn yes(reason: impl Into<String>) -> Self {
        Self {
            usable: true,
            reason: reason.into(),
        }
    }

    pub fn no(reason: impl Into<String>) -> Self {
        Self {
            usable: false,
            reason: reason.into(),
        }
    }
}

/// Recommend a backend for the probed host.
///
/// A supported override wins; an unsupported one must already have been
/// discarded by [`BackendKind::parse_override`].
pub fn select_backend(probe: &HostProbe, force: Option<BackendKind>) -> SystemProfile {
    if let Some(kind) = force {
        return SystemProfile {
            accelerator: probe.accelerator,
            recommended: kind,
            forced: true,
        };
    }

    let recommended = match probe.accelerator {
        AcceleratorKind::CudaGpu => BackendKind::HighThroughput,
        AcceleratorKind::AppleMetal => BackendKind::Fallback,
        AcceleratorKind::None => BackendKind::Cpu,
    };

    SystemProfile {
        accelerator: probe.accelerator,
        recommended,
        forced: false,
    }
}

/// The high-throughput engine needs both its dependency and a discrete accelerator.
pub fn high_throughput_eligibility(probe: &HostProbe) -> Eligibility {
    if !probe.high_throughput_engine {
        return Eligibility::no("high-throughput engine is not installed");
    }
    if !probe.accelerator.is_discrete() {
        return Eligibility::no(format!(
            "high-throughput engine requires a CUDA GPU (found: {})",
            probe.accelerator
        ));
    }
    Eligibility::yes("high-throughput engine and CUDA GPU available")
}

/// The fallback engine runs anywhere its dependency is present.
pub fn fallback_eligibility(probe: &HostProbe) -> Eligibility {
    if probe.fallback_engine {
        Eligibility::yes(format!("fallback engine available (accelerator: {})", probe.accelerator))
    } else {
        Eligibility::no("fallback engine is not installed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(accelerator: AcceleratorKind, ht: bool, fb: bool) -> HostProbe {
        HostProbe {
            accelerator,
            high_throughput_engine: ht,
            fallback_engine: fb,
        }
    }

    #[test]
    fn test_recommendation_per_accelerator() {
        let cases = [
            (AcceleratorKind::CudaGpu, BackendKind::HighThroughput),
            (AcceleratorKind::AppleMetal, BackendKind::Fallback),
            (AcceleratorKind::None, BackendKind::Cpu),
        ];
        for (accel, expected) in cases {
            let profile = select_backend(&probe(accel, true, true), None);
            assert_eq!(profile.recommended, expected, "{accel}");
            assert!(!profile.forced);
        }
    }

    #[test]
    fn test_override_wins() {
        let profile = select_backend(
            &probe(AcceleratorKind::None, false, true),
            Some(BackendKind::HighThroughput),
        );
        assert_eq!(profile.recommended, BackendKind::HighThroughput);
        assert!(profile.forced);
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(BackendKind::parse_override("vLLM"), Some(BackendKind::HighThroughput));
        assert_eq!(BackendKind::parse_override("transformers"), Some(BackendKind::Fallback));
        assert_eq!(BackendKind::parse_override(" cpu "), Some(BackendKind::Cpu));
        assert_eq!(BackendKind::parse_override("tpu"), None);
        assert_eq!(BackendKind::parse_override(""), None);
    }

    #[test]
    fn test_unsupported_override_falls_back_to_detection() {
        let host = probe(AcceleratorKind::CudaGpu, true, true);
        let profile = select_backend(&host, BackendKind::parse_override("quantum"));
        assert_eq!(profile, select_backend(&host, None));
    }

    #[test]
    fn test_cpu_uses_fallback_variant() {
        assert_eq!(BackendKind::Cpu.variant(), HandlerVariant::Fallback);
        assert_eq!(BackendKind::HighThroughput.variant(), HandlerVariant::HighThroughput);
    }

    #[test]
    fn test_high_throughput_eligibility() {
        assert!(high_throughput_eligibility(&probe(AcceleratorKind::CudaGpu, true, false)).usable);

        let no_gpu = high_throughput_eligibility(&probe(AcceleratorKind::AppleMetal, true, true));
        assert!(!no_gpu.usable);
        assert!(no_gpu.reason.contains("apple_metal"));

        let missing = high_throughput_eligibility(&probe(AcceleratorKind::CudaGpu, false, true));
        assert!(!missing.usable);
        assert!(missing.reason.contains("not installed"));
    }

    #[test]
    fn test_fallback_eligibility() {
        assert!(fallback_eligibility(&probe(AcceleratorKind::None, false, true)).usable);
        assert!(!fallback_eligibility(&probe(AcceleratorKind::CudaGpu, true, false)).usable);
    }
}
