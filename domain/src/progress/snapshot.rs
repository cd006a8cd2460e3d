//! Model loading progress state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Download/load progress of one model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub artifact_name: String,
    pub completed: u64,
    pub total: u64,
    pub percentage: f64,
}

impl ProgressRecord {
    pub fn new(artifact_name: impl Into<String>, completed: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        Self {
            artifact_name: artifact_name.into(),
            completed,
            total,
            percentage,
        }
    }

    fn complete(&mut self) {
        self.completed = self.total;
        self.percentage = 100.0;
    }
}

/// Point-in-time view of all loading progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub files: BTreeMap<String, ProgressRecord>,
    pub overall_percentage: f64,
    pub is_loading: bool,
    /// Milliseconds since the Unix epoch of the last mutation.
    pub timestamp_ms: u64,
}

impl ProgressSnapshot {
    /// Equal apart from the timestamp.
    pub fn same_state(&self, other: &ProgressSnapshot) -> bool {
        self.is_loading == other.is_loading
            && self.overall_percentage == other.overall_percentage
            && self.files == other.files
    }

    /// Loading finished after at least one artifact was seen.
    pub fn is_settled(&self) -> bool {
        !self.is_loading && !self.files.is_empty()
    }
}

/// Mutable progress state. Wrapped in a lock by its owner.
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    records: BTreeMap<String, ProgressRecord>,
    is_loading: bool,
    timestamp_ms: u64,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a record and mark loading in progress.
    pub fn update(&mut self, artifact_name: &str, completed: u64, total: u64, now_ms: u64) {
        self.is_loading = true;
        self.timestamp_ms = now_ms;
        self.records.insert(
            artifact_name.to_string(),
            ProgressRecord::new(artifact_name, completed, total),
        );
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.records.clear();
        self.is_loading = false;
        self.timestamp_ms = now_ms;
    }

    /// Force every record to 100% and clear the loading flag.
    pub fn complete(&mut self, now_ms: u64) {
        self.is_loading = false;
        self.timestamp_ms = now_ms;
        for record in self.records.values_mut() {
            record.complete();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let overall_percentage = if self.records.is_empty() {
            0.0
        } else {
            let sum: f64 = self.records.values().map(|r| r.percentage).sum();
            sum / self.records.len() as f64
        };
        ProgressSnapshot {
            files: self.records.clone(),
            overall_percentage,
            is_loading: self.is_loading,
            timestamp_ms: self.timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_is_empty_and_idle() {
        let mut state = ProgressState::new();
        state.update("vocab.json", 40, 100, 1);
        state.reset(2);
        let snap = state.snapshot();
        assert_eq!(snap.overall_percentage, 0.0);
        assert!(!snap.is_loading);
        assert!(snap.files.is_empty());
    }

    #[test]
    fn test_update_then_finish_single_artifact() {
        let mut state = ProgressState::new();
        state.update("x", 50, 100, 1);
        assert_eq!(state.snapshot().overall_percentage, 50.0);
        assert!(state.snapshot().is_loading);
        state.update("x", 100, 100, 2);
        assert_eq!(state.snapshot().overall_percentage, 100.0);
        assert_eq!(state.snapshot().files.len(), 1);
    }

    #[test]
    fn test_overall_is_average() {
        let mut state = ProgressState::new();
        state.update("a", 20, 100, 1);
        state.update("b", 60, 100, 1);
        assert_eq!(state.snapshot().overall_percentage, 40.0);
    }

    #[test]
    fn test_complete_forces_full() {
        let mut state = ProgressState::new();
        state.update("model-00001-of-00002.safetensors", 10, 100, 1);
        state.complete(5);
        let snap = state.snapshot();
        assert!(!snap.is_loading);
        assert!(snap.is_settled());
        assert_eq!(snap.overall_percentage, 100.0);
        assert_eq!(snap.timestamp_ms, 5);
        let record = &snap.files["model-00001-of-00002.safetensors"];
        assert_eq!(record.completed, record.total);
    }

    #[test]
    fn test_zero_total_does_not_divide() {
        assert_eq!(ProgressRecord::new("a", 5, 0).percentage, 0.0);
    }

    #[test]
    fn test_same_state_ignores_timestamp() {
        let mut state = ProgressState::new();
        state.update("a", 20, 100, 1);
        let first = state.snapshot();
        state.update("a", 20, 100, 9);
        let second = state.snapshot();
        assert!(first.same_state(&second));
        assert_ne!(first, second);
    }
}
