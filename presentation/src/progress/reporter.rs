//! Terminal progress for model loading

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use medreason_application::{ProgressSubscriber, SubscriberError};
use medreason_domain::ProgressSnapshot;
use std::collections::HashMap;
use std::sync::Mutex;

/// One progress bar per model artifact
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn artifact_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSubscriber for ProgressReporter {
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> Result<(), SubscriberError> {
        let mut bars = self
            .bars
            .lock()
            .map_err(|_| SubscriberError("progress bars poisoned".to_string()))?;

        for (name, record) in &snapshot.files {
            let bar = bars.entry(name.clone()).or_insert_with(|| {
                let pb = self.multi.add(ProgressBar::new(100));
                pb.set_style(Self::artifact_style());
                pb.set_prefix(name.clone());
                pb
            });
            bar.set_position(record.percentage.round().clamp(0.0, 100.0) as u64);
        }

        if snapshot.is_settled() {
            for bar in bars.values() {
                bar.finish_with_message(format!("{}", "loaded".green()));
            }
        }
        Ok(())
    }
}

/// Line-based progress on stderr, for non-interactive output modes
pub struct SimpleProgress {
    last: Mutex<Option<ProgressSnapshot>>,
}

impl SimpleProgress {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }
}

impl Default for SimpleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSubscriber for SimpleProgress {
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> Result<(), SubscriberError> {
        let mut last = self
            .last
            .lock()
            .map_err(|_| SubscriberError("progress state poisoned".to_string()))?;
        if last.as_ref().is_some_and(|l| l.same_state(snapshot)) {
            return Ok(());
        }

        if snapshot.is_settled() {
            eprintln!("{} {}", "->".cyan(), "Model loaded".green().bold());
        } else {
            eprintln!(
                "{} Loading model: {:.0}% ({} files)",
                "->".cyan(),
                snapshot.overall_percentage,
                snapshot.files.len()
            );
        }
        *last = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medreason_domain::ProgressState;

    #[test]
    fn test_reporter_tracks_each_artifact() {
        let reporter = ProgressReporter::new();
        let mut state = ProgressState::new();
        state.update("model-00001-of-00002.safetensors", 40, 100, 1);
        state.update("tokenizer_config.json", 100, 100, 2);
        reporter.on_progress(&state.snapshot()).unwrap();

        let bars = reporter.bars.lock().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars["model-00001-of-00002.safetensors"].position(), 40);
    }

    #[test]
    fn test_settled_snapshot_finishes_bars() {
        let reporter = ProgressReporter::new();
        let mut state = ProgressState::new();
        state.update("vocab.json", 10, 100, 1);
        state.complete(2);
        reporter.on_progress(&state.snapshot()).unwrap();

        let bars = reporter.bars.lock().unwrap();
        assert!(bars["vocab.json"].is_finished());
        assert_eq!(bars["vocab.json"].position(), 100);
    }
}
