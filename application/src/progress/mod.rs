//! Model loading progress tracking.

mod monitor;

pub use monitor::{ProgressMonitor, SubscriptionGuard};
