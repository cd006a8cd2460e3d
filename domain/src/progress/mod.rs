//! Model loading progress: state, snapshots and log-line detection.

pub mod log_scan;
pub mod snapshot;
