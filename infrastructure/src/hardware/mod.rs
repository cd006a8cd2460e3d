//! Host hardware and engine probing.

mod detector;

pub use detector::CapabilityDetector;
