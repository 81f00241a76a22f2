// Spike detection module
pub mod detector;

pub use detector::{detect_spikes, SpikeDetector};
