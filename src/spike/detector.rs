/// Spike detector for Crash/Boom style price series
///
/// A spike is a bar-to-bar close move larger than `min_spike_size` that is
/// at least half retraced by the very next bar:
/// - CRASH: close fell into the spike bar
/// - BOOM: close rose into the spike bar
///
/// For each spike the detector also measures how long price took to come back
/// near the spike close and how far it wandered away from it afterwards.

use crate::models::{PriceBar, Recovery, SpikeDirection, SpikeEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeDetector {
    min_spike_size: f64,
    recovery_window: usize,
    retracement_window: usize,
}

impl Default for SpikeDetector {
    fn default() -> Self {
        Self {
            min_spike_size: 50.0,   // pips
            recovery_window: 100,   // bars
            retracement_window: 50, // bars
        }
    }
}

impl SpikeDetector {
    pub fn new(min_spike_size: f64, recovery_window: usize, retracement_window: usize) -> Self {
        Self {
            min_spike_size,
            recovery_window,
            retracement_window,
        }
    }

    pub fn min_spike_size(&self) -> f64 {
        self.min_spike_size
    }

    /// Distance from the spike close that counts as "recovered"
    pub fn recovery_tolerance(&self) -> f64 {
        self.min_spike_size * 0.1
    }

    /// Detect spikes in caller order
    ///
    /// Returns an empty vec for fewer than 3 bars
    pub fn detect(&self, bars: &[PriceBar]) -> Vec<SpikeEvent> {
        let mut spikes = Vec::new();

        if bars.len() < 3 {
            return spikes;
        }

        for i in 1..bars.len() - 1 {
            let prev = &bars[i - 1];
            let current = &bars[i];
            let next = &bars[i + 1];

            let delta_in = (current.close - prev.close).abs();
            let delta_out = (next.close - current.close).abs();

            if delta_in > self.min_spike_size && delta_out > delta_in * 0.5 {
                let direction = if current.close < prev.close {
                    SpikeDirection::Crash
                } else {
                    SpikeDirection::Boom
                };

                spikes.push(SpikeEvent {
                    timestamp: current.timestamp,
                    price: current.close,
                    spike_size: delta_in,
                    direction,
                    recovery: self.recovery(bars, i),
                    max_retracement: self.max_retracement(bars, i),
                });
            }
        }

        spikes
    }

    /// First bar after the spike (within the window) whose close is back near the spike close
    fn recovery(&self, bars: &[PriceBar], spike_index: usize) -> Recovery {
        let spike = &bars[spike_index];
        let end = spike_index.saturating_add(self.recovery_window).min(bars.len());
        let tolerance = self.recovery_tolerance();

        bars.get(spike_index + 1..end)
            .unwrap_or_default()
            .iter()
            .find(|bar| (bar.close - spike.close).abs() < tolerance)
            .map(|bar| Recovery::Recovered {
                seconds: (bar.timestamp - spike.timestamp).num_seconds(),
            })
            .unwrap_or(Recovery::NotRecovered)
    }

    /// Largest distance from the spike close inside the retracement window
    fn max_retracement(&self, bars: &[PriceBar], spike_index: usize) -> f64 {
        let spike_close = bars[spike_index].close;
        let end = spike_index.saturating_add(self.retracement_window).min(bars.len());

        bars.get(spike_index + 1..end)
            .unwrap_or_default()
            .iter()
            .map(|bar| (bar.close - spike_close).abs())
            .fold(0.0, f64::max)
    }
}

/// Detect spikes with the default thresholds (50 pips, 100/50 bar windows)
pub fn detect_spikes(bars: &[PriceBar]) -> Vec<SpikeEvent> {
    SpikeDetector::default().detect(bars)
}
