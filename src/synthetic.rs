use crate::models::PriceBar;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Index family being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Slow upward drift punctuated by sharp drops
    Crash,
    /// Slow downward drift punctuated by sharp rallies
    Boom,
}

/// Generates Crash/Boom style price series for exercising the analyzer
pub struct SyntheticSeriesGenerator {
    rng: StdRng,
    base_price: f64,
    /// Average bars between spikes
    spike_interval: usize,
    /// Spike magnitude range in pips
    spike_size: (f64, f64),
}

impl SyntheticSeriesGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 10000.0,
            spike_interval: 25,
            spike_size: (60.0, 150.0),
        }
    }

    pub fn with_spike_interval(mut self, bars: usize) -> Self {
        self.spike_interval = bars.max(3);
        self
    }

    /// Generate `num_bars` one-minute bars ending now
    ///
    /// Each spike is followed by a bar that retraces 55-90% of it, so the
    /// spike detector picks it up with default settings.
    pub fn generate(&mut self, kind: IndexKind, num_bars: usize) -> Vec<PriceBar> {
        let start_time = Utc::now() - Duration::minutes(num_bars as i64);
        let mut bars = Vec::with_capacity(num_bars);
        let mut price = self.base_price;
        let mut i = 0;
        // Spikes need a quiet bar on both sides
        let mut next_spike_at = 1;

        while i < num_bars {
            let spike_here = i >= next_spike_at
                && i + 1 < num_bars
                && self.rng.gen_range(0..self.spike_interval) == 0;

            if spike_here {
                let size = self.rng.gen_range(self.spike_size.0..self.spike_size.1);
                let retrace = size * self.rng.gen_range(0.55..0.9);
                let (into, back) = match kind {
                    IndexKind::Crash => (-size, retrace),
                    IndexKind::Boom => (size, -retrace),
                };

                price += into;
                bars.push(self.create_bar(start_time, i, price));
                price += back;
                bars.push(self.create_bar(start_time, i + 1, price));
                i += 2;
                next_spike_at = i + 1;
                continue;
            }

            // Drift against the spike direction with small noise
            let drift = match kind {
                IndexKind::Crash => 0.5,
                IndexKind::Boom => -0.5,
            };
            price += drift + self.rng.gen_range(-2.0..2.0);
            bars.push(self.create_bar(start_time, i, price));
            i += 1;
        }

        bars
    }

    fn create_bar(&mut self, start_time: DateTime<Utc>, index: usize, close: f64) -> PriceBar {
        let high = close + self.rng.gen_range(0.0..3.0);
        let low = close - self.rng.gen_range(0.0..3.0);
        let open = (close + self.rng.gen_range(-2.0..2.0)).clamp(low, high);

        PriceBar {
            timestamp: start_time + Duration::minutes(index as i64),
            open,
            high,
            low,
            close,
        }
    }
}

/// Fixed 100-bar sample the trading client uses for connection checks
///
/// Crash moves at bars 20/45/70, boom moves at 35/60/85, small oscillation
/// elsewhere. The moves are not followed by a reversal.
pub fn sample_series(end: DateTime<Utc>) -> Vec<PriceBar> {
    let mut price = 10000.0;

    (0..100i64)
        .map(|i| {
            let change = match i {
                20 | 45 | 70 => -80.0 - (i as f64 * 2.0),
                35 | 60 | 85 => 75.0 + (i as f64 * 2.0),
                _ => ((i % 10) - 5) as f64 * 2.0,
            };
            price += change;

            PriceBar {
                timestamp: end - Duration::minutes(100 - i),
                open: price - 1.0,
                high: price + 2.0,
                low: price - 2.0,
                close: price,
            }
        })
        .collect()
}
