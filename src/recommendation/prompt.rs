use crate::models::{MarketSnapshot, Recovery, SpikeDirection, SpikeEvent};

/// How many of the most recent spikes are listed verbatim in the prompt
pub const RECENT_SPIKES_IN_PROMPT: usize = 10;

pub const SYSTEM_PROMPT: &str = "You are an expert forex trading analyst specializing in Crash/Boom synthetic indices. Provide concise, actionable recommendations. Always answer with a single JSON object.";

/// Aggregate figures over a batch of spikes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpikeStatistics {
    pub total: usize,
    pub crash_count: usize,
    pub boom_count: usize,
    pub avg_crash_size: f64,
    pub avg_boom_size: f64,
    /// Uses the 300s sentinel for spikes that never recovered
    pub avg_recovery_secs: f64,
}

impl SpikeStatistics {
    pub fn from_spikes(spikes: &[SpikeEvent]) -> Self {
        let sizes = |direction: SpikeDirection| -> Vec<f64> {
            spikes
                .iter()
                .filter(|s| s.direction == direction)
                .map(|s| s.spike_size)
                .collect()
        };

        let crash_sizes = sizes(SpikeDirection::Crash);
        let boom_sizes = sizes(SpikeDirection::Boom);
        let recovery: Vec<f64> = spikes
            .iter()
            .map(|s| s.recovery_time_seconds() as f64)
            .collect();

        Self {
            total: spikes.len(),
            crash_count: crash_sizes.len(),
            boom_count: boom_sizes.len(),
            avg_crash_size: mean(&crash_sizes),
            avg_boom_size: mean(&boom_sizes),
            avg_recovery_secs: mean(&recovery),
        }
    }
}

/// Arithmetic mean, 0 for an empty slice
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn format_spike(spike: &SpikeEvent) -> String {
    let marker = match spike.recovery {
        Recovery::Recovered { .. } => "",
        Recovery::NotRecovered => " (not recovered)",
    };

    format!(
        "- {}: {:.1} pips, Recovery: {:.1}s{}, Retracement: {:.1} pips",
        spike.direction,
        spike.spike_size,
        spike.recovery_time_seconds() as f64,
        marker,
        spike.max_retracement
    )
}

/// Build the user prompt for a batch of spikes
pub fn build_prompt(spikes: &[SpikeEvent], market: &MarketSnapshot) -> String {
    let stats = SpikeStatistics::from_spikes(spikes);

    let start = spikes.len().saturating_sub(RECENT_SPIKES_IN_PROMPT);
    let recent: Vec<String> = spikes[start..].iter().map(format_spike).collect();

    format!(
        r#"Analyze the following spike data for a Crash/Boom synthetic index and provide trading recommendations.

MARKET DATA:
- Symbol: {}
- Current Price: {}
- Spread: {}
- Volatility: {}

SPIKE ANALYSIS:
- Total Spikes: {}
- Crash Spikes: {}
- Boom Spikes: {}
- Average Crash Size: {:.2} pips
- Average Boom Size: {:.2} pips
- Average Recovery Time: {:.0} seconds

RECENT SPIKE DETAILS (last {}):
{}

Respond with JSON in exactly this format:
{{
    "spike_threshold": <optimal spike size threshold in pips>,
    "cooldown_seconds": <recommended cooldown period in seconds>,
    "stop_loss_pips": <suggested stop loss in pips>,
    "take_profit_pips": <suggested take profit in pips>,
    "risk_score": <risk assessment 1-10>,
    "confidence": <confidence level 0-100>,
    "market_trend": "<current market trend analysis>",
    "reasoning": "<detailed reasoning for recommendations>"
}}

Focus on:
1. Optimal spike size threshold for entry
2. Appropriate cooldown periods
3. Risk management parameters
4. Current market conditions
5. Historical pattern analysis
"#,
        market.symbol,
        market.current_price,
        market.spread,
        market.volatility,
        stats.total,
        stats.crash_count,
        stats.boom_count,
        stats.avg_crash_size,
        stats.avg_boom_size,
        stats.avg_recovery_secs,
        recent.len(),
        recent.join("\n"),
    )
}
