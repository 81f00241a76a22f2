use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One price bar as sent by the trading client
///
/// Bars are analyzed in the order received, never re-sorted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBar {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    /// Flat bar where open/high/low/close are all the same price
    pub fn flat(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }
}

/// Direction of the move into a spike bar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpikeDirection {
    /// Price fell into the spike
    Crash,
    /// Price rose into the spike
    Boom,
}

impl SpikeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpikeDirection::Crash => "CRASH",
            SpikeDirection::Boom => "BOOM",
        }
    }
}

impl std::fmt::Display for SpikeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether price came back to the spike level inside the recovery window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recovery {
    Recovered { seconds: i64 },
    NotRecovered,
}

impl Recovery {
    /// Scalar reported downstream when no recovery was observed
    pub const NOT_RECOVERED_SECS: i64 = 300;

    /// Recovery time in seconds, with the 300s sentinel for `NotRecovered`
    pub fn as_seconds(&self) -> i64 {
        match self {
            Recovery::Recovered { seconds } => *seconds,
            Recovery::NotRecovered => Self::NOT_RECOVERED_SECS,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Recovery::Recovered { .. })
    }
}

/// A detected spike
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpikeEvent {
    pub timestamp: DateTime<Utc>,
    /// Close of the spike bar
    pub price: f64,
    /// Absolute move into the spike, in price units
    pub spike_size: f64,
    pub direction: SpikeDirection,
    pub recovery: Recovery,
    pub max_retracement: f64,
}

impl SpikeEvent {
    pub fn recovery_time_seconds(&self) -> i64 {
        self.recovery.as_seconds()
    }

    pub fn is_crash(&self) -> bool {
        self.direction == SpikeDirection::Crash
    }
}

/// Market context passed alongside the spikes to the recommendation engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub spread: f64,
    pub volatility: f64,
}

/// Market metadata supplied by the trading client
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketInfo {
    #[serde(default)]
    pub spread: f64,
    #[serde(default)]
    pub volatility: f64,
}

/// Inbound analysis payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub price_data: Vec<PriceBar>,
    #[serde(default)]
    pub market_info: MarketInfo,
}

fn default_symbol() -> String {
    "Unknown".to_string()
}

impl AnalysisRequest {
    /// Snapshot of the market at the last bar (price 0 for an empty series)
    pub fn market_snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            symbol: self.symbol.clone(),
            current_price: self.price_data.last().map(|b| b.close).unwrap_or(0.0),
            spread: self.market_info.spread,
            volatility: self.market_info.volatility,
        }
    }
}

/// Trading parameters recommended for a symbol
///
/// Every field always carries a value, either from the model or a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub spike_threshold: f64,
    pub cooldown_seconds: i64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    /// 1-10
    pub risk_score: f64,
    /// 0-100
    pub confidence: f64,
    pub market_trend: String,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

impl Recommendation {
    pub const DEFAULT_SPIKE_THRESHOLD: f64 = 50.0;
    pub const DEFAULT_COOLDOWN_SECONDS: i64 = 300;
    pub const DEFAULT_STOP_LOSS_PIPS: f64 = 20.0;
    pub const DEFAULT_TAKE_PROFIT_PIPS: f64 = 40.0;
    pub const DEFAULT_RISK_SCORE: f64 = 5.0;
    pub const DEFAULT_CONFIDENCE: f64 = 50.0;
    pub const DEFAULT_MARKET_TREND: &'static str = "Neutral";
    pub const DEFAULT_REASONING: &'static str = "Using default parameters due to analysis failure";

    /// Fallback parameters, stamped with the current time
    pub fn fallback() -> Self {
        Self {
            spike_threshold: Self::DEFAULT_SPIKE_THRESHOLD,
            cooldown_seconds: Self::DEFAULT_COOLDOWN_SECONDS,
            stop_loss_pips: Self::DEFAULT_STOP_LOSS_PIPS,
            take_profit_pips: Self::DEFAULT_TAKE_PROFIT_PIPS,
            risk_score: Self::DEFAULT_RISK_SCORE,
            confidence: Self::DEFAULT_CONFIDENCE,
            market_trend: Self::DEFAULT_MARKET_TREND.to_string(),
            reasoning: Self::DEFAULT_REASONING.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// True when every parameter matches the fallback values (timestamp ignored)
    pub fn is_fallback(&self) -> bool {
        self.spike_threshold == Self::DEFAULT_SPIKE_THRESHOLD
            && self.cooldown_seconds == Self::DEFAULT_COOLDOWN_SECONDS
            && self.stop_loss_pips == Self::DEFAULT_STOP_LOSS_PIPS
            && self.take_profit_pips == Self::DEFAULT_TAKE_PROFIT_PIPS
            && self.risk_score == Self::DEFAULT_RISK_SCORE
            && self.confidence == Self::DEFAULT_CONFIDENCE
            && self.market_trend == Self::DEFAULT_MARKET_TREND
            && self.reasoning == Self::DEFAULT_REASONING
    }
}

/// Latest analysis stored for a symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub symbol: String,
    #[serde(rename = "recommendations")]
    pub recommendation: Recommendation,
    pub spikes_analyzed: usize,
    pub last_analysis: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolSummary {
    pub spikes_analyzed: usize,
    pub last_analysis: DateTime<Utc>,
}

/// Read-only snapshot of the analysis cache
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    pub count: usize,
    pub symbols: BTreeMap<String, SymbolSummary>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    Text(String),
}

/// Accepts RFC 3339, naive ISO-8601 (taken as UTC) or unix seconds
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Seconds(secs) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", secs))),
        RawTimestamp::Text(text) => parse_timestamp(&text).map_err(serde::de::Error::custom),
    }
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y.%m.%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(format!("unrecognized timestamp: {}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_naive_iso_timestamp() {
        let ts = parse_timestamp("2025-01-15T10:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T10:30:00+00:00");

        let with_fraction = parse_timestamp("2025-01-15T10:30:00.250000").unwrap();
        assert_eq!(with_fraction.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_rfc3339_timestamp_converts_to_utc() {
        let ts = parse_timestamp("2025-01-15T12:30:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_mt5_style_timestamp() {
        let ts = parse_timestamp("2025.01.15 10:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_garbage_timestamp_fails() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_price_bar_from_client_json() {
        let bar: PriceBar = serde_json::from_str(
            r#"{"timestamp": "2025-01-15T10:30:00", "open": 10000.0, "high": 10005.0, "low": 9995.0, "close": 10002.0}"#,
        )
        .unwrap();
        assert_eq!(bar.close, 10002.0);
        assert_eq!(bar.high, 10005.0);

        let bar: PriceBar =
            serde_json::from_str(r#"{"timestamp": 1736937000, "close": 9920}"#).unwrap();
        assert_eq!(bar.timestamp.to_rfc3339(), "2025-01-15T10:30:00+00:00");
        assert_eq!(bar.open, 0.0);
    }

    #[test]
    fn test_analysis_request_defaults() {
        let request: AnalysisRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.symbol, "Unknown");
        assert!(request.price_data.is_empty());

        let snapshot = request.market_snapshot();
        assert_eq!(snapshot.current_price, 0.0);
        assert_eq!(snapshot.spread, 0.0);
    }

    #[test]
    fn test_market_snapshot_uses_last_close() {
        let now = Utc::now();
        let request = AnalysisRequest {
            symbol: "BOOM_1000".to_string(),
            price_data: vec![PriceBar::flat(now, 100.0), PriceBar::flat(now, 105.5)],
            market_info: MarketInfo {
                spread: 15.0,
                volatility: 0.85,
            },
        };

        let snapshot = request.market_snapshot();
        assert_eq!(snapshot.symbol, "BOOM_1000");
        assert_eq!(snapshot.current_price, 105.5);
        assert_eq!(snapshot.volatility, 0.85);
    }

    #[test]
    fn test_recovery_sentinel() {
        assert_eq!(Recovery::NotRecovered.as_seconds(), 300);
        assert_eq!(Recovery::Recovered { seconds: 42 }.as_seconds(), 42);
        assert!(!Recovery::NotRecovered.is_recovered());
    }

    #[test]
    fn test_fallback_recommendation() {
        let rec = Recommendation::fallback();
        assert_eq!(rec.spike_threshold, 50.0);
        assert_eq!(rec.cooldown_seconds, 300);
        assert_eq!(rec.stop_loss_pips, 20.0);
        assert_eq!(rec.take_profit_pips, 40.0);
        assert_eq!(rec.risk_score, 5.0);
        assert_eq!(rec.confidence, 50.0);
        assert_eq!(rec.market_trend, "Neutral");
        assert!(rec.is_fallback());
    }

    #[test]
    fn test_cache_entry_serializes_recommendations_key() {
        let entry = CacheEntry {
            symbol: "CRASH_1000".to_string(),
            recommendation: Recommendation::fallback(),
            spikes_analyzed: 3,
            last_analysis: Utc::now(),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["spikes_analyzed"], 3);
        assert_eq!(json["recommendations"]["cooldown_seconds"], 300);
    }
}
