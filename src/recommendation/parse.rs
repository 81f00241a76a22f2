/// Best-effort extraction of recommendation fields from a free-text model reply
///
/// The reply may wrap the JSON object in prose or markdown fences. Only the
/// substring from the first `{` to the last `}` is decoded, and every field is
/// coerced individually so one bad value never discards the others.

use crate::models::Recommendation;
use chrono::Utc;
use serde_json::{Map, Value};

const RISK_SCORE_RANGE: (f64, f64) = (1.0, 10.0);
const CONFIDENCE_RANGE: (f64, f64) = (0.0, 100.0);

/// Slice between the first `{` and the last `}` inclusive
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    if end < start {
        return None;
    }

    Some(&text[start..=end])
}

/// Decode a model reply into a full recommendation
///
/// Returns None when no JSON object can be located or decoded. A decoded
/// object always yields a complete recommendation, with defaults filling in
/// absent or mistyped fields.
pub fn parse_recommendation(text: &str) -> Option<Recommendation> {
    let block = extract_json_block(text)?;

    let fields = match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!("Failed to decode recommendation JSON: {}", e);
            return None;
        }
    };

    Some(from_fields(&fields))
}

/// Coerce each field independently, defaulting any that are missing or mistyped
///
/// `risk_score` is clamped into 1-10 and `confidence` into 0-100 so the EA
/// never sees a score outside the range the prompt asked for.
fn from_fields(fields: &Map<String, Value>) -> Recommendation {
    Recommendation {
        spike_threshold: number_field(fields, "spike_threshold")
            .unwrap_or(Recommendation::DEFAULT_SPIKE_THRESHOLD),
        cooldown_seconds: integer_field(fields, "cooldown_seconds")
            .unwrap_or(Recommendation::DEFAULT_COOLDOWN_SECONDS),
        stop_loss_pips: number_field(fields, "stop_loss_pips")
            .unwrap_or(Recommendation::DEFAULT_STOP_LOSS_PIPS),
        take_profit_pips: number_field(fields, "take_profit_pips")
            .unwrap_or(Recommendation::DEFAULT_TAKE_PROFIT_PIPS),
        risk_score: number_field(fields, "risk_score")
            .map(|v| v.clamp(RISK_SCORE_RANGE.0, RISK_SCORE_RANGE.1))
            .unwrap_or(Recommendation::DEFAULT_RISK_SCORE),
        confidence: number_field(fields, "confidence")
            .map(|v| v.clamp(CONFIDENCE_RANGE.0, CONFIDENCE_RANGE.1))
            .unwrap_or(Recommendation::DEFAULT_CONFIDENCE),
        market_trend: text_field(fields, "market_trend")
            .unwrap_or_else(|| Recommendation::DEFAULT_MARKET_TREND.to_string()),
        reasoning: text_field(fields, "reasoning")
            .unwrap_or_else(|| Recommendation::DEFAULT_REASONING.to_string()),
        timestamp: Utc::now(),
    }
}

/// Numbers or numeric strings, finite only
fn number_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match fields.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    value.is_finite().then_some(value)
}

/// Integers, fractional numbers truncated, or integer strings
fn integer_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|v| v.is_finite() && v.abs() < i64::MAX as f64)
                .map(|v| v.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"{
        "spike_threshold": 65.5,
        "cooldown_seconds": 240,
        "stop_loss_pips": 25,
        "take_profit_pips": 55.0,
        "risk_score": 7,
        "confidence": 82,
        "market_trend": "Bearish with frequent crashes",
        "reasoning": "Crash spikes dominate and recover quickly."
    }"#;

    #[test]
    fn test_extract_json_block() {
        assert_eq!(extract_json_block("a {\"x\": 1} b"), Some("{\"x\": 1}"));
        assert_eq!(extract_json_block("no braces here"), None);
        assert_eq!(extract_json_block("only { open"), None);
        assert_eq!(extract_json_block("} reversed {"), None);
    }

    #[test]
    fn test_extract_spans_first_open_to_last_close() {
        let text = "{\"a\": {\"b\": 1}} trailing }";
        assert_eq!(extract_json_block(text), Some(text));
    }

    #[test]
    fn test_parse_full_response() {
        let rec = parse_recommendation(FULL_RESPONSE).unwrap();

        assert_eq!(rec.spike_threshold, 65.5);
        assert_eq!(rec.cooldown_seconds, 240);
        assert_eq!(rec.stop_loss_pips, 25.0);
        assert_eq!(rec.take_profit_pips, 55.0);
        assert_eq!(rec.risk_score, 7.0);
        assert_eq!(rec.confidence, 82.0);
        assert_eq!(rec.market_trend, "Bearish with frequent crashes");
        assert_eq!(rec.reasoning, "Crash spikes dominate and recover quickly.");
    }

    #[test]
    fn test_parse_response_wrapped_in_prose() {
        let text = format!(
            "Here is my analysis:\n```json\n{}\n```\nLet me know if you need more.",
            FULL_RESPONSE
        );
        let rec = parse_recommendation(&text).unwrap();

        assert_eq!(rec.spike_threshold, 65.5);
        assert_eq!(rec.cooldown_seconds, 240);
    }

    #[test]
    fn test_missing_and_mistyped_fields_fall_back_individually() {
        let text = r#"{
            "spike_threshold": "high",
            "cooldown_seconds": 180,
            "stop_loss_pips": null,
            "risk_score": [3],
            "confidence": "77",
            "market_trend": {"direction": "up"}
        }"#;
        let rec = parse_recommendation(text).unwrap();

        assert_eq!(rec.spike_threshold, 50.0);
        assert_eq!(rec.cooldown_seconds, 180);
        assert_eq!(rec.stop_loss_pips, 20.0);
        assert_eq!(rec.take_profit_pips, 40.0);
        assert_eq!(rec.risk_score, 5.0);
        assert_eq!(rec.confidence, 77.0);
        assert_eq!(rec.market_trend, "Neutral");
        assert_eq!(rec.reasoning, Recommendation::DEFAULT_REASONING);
    }

    #[test]
    fn test_integer_coercion() {
        let rec = parse_recommendation(r#"{"cooldown_seconds": 120.9}"#).unwrap();
        assert_eq!(rec.cooldown_seconds, 120);

        let rec = parse_recommendation(r#"{"cooldown_seconds": " 90 "}"#).unwrap();
        assert_eq!(rec.cooldown_seconds, 90);

        let rec = parse_recommendation(r#"{"cooldown_seconds": "1.5"}"#).unwrap();
        assert_eq!(rec.cooldown_seconds, 300);
    }

    #[test]
    fn test_scores_are_clamped() {
        let rec = parse_recommendation(r#"{"risk_score": 14, "confidence": -3}"#).unwrap();
        assert_eq!(rec.risk_score, 10.0);
        assert_eq!(rec.confidence, 0.0);
    }

    #[test]
    fn test_numeric_text_field_is_stringified() {
        let rec = parse_recommendation(r#"{"market_trend": 42}"#).unwrap();
        assert_eq!(rec.market_trend, "42");
    }

    #[test]
    fn test_unparseable_response_is_none() {
        assert!(parse_recommendation("I cannot help with that.").is_none());
        assert!(parse_recommendation("{ not: valid json }").is_none());
        assert!(parse_recommendation("{\"a\": 1} and {\"b\": 2}").is_none());
    }
}
