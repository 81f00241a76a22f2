/// Turns detected spikes into recommended trading parameters
///
/// Spike statistics go to the LLM as a single chat request. The engine never
/// fails: an empty spike list, an unconfigured key, a transport error or an
/// unreadable reply all degrade to `Recommendation::fallback()`.

use crate::llm::OpenAIClient;
use crate::models::{MarketSnapshot, Recommendation, SpikeEvent};
use crate::recommendation::parse::parse_recommendation;
use crate::recommendation::prompt::{build_prompt, SYSTEM_PROMPT};

#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    client: OpenAIClient,
}

impl RecommendationEngine {
    pub fn new(client: OpenAIClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OpenAIClient {
        &self.client
    }

    pub async fn recommend(&self, spikes: &[SpikeEvent], market: &MarketSnapshot) -> Recommendation {
        if spikes.is_empty() {
            tracing::debug!("No spikes for {}, using default parameters", market.symbol);
            return Recommendation::fallback();
        }

        if !self.client.is_configured() {
            tracing::warn!("OpenAI API key not configured, using default recommendations");
            return Recommendation::fallback();
        }

        let prompt = build_prompt(spikes, market);

        let reply = match self.client.chat(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("AI analysis failed for {}: {}", market.symbol, e);
                return Recommendation::fallback();
            }
        };

        match parse_recommendation(&reply) {
            Some(recommendation) => recommendation,
            None => {
                tracing::error!(
                    "Failed to parse AI response for {} ({} chars)",
                    market.symbol,
                    reply.len()
                );
                tracing::debug!("Unparseable AI response: {}", reply);
                Recommendation::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmSettings;
    use crate::models::{Recovery, SpikeDirection};
    use chrono::Utc;
    use serde_json::json;

    fn engine_for(server: &mockito::ServerGuard) -> RecommendationEngine {
        let client = OpenAIClient::new(LlmSettings {
            api_key: "sk-test".to_string(),
            base_url: server.url(),
            ..LlmSettings::default()
        })
        .unwrap();
        RecommendationEngine::new(client)
    }

    fn market() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "CRASH_1000".to_string(),
            current_price: 10005.0,
            spread: 15.0,
            volatility: 0.85,
        }
    }

    fn spikes() -> Vec<SpikeEvent> {
        vec![SpikeEvent {
            timestamp: Utc::now(),
            price: 9920.0,
            spike_size: 80.0,
            direction: SpikeDirection::Crash,
            recovery: Recovery::NotRecovered,
            max_retracement: 85.0,
        }]
    }

    fn completion(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    #[tokio::test]
    async fn test_no_spikes_skips_llm_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let rec = engine_for(&server).recommend(&[], &market()).await;

        assert!(rec.is_fallback());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_key_skips_llm_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let client = OpenAIClient::new(LlmSettings {
            api_key: "   ".to_string(),
            base_url: server.url(),
            ..LlmSettings::default()
        })
        .unwrap();
        let engine = RecommendationEngine::new(client);

        assert!(!engine.client().is_configured());
        assert!(engine.recommend(&spikes(), &market()).await.is_fallback());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_prose_wrapped_reply_is_extracted() {
        let mut server = mockito::Server::new_async().await;
        let reply = "Based on the data, here are my recommendations:\n{\"spike_threshold\": 70, \"cooldown_seconds\": 600, \"stop_loss_pips\": 30, \"take_profit_pips\": 60, \"risk_score\": 6, \"confidence\": 75, \"market_trend\": \"Bearish\", \"reasoning\": \"Frequent crashes\"}\nTrade carefully.";
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(reply))
            .expect(1)
            .create_async()
            .await;

        let rec = engine_for(&server).recommend(&spikes(), &market()).await;

        assert_eq!(rec.spike_threshold, 70.0);
        assert_eq!(rec.cooldown_seconds, 600);
        assert_eq!(rec.stop_loss_pips, 30.0);
        assert_eq!(rec.take_profit_pips, 60.0);
        assert_eq!(rec.risk_score, 6.0);
        assert_eq!(rec.confidence, 75.0);
        assert_eq!(rec.market_trend, "Bearish");
        assert_eq!(rec.reasoning, "Frequent crashes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_partial_reply_keeps_valid_fields() {
        let mut server = mockito::Server::new_async().await;
        let reply = r#"{"spike_threshold": 90, "stop_loss_pips": "wide", "confidence": 64}"#;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion(reply))
            .create_async()
            .await;

        let rec = engine_for(&server).recommend(&spikes(), &market()).await;

        assert_eq!(rec.spike_threshold, 90.0);
        assert_eq!(rec.stop_loss_pips, 20.0);
        assert_eq!(rec.confidence, 64.0);
        assert_eq!(rec.cooldown_seconds, 300);
        assert!(!rec.is_fallback());
    }

    #[tokio::test]
    async fn test_server_error_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream failure")
            .expect(1)
            .create_async()
            .await;

        let rec = engine_for(&server).recommend(&spikes(), &market()).await;

        assert!(rec.is_fallback());
        // Single attempt, no retries
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reply_without_json_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion("Sorry, I cannot provide trading advice."))
            .create_async()
            .await;

        let rec = engine_for(&server).recommend(&spikes(), &market()).await;
        assert!(rec.is_fallback());
    }

    #[tokio::test]
    async fn test_malformed_envelope_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let rec = engine_for(&server).recommend(&spikes(), &market()).await;
        assert!(rec.is_fallback());
    }

    #[tokio::test]
    async fn test_unconfigured_key_skips_llm_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let client = OpenAIClient::new(LlmSettings {
            base_url: server.url(),
            ..LlmSettings::default()
        })
        .unwrap();
        let rec = RecommendationEngine::new(client)
            .recommend(&spikes(), &market())
            .await;

        assert!(rec.is_fallback());
        mock.assert_async().await;
    }
}
