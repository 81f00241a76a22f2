/// Manual check of a running backend server
///
/// Exercises health, stats, analysis, cached recommendation lookup and the
/// exact payload shape the MT5 EA sends.
///
/// Run with: cargo run --bin test_backend -- --url http://localhost:5001

use chrono::Utc;
use clap::Parser;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use spikebot::synthetic::{sample_series, IndexKind, SyntheticSeriesGenerator};
use std::time::Duration;

#[derive(Debug, Parser)]
struct Args {
    /// Backend base URL
    #[arg(long, default_value = "http://localhost:5001")]
    url: String,

    /// Symbol used for analysis checks
    #[arg(long, default_value = "CRASH_1000")]
    symbol: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 40)]
    timeout: u64,

    /// Seed for the synthetic spike series
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

struct Backend {
    client: Client,
    base_url: String,
}

impl Backend {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get(&self, path: &str) -> anyhow::Result<(StatusCode, Value)> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        Ok((status, response.json().await.unwrap_or(Value::Null)))
    }

    async fn post(&self, path: &str, body: &Value) -> anyhow::Result<(StatusCode, Value)> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        Ok((status, response.json().await.unwrap_or(Value::Null)))
    }
}

async fn test_health(backend: &Backend) -> anyhow::Result<bool> {
    println!("=== Testing Health Check ===");
    let (status, body) = backend.get("/health").await?;
    if status != StatusCode::OK {
        println!("✗ Health check failed: HTTP {}", status);
        return Ok(false);
    }

    println!("✓ Health check successful");
    println!("  Status: {}", body["status"]);
    println!("  OpenAI Configured: {}", body["openai_configured"]);
    Ok(true)
}

async fn test_stats(backend: &Backend) -> anyhow::Result<bool> {
    println!("\n=== Testing Stats Endpoint ===");
    let (status, body) = backend.get("/stats").await?;
    if status != StatusCode::OK {
        println!("✗ Stats failed: HTTP {}", status);
        return Ok(false);
    }

    println!("✓ Stats endpoint successful");
    println!("  Total Symbols Analyzed: {}", body["total_symbols_analyzed"]);
    println!("  OpenAI Model: {}", body["openai_model"]);
    Ok(true)
}

async fn test_analysis(backend: &Backend, symbol: &str, seed: u64) -> anyhow::Result<bool> {
    println!("\n=== Testing Analysis Endpoint ===");

    let bars = SyntheticSeriesGenerator::new(seed).generate(IndexKind::Crash, 300);
    let payload = json!({
        "symbol": symbol,
        "price_data": bars,
        "market_info": {"spread": 15, "volatility": 0.85}
    });

    let (status, body) = backend.post("/analyze", &payload).await?;
    if status != StatusCode::OK {
        println!("✗ Analysis failed: HTTP {}", status);
        println!("  Response: {}", body);
        return Ok(false);
    }

    println!("✓ Analysis successful");
    println!("  Spike Threshold: {} pips", body["spike_threshold"]);
    println!("  Cooldown: {} seconds", body["cooldown_seconds"]);
    println!("  Stop Loss: {} pips", body["stop_loss_pips"]);
    println!("  Take Profit: {} pips", body["take_profit_pips"]);
    println!("  Risk Score: {}/10", body["risk_score"]);
    println!("  Confidence: {}%", body["confidence"]);
    println!("  Market Trend: {}", body["market_trend"]);
    Ok(true)
}

async fn test_recommendations(backend: &Backend, symbol: &str) -> anyhow::Result<bool> {
    println!("\n=== Testing Recommendations Endpoint ===");
    let (status, body) = backend.get(&format!("/recommendations/{}", symbol)).await?;

    match status {
        StatusCode::OK => {
            println!("✓ Recommendations retrieved successfully");
            println!("  Spikes Analyzed: {}", body["spikes_analyzed"]);
            println!("  Last Analysis: {}", body["last_analysis"]);
            Ok(true)
        }
        StatusCode::NOT_FOUND => {
            println!("ℹ No cached recommendations found (normal before the first analysis)");
            Ok(true)
        }
        other => {
            println!("✗ Recommendations failed: HTTP {}", other);
            Ok(false)
        }
    }
}

async fn test_mt5_compatibility(backend: &Backend, symbol: &str) -> anyhow::Result<bool> {
    println!("\n=== Testing MT5 Compatibility ===");

    // Naive timestamps, integer spread: exactly what the EA sends
    let bars: Vec<Value> = sample_series(Utc::now())
        .iter()
        .map(|bar| {
            json!({
                "timestamp": bar.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "open": bar.open,
                "high": bar.high,
                "low": bar.low,
                "close": bar.close,
            })
        })
        .collect();
    let payload = json!({
        "symbol": symbol,
        "price_data": bars,
        "market_info": {"spread": 20, "volatility": 0.90}
    });

    let (status, _) = backend.post("/analyze", &payload).await?;
    if status == StatusCode::OK {
        println!("✓ MT5 data format compatible");
        Ok(true)
    } else {
        println!("✗ MT5 compatibility failed: HTTP {}", status);
        Ok(false)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let backend = Backend {
        client: Client::builder()
            .timeout(Duration::from_secs(args.timeout))
            .build()?,
        base_url: args.url.clone(),
    };

    println!("AI Backend Server Test Suite");
    println!("{}", "=".repeat(40));
    println!("Testing server at: {}", args.url);
    println!("Test started at: {}\n", Utc::now());

    let mut results = Vec::new();
    results.push(("Health Check", test_health(&backend).await));
    results.push(("Stats", test_stats(&backend).await));
    results.push(("Analysis", test_analysis(&backend, &args.symbol, args.seed).await));
    results.push(("Recommendations", test_recommendations(&backend, &args.symbol).await));
    results.push(("MT5 Compatibility", test_mt5_compatibility(&backend, &args.symbol).await));

    let total = results.len();
    let mut passed = 0;
    for (name, result) in &results {
        match result {
            Ok(true) => passed += 1,
            Ok(false) => {}
            Err(e) => println!("✗ {} failed with error: {}", name, e),
        }
    }

    println!("\n{}", "=".repeat(40));
    println!("Test Results: {}/{} tests passed", passed, total);
    if passed == total {
        println!("✓ All tests passed! Backend server is ready for the MT5 EA.");
    } else {
        println!("✗ Some tests failed. Please check the server configuration.");
    }

    Ok(())
}
