//! Test Request Producer
//!
//! Generates and publishes transaction requests to NATS for exercising the
//! orchestrator. A small pool of senders is reused so profiles build up.

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use risk_orchestrator::types::{BiometricSample, Channel, ClientMetadata, TransactionRequest};
use std::time::Duration;
use tracing::{info, warn};

const SENDER_POOL: u32 = 50;

/// Request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    request_counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            request_counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.request_counter += 1;
        format!("tx_{:012}", self.request_counter)
    }

    fn random_ip(&mut self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.rng.gen_range(1..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(1..255)
        )
    }

    /// Generate a routine request from a known sender and device
    fn generate_legitimate(&mut self) -> TransactionRequest {
        let sender = self.rng.gen_range(0..SENDER_POOL);
        let id = self.next_id();
        let ip_address = self.random_ip();

        TransactionRequest::new(
            id,
            format!("user_{sender}"),
            format!("merchant_{}", self.rng.gen_range(1..40)),
            self.rng.gen_range(10.0..300.0),
        )
        .with_channel(*self.random_choice(&[Channel::Web, Channel::Mobile, Channel::Pos]))
        .with_merchant_category(
            self.random_choice(&["grocery", "restaurants", "retail", "utilities"])
                .to_string(),
        )
        .with_client(ClientMetadata {
            ip_address: Some(ip_address),
            device_fingerprint: Some(format!("fp_user_{sender}")),
            country: Some("US".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            proxy_detected: false,
        })
        .with_biometric(BiometricSample {
            typing_interval_ms: self.rng.gen_range(150.0..220.0),
            touch_pressure: Some(self.rng.gen_range(0.3..0.6)),
            session_duration_secs: self.rng.gen_range(30.0..300.0),
        })
    }

    /// Generate a request with several risk indicators at once
    fn generate_suspicious(&mut self) -> TransactionRequest {
        let sender = self.rng.gen_range(0..SENDER_POOL);
        let id = self.next_id();
        let ip_address = self.random_ip();
        // night time
        let timestamp = Utc::now().date_naive().and_hms_opt(self.rng.gen_range(0..5), 17, 0);

        let mut request = TransactionRequest::new(
            id,
            format!("user_{sender}"),
            format!("acct_{:08x}", self.rng.gen::<u32>()),
            self.rng.gen_range(2_000.0..60_000.0),
        )
        .with_channel(*self.random_choice(&[Channel::Transfer, Channel::Web]))
        .with_merchant_category(
            self.random_choice(&["gambling", "crypto", "money_transfer"])
                .to_string(),
        )
        .with_client(ClientMetadata {
            ip_address: self.rng.gen_bool(0.7).then_some(ip_address),
            device_fingerprint: Some(format!("fp_{:016x}", self.rng.gen::<u64>())),
            country: Some(self.random_choice(&["RU", "NG", "KP", "US"]).to_string()),
            user_agent: None,
            proxy_detected: self.rng.gen_bool(0.6),
        })
        .with_biometric(BiometricSample {
            typing_interval_ms: self.rng.gen_range(20.0..60.0),
            touch_pressure: None,
            session_duration_secs: self.rng.gen_range(1.0..10.0),
        });

        if let Some(naive) = timestamp {
            request = request.with_timestamp(naive.and_utc() - ChronoDuration::days(1));
        }
        request
    }

    fn random_choice<'a, T>(&mut self, choices: &'a [T]) -> &'a T {
        &choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Request Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("transactions.requests");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} requests...", count);

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for i in 0..count {
        let request = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };

        let payload = serde_json::to_vec(&request)?;

        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} legitimate, {} suspicious)",
                i + 1,
                count,
                legitimate_count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;
    info!(
        "Completed! Published {} requests ({} legitimate, {} suspicious)",
        count, legitimate_count, suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let request = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        if let Err(e) = request.validate() {
            warn!(transaction_id = %request.transaction_id, error = %e, "Generated an invalid request");
        }

        let json = serde_json::to_string_pretty(&request)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
