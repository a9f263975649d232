//! Performance metrics and statistics tracking for the risk orchestrator.

use crate::types::decision::{RiskAction, TransactionResponse};
use crate::types::signal::SignalStatus;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_PROCESSING_SAMPLES: usize = 10_000;
const MAX_SIGNAL_SAMPLES: usize = 1_000;

/// Metrics collector for orchestrator performance
pub struct PipelineMetrics {
    /// Total responses produced
    pub requests_processed: AtomicU64,
    /// Responses produced by the failsafe path
    pub failsafe_responses: AtomicU64,
    /// Requests rejected by validation
    pub requests_rejected: AtomicU64,
    /// Decisions by action
    decisions_by_action: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Signal latencies (in microseconds)
    signal_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Signal outcomes by status
    signal_outcomes: RwLock<HashMap<String, SignalOutcomeCounts>>,
    /// Risk score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

/// How often a signal completed, timed out or failed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignalOutcomeCounts {
    pub completed: u64,
    pub timed_out: u64,
    pub failed: u64,
}

impl SignalOutcomeCounts {
    fn record(&mut self, status: SignalStatus) {
        match status {
            SignalStatus::Completed => self.completed += 1,
            SignalStatus::TimedOut => self.timed_out += 1,
            SignalStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.completed + self.timed_out + self.failed
    }
}

fn action_label(action: RiskAction) -> &'static str {
    match action {
        RiskAction::Allow => "allow",
        RiskAction::Review => "review",
        RiskAction::Block => "block",
    }
}

fn percentile(sorted: &[u64], q: f64) -> u64 {
    let index = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
    sorted[index]
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            failsafe_responses: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            decisions_by_action: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            signal_times: RwLock::new(HashMap::new()),
            signal_outcomes: RwLock::new(HashMap::new()),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a produced response
    pub fn record_response(&self, response: &TransactionResponse) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        if response.failsafe {
            self.failsafe_responses.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut by_action) = self.decisions_by_action.write() {
            *by_action
                .entry(action_label(response.decision.action).to_string())
                .or_insert(0) += 1;
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(response.processing_time_us);
            // Keep only the most recent samples
            if times.len() > MAX_PROCESSING_SAMPLES {
                times.drain(0..MAX_PROCESSING_SAMPLES / 2);
            }
        }

        let bucket = (response.decision.score * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }

        for signal in &response.signals {
            self.record_signal(signal.kind.as_str(), signal.status, signal.latency_us);
        }
    }

    /// Record a validation rejection
    pub fn record_rejection(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn record_signal(&self, signal: &str, status: SignalStatus, latency_us: u64) {
        if let Ok(mut times) = self.signal_times.write() {
            let signal_times = times.entry(signal.to_string()).or_default();
            signal_times.push(latency_us);
            if signal_times.len() > MAX_SIGNAL_SAMPLES {
                signal_times.drain(0..MAX_SIGNAL_SAMPLES / 2);
            }
        }
        if let Ok(mut outcomes) = self.signal_outcomes.write() {
            outcomes.entry(signal.to_string()).or_default().record(status);
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self
            .processing_times
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: percentile(&sorted, 0.95),
            p99_us: percentile(&sorted, 0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get per-signal latency and outcome stats
    pub fn get_signal_stats(&self) -> HashMap<String, SignalStats> {
        let times = self
            .signal_times
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let outcomes = self
            .signal_outcomes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut stats = HashMap::new();

        for (signal, signal_times) in times.iter() {
            if signal_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = signal_times.clone();
            sorted.sort_unstable();
            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();

            stats.insert(
                signal.clone(),
                SignalStats {
                    mean_us: sum / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: percentile(&sorted, 0.99),
                    outcomes: outcomes.get(signal).copied().unwrap_or_default(),
                },
            );
        }

        stats
    }

    /// Fraction of responses that came from the failsafe path
    pub fn failsafe_rate(&self) -> f64 {
        let total = self.requests_processed.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.failsafe_responses.load(Ordering::Relaxed) as f64 / total as f64
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get score distribution
    pub fn get_score_distribution(&self) -> [u64; 10] {
        *self
            .score_buckets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get decisions by action
    pub fn get_decisions_by_action(&self) -> HashMap<String, u64> {
        self.decisions_by_action
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let processed = self.requests_processed.load(Ordering::Relaxed);
        let rejected = self.requests_rejected.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let decisions = self.get_decisions_by_action();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            RISK ORCHESTRATOR - METRICS SUMMARY               ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests Analyzed: {:>8}  │  Throughput: {:>6.1} req/s    ║",
            processed, throughput
        );
        info!(
            "║ Rejected:          {:>8}  │  Failsafe:   {:>6.1}%         ║",
            rejected,
            self.failsafe_rate() * 100.0
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Decisions:                                                   ║");
        for (action, count) in &decisions {
            let pct = if processed > 0 {
                (*count as f64 / processed as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)                                ║", action, count, pct);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Risk Score Distribution:                                     ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let signal_stats = self.get_signal_stats();
        if !signal_stats.is_empty() {
            info!("Signal Latencies (μs):");
            for (signal, stats) in &signal_stats {
                info!(
                    "  {}: mean={} p50={} p99={} (completed={} timed_out={} failed={})",
                    signal,
                    stats.mean_us,
                    stats.p50_us,
                    stats.p99_us,
                    stats.outcomes.completed,
                    stats.outcomes.timed_out,
                    stats.outcomes.failed
                );
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Signal-specific statistics
#[derive(Debug)]
pub struct SignalStats {
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub outcomes: SignalOutcomeCounts,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
