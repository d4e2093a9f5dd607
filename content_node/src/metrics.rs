//! Deploy pipeline metrics.
//!
//! Recording is best-effort: registration failures are logged and the
//! pipeline never waits on or fails because of metrics.

use log::warn;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

#[derive(Clone)]
pub struct DeployMetrics {
    registry: Registry,
    files_stored: IntCounter,
    bytes_stored: IntCounter,
    deploys: IntCounterVec,
    stage_duration: HistogramVec,
}

impl Default for DeployMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let files_stored = IntCounter::new("content_files_stored_total", "Number of content files stored")
            .expect("valid metric definition");
        let bytes_stored = IntCounter::new("content_bytes_stored_total", "Number of content bytes stored")
            .expect("valid metric definition");
        let deploys = IntCounterVec::new(
            Opts::new("content_deploys_total", "Number of deploys by outcome"),
            &["outcome"],
        )
        .expect("valid metric definition");
        let stage_duration = HistogramVec::new(
            HistogramOpts::new("content_deploy_stage_seconds", "Deploy pipeline stage duration in seconds"),
            &["stage"],
        )
        .expect("valid metric definition");

        for collector in [
            Box::new(files_stored.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(bytes_stored.clone()),
            Box::new(deploys.clone()),
            Box::new(stage_duration.clone()),
        ] {
            if let Err(e) = registry.register(collector) {
                warn!("Failed to register deploy metric: {}", e);
            }
        }

        Self {
            registry,
            files_stored,
            bytes_stored,
            deploys,
            stage_duration,
        }
    }

    pub fn record_file_stored(&self, bytes: usize) {
        self.files_stored.inc();
        self.bytes_stored.inc_by(bytes as u64);
    }

    pub fn record_stage(&self, stage: &str, elapsed: Duration) {
        self.stage_duration
            .with_label_values(&[stage])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.deploys.with_label_values(&[outcome]).inc();
    }

    pub fn files_stored(&self) -> u64 {
        self.files_stored.get()
    }

    pub fn bytes_stored(&self) -> u64 {
        self.bytes_stored.get()
    }

    pub fn deploys(&self, outcome: &str) -> u64 {
        self.deploys.with_label_values(&[outcome]).get()
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
