use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Counters for inbound webhook deliveries. Labels are bounded: `provider` is a
/// fixed tag set and `outcome` is either `succeeded` or an error kind.
#[derive(Clone)]
pub struct WebhookMetrics {
    registry: Registry,
    deliveries_total: IntCounterVec,
    processing_seconds: HistogramVec,
}

impl WebhookMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let deliveries_total = IntCounterVec::new(
            Opts::new(
                "webhook_deliveries_total",
                "Webhook deliveries grouped by provider and outcome",
            ),
            &["provider", "outcome"],
        )?;
        let processing_seconds = HistogramVec::new(
            HistogramOpts::new(
                "webhook_processing_seconds",
                "Time spent verifying, parsing and dispatching a webhook delivery",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["provider"],
        )?;
        registry.register(Box::new(deliveries_total.clone()))?;
        registry.register(Box::new(processing_seconds.clone()))?;
        Ok(Self { registry, deliveries_total, processing_seconds })
    }

    pub fn record_delivery(&self, provider: &str, outcome: &str, elapsed_secs: f64) {
        self.deliveries_total.with_label_values(&[provider, outcome]).inc();
        self.processing_seconds.with_label_values(&[provider]).observe(elapsed_secs);
    }

    pub fn delivery_count(&self, provider: &str, outcome: &str) -> u64 {
        self.deliveries_total.with_label_values(&[provider, outcome]).get()
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> prometheus::Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
