use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Access decisions by outcome: bad_request, payment_required, granted, error
pub static DECISIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("stacks_gate_decisions_total", "Access decisions by outcome"),
        &["outcome"],
    )
    .expect("valid metric definition")
});

// Generator fetches by result: ok, error
pub static GENERATOR_FETCHES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stacks_gate_generator_fetches_total",
            "Resource generator fetches by result",
        ),
        &["result"],
    )
    .expect("valid metric definition")
});

pub static GENERATOR_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "stacks_gate_generator_latency_seconds",
            "Resource generator latency",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .expect("valid metric definition")
});

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 3] = [
        Box::new(DECISIONS_TOTAL.clone()),
        Box::new(GENERATOR_FETCHES.clone()),
        Box::new(GENERATOR_LATENCY.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => tracing::error!("Failed to register metric: {}", e),
        }
    }
}
