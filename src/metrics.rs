//! Query metrics and tracing helpers.
//!
//! Metrics are exported through OpenTelemetry into a Prometheus registry
//! (`metrics` feature). Span helpers live in [`tracing_helpers`] (`tracing`
//! feature).

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::{AranguardMetrics, METRICS};

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::Registry;

    pub static METRICS: Lazy<AranguardMetrics> = Lazy::new(AranguardMetrics::init);

    pub struct AranguardMetrics {
        pub registry: Registry,
        pub provider: SdkMeterProvider,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
    }

    impl AranguardMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => SdkMeterProvider::builder().with_reader(exporter).build(),
                Err(err) => {
                    log::warn!("prometheus exporter unavailable, metrics are not exported: {err}");
                    SdkMeterProvider::builder().build()
                }
            };
            let meter = provider.meter("aranguard");

            let queries_total = meter
                .u64_counter("aranguard_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_errors_total = meter
                .u64_counter("aranguard_query_errors_total")
                .with_description("Statements that failed in the backend")
                .build();

            let query_duration = meter
                .f64_histogram("aranguard_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            Self {
                registry,
                provider,
                queries_total,
                query_errors_total,
                query_duration,
            }
        }

        pub fn record_query(&self, elapsed: std::time::Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }
    }
}

/// Span constructors, entered with `.entered()` around the work they describe.
#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn execute_query_span(aql: &str) -> Span {
        info_span!("aranguard.execute_query", aql = %aql)
    }

    pub fn via_resolution_span(relation: &str) -> Span {
        info_span!("aranguard.resolve_via", relation = %relation)
    }

    pub fn eager_load_span(relation: &str, parents: usize) -> Span {
        info_span!("aranguard.eager_load", relation = %relation, parents = parents)
    }
}
