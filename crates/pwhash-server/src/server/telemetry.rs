//! # Telemetry
//!
//! Structured logs are always written to the console through
//! `tracing_subscriber::fmt`, filtered by `RUST_LOG` (default `info`). Events
//! themselves are only emitted when the `tracing` feature (on by default) is
//! enabled.
//!
//! ## Feature matrix
//!
//! - `tracing`: emits `tracing` events from the server and the `pwhash` core.
//! - `metrics`: records OpenTelemetry counters for incoming requests.
//! - `stdout`: exports metrics to stdout every five seconds.
//!
//! ```bash
//! cargo run --features metrics,stdout
//! ```

// Disallow using `stdout` without `metrics`
#[cfg(all(feature = "stdout", not(feature = "metrics")))]
compile_error!("The 'stdout' feature requires 'metrics' to be enabled.");

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Meter},
};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{Resource, metrics as sdkmetrics};
#[cfg(feature = "metrics")]
use opentelemetry_semantic_conventions as semvcns;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

pub struct TelemetryProviders {
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down any exporters. Errors are reported on stderr
    /// because the subscriber may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "metrics")]
    {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let scope = InstrumentationScope::builder("pwhash")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(semvcns::SCHEMA_URL)
            .build();
        init_metric_handles(opentelemetry::global::meter_with_scope(scope));
    }

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(feature = "metrics")]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("pwhash")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

#[cfg_attr(not(feature = "metrics"), allow(dead_code))]
const HASH_REQUESTS_METRIC: &str = "hash_requests";
#[cfg_attr(not(feature = "metrics"), allow(dead_code))]
const RESULT_LOOKUPS_METRIC: &str = "result_lookups";
#[cfg_attr(not(feature = "metrics"), allow(dead_code))]
const STATS_REQUESTS_METRIC: &str = "stats_requests";
#[cfg_attr(not(feature = "metrics"), allow(dead_code))]
const UNSUPPORTED_METHODS_METRIC: &str = "unsupported_methods";

#[cfg(feature = "metrics")]
static HASH_REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static RESULT_LOOKUPS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static STATS_REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static UNSUPPORTED_METHODS: OnceLock<Counter<u64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = HASH_REQUESTS.set(
        meter
            .u64_counter(HASH_REQUESTS_METRIC)
            .with_description("Accepted password hash requests")
            .build(),
    );

    let _ = RESULT_LOOKUPS.set(
        meter
            .u64_counter(RESULT_LOOKUPS_METRIC)
            .with_description("Digest lookups, labelled by whether a digest was found")
            .build(),
    );

    let _ = STATS_REQUESTS.set(
        meter
            .u64_counter(STATS_REQUESTS_METRIC)
            .with_description("Statistics requests")
            .build(),
    );

    let _ = UNSUPPORTED_METHODS.set(
        meter
            .u64_counter(UNSUPPORTED_METHODS_METRIC)
            .with_description("Requests rejected for using an unsupported HTTP method")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn increment_hash_requests() {
    if let Some(counter) = HASH_REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_hash_requests() {}

#[cfg(feature = "metrics")]
pub fn record_result_lookup(found: bool) {
    if let Some(counter) = RESULT_LOOKUPS.get() {
        counter.add(1, &[KeyValue::new("found", found)]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_result_lookup(_found: bool) {}

#[cfg(feature = "metrics")]
pub fn increment_stats_requests() {
    if let Some(counter) = STATS_REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_stats_requests() {}

#[cfg(feature = "metrics")]
pub fn increment_unsupported_methods() {
    if let Some(counter) = UNSUPPORTED_METHODS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_unsupported_methods() {}
