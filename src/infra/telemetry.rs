use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "kvcache_write_total",
            Unit::Count,
            "Total number of cache entries written (inserted or overwritten)."
        );
        describe_counter!(
            "kvcache_read_hit_total",
            Unit::Count,
            "Total number of reads that found an active entry."
        );
        describe_counter!(
            "kvcache_read_miss_total",
            Unit::Count,
            "Total number of reads for missing or soft-deleted keys."
        );
        describe_counter!(
            "kvcache_delete_total",
            Unit::Count,
            "Total number of delete requests applied."
        );
        describe_counter!(
            "kvcache_validation_failure_total",
            Unit::Count,
            "Total number of requests rejected by key/value validation."
        );
    });
}
