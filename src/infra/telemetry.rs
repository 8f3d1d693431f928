use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "koktail_cache_hit_total",
            Unit::Count,
            "Total number of landing cache hits."
        );
        describe_counter!(
            "koktail_cache_miss_total",
            Unit::Count,
            "Total number of landing cache misses, including undecodable entries."
        );
        describe_counter!(
            "koktail_cache_error_total",
            Unit::Count,
            "Cache backend failures absorbed as a miss or a no-op."
        );
        describe_counter!(
            "koktail_cache_stale_fill_skipped_total",
            Unit::Count,
            "Cache fills dropped because the entry was invalidated during the load."
        );
        describe_counter!(
            "koktail_activity_evictions_total",
            Unit::Count,
            "Members removed from an activity after it reached their limit."
        );
        describe_histogram!(
            "koktail_capacity_enforce_ms",
            Unit::Milliseconds,
            "Duration of one count-and-evict pass in milliseconds."
        );
    });
}
