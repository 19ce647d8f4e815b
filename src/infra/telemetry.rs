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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "lettera_subscribe_total",
            Unit::Count,
            "Total number of accepted subscription requests."
        );
        describe_counter!(
            "lettera_unsubscribe_total",
            Unit::Count,
            "Total number of processed unsubscribe requests."
        );
        describe_counter!(
            "lettera_emails_sent_total",
            Unit::Count,
            "Total number of issue emails accepted by the mail provider."
        );
        describe_counter!(
            "lettera_emails_failed_total",
            Unit::Count,
            "Total number of issue emails that failed to send."
        );
        describe_counter!(
            "lettera_assistant_requests_total",
            Unit::Count,
            "Total number of assistant completions proxied upstream."
        );
    });
}
