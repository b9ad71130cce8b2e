//! # Logging Setup
//!
//! Installs the global `tracing` subscriber for a service.
//!
//! JSON output writes one flat object per event: `time` (RFC 3339 with
//! nanoseconds, UTC), `level`, `target`, `msg` and then every event field at
//! the top level, so the `http log` records read as flat objects and match
//! the keys existing log pipelines index on.

use chrono::{SecondsFormat, Utc};
use lib_core::{Config, LogFormat};
use serde_json::{Map, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{info, Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const MESSAGE_KEY: &str = "msg";

#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    #[error("Invalid log level `{level}`: {reason}")]
    Filter { level: String, reason: String },

    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}

// region: --- JSON records

/// Event formatter for [`LogFormat::Json`].
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonRecord;

impl<S, N> FormatEvent<S, N> for JsonRecord
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut record = Map::new();
        record.insert(
            TIME_KEY.to_string(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true).into(),
        );
        record.insert(LEVEL_KEY.to_string(), meta.level().as_str().to_lowercase().into());
        record.insert("target".to_string(), meta.target().into());
        event.record(&mut FieldVisitor(&mut record));

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

struct FieldVisitor<'a>(&'a mut Map<String, Value>);

impl FieldVisitor<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        let key = match field.name() {
            "message" => MESSAGE_KEY,
            name => name,
        };
        self.0.insert(key.to_string(), value);
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{value:?}").into());
    }
}

// endregion: --- JSON records

/// Build the level filter from a directive such as `info,sqlx=warn`.
pub fn env_filter(level: &str) -> Result<EnvFilter, LogInitError> {
    EnvFilter::try_new(level).map_err(|e| LogInitError::Filter {
        level: level.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber described by `config`.
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init_logging(config: &Config) -> Result<(), LogInitError> {
    let filter = env_filter(&config.log_level)?;

    let layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .event_format(JsonRecord)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_timer(ChronoUtc::rfc_3339())
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| LogInitError::AlreadyInitialized(e.to_string()))?;

    info!(
        service = %config.service_name,
        level = %config.log_level,
        format = %config.log_format,
        "Logging initialized"
    );
    Ok(())
}
