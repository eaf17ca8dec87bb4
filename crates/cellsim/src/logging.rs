//! provides logging helpers

use std::fmt;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use tracing::field::Field;
use tracing::field::Visit;
use tracing::Event;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::FilterExt;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

pub const METRICS_TARGET: &str = "metrics";

/// Writes the pre-encoded `msg` field of a metrics event as-is.
struct MetricLineFormatter;

#[derive(Default)]
struct MessageVisitor {
    msg: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "msg" {
            self.msg = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "msg" {
            self.msg = Some(format!("{value:?}"));
        }
    }
}

impl<S, N> FormatEvent<S, N> for MetricLineFormatter
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        match visitor.msg {
            Some(line) => writeln!(writer, "{}", line.trim_end()),
            None => Ok(()),
        }
    }
}

/// initiate the global tracing subscriber
///
/// Metrics lines go to a daily rolling file when `metrics_file` is set and to
/// stdout otherwise; everything else goes to stderr.
pub(crate) fn init(metrics_file: Option<&Path>) -> Result<WorkerGuard> {
    let fmt_layer = utils::logging::get_fmt_layer();
    let fmt_layer = fmt_layer.with_filter(utils::logging::env_filter().and(
        filter::filter_fn(|metadata| metadata.target() != METRICS_TARGET),
    ));

    let (writer, guard) = match metrics_file {
        Some(metrics_file) => {
            let dir = metrics_file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file = metrics_file
                .file_name()
                .and_then(|f| f.to_str())
                .with_context(|| format!("invalid metrics file {}", metrics_file.display()))?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(file)
                .max_log_files(3)
                .build(dir)
                .context("failed to create rolling file appender")?;
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let metrics_layer = layer()
        .event_format(MetricLineFormatter)
        .fmt_fields(tracing_subscriber::fmt::format::DefaultFields::new())
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(filter::filter_fn(|metadata| {
            metadata.target() == METRICS_TARGET
        }));

    registry().with(fmt_layer).with(metrics_layer).init();
    Ok(guard)
}
