//! Per-invocation run log.
//!
//! Every run writes `deployment_logs/deployment_log_{env}_{YYYYMMDD_HHMMSS}.log`
//! with one line per event: `{timestamp} - {LEVEL} - {message}`. The log is a
//! `tracing` layer, so any `MakeWriter` can stand in for the file.

use crate::error::Result;
use crate::{io, paths};
use chrono::{DateTime, Local};
use std::fmt;
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

pub fn file_name(environment: &str, at: DateTime<Local>) -> String {
    format!(
        "deployment_log_{environment}_{}.log",
        at.format("%Y%m%d_%H%M%S")
    )
}

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

/// The log file for one run. Opened for append, so a second run in the same
/// second adds to the existing record.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Create the log file under `{root}/deployment_logs`, creating the
    /// directory if needed.
    pub fn create(root: &Path, environment: &str, at: DateTime<Local>) -> Result<Self> {
        let dir = paths::log_dir(root);
        io::ensure_dir(&dir)?;
        let path = dir.join(file_name(environment, at));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_writer(self) -> Mutex<File> {
        Mutex::new(self.file)
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// `{YYYY-MM-DD HH:MM:SS,mmm} - {LEVEL} - {message}`
pub struct RunLogFormat;

impl<S, N> FormatEvent<S, N> for RunLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        write!(writer, "{now} - {} - ", level_name(*event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        _ => "TRACE",
    }
}

/// A layer writing run log lines at INFO and above to `writer`.
pub fn layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(RunLogFormat)
        .with_writer(writer)
        .with_filter(LevelFilter::INFO)
}
