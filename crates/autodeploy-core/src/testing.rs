//! Shared test doubles.

use crate::error::{DeployError, Result};
use crate::manifest::DeploymentUnit;
use crate::run_log;
use crate::session::Session;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

/// Records scripts; any script containing `RAISE` fails.
#[derive(Default)]
pub(crate) struct RecordingSession {
    pub executed: Vec<String>,
}

impl Session for RecordingSession {
    fn execute_script(&mut self, script: &str) -> Result<Vec<Option<String>>> {
        self.executed.push(script.to_string());
        if script.contains("RAISE") {
            return Err(DeployError::Execution("raised by test script".to_string()));
        }
        Ok(vec![Some("ok".to_string())])
    }
}

#[derive(Clone, Default)]
pub(crate) struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl CaptureWriter {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with the run log routed into memory; returns its output and the log text.
pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let writer = CaptureWriter::default();
    let subscriber = tracing_subscriber::registry().with(run_log::layer(writer.clone()));
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, writer.contents())
}

pub(crate) fn write_script(root: &Path, unit: &DeploymentUnit, body: &str) -> PathBuf {
    let path = crate::script::resolve(root, unit);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, body).unwrap();
    path
}
