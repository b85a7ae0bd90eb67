//! Opt-in JSON trace logging for debugging redraw and teardown behavior.
//!
//! Logs go to a file, never to the terminal the bar is drawn on.

use crate::config::AppConfig;
use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<bool> = OnceLock::new();

pub fn tracing_log_path(config: &AppConfig) -> PathBuf {
    config
        .trace_log
        .clone()
        .unwrap_or_else(|| env::temp_dir().join("pinbar_trace.jsonl"))
}

/// Trace file to write to, or `None` when logging is off.
fn trace_destination(config: &AppConfig) -> Option<PathBuf> {
    (config.logs && !config.no_logs).then(|| tracing_log_path(config))
}

fn open_trace_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn install_json_subscriber(file: File) -> bool {
    let subscriber = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_timer(UtcTime::rfc_3339())
        .with_max_level(tracing::Level::TRACE)
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(Mutex::new(file))
        .finish();
    tracing::subscriber::set_global_default(subscriber).is_ok()
}

fn init_tracing_with(config: &AppConfig, once: &OnceLock<bool>) -> bool {
    let Some(path) = trace_destination(config) else {
        return false;
    };
    *once.get_or_init(|| match open_trace_file(&path) {
        Ok(file) => install_json_subscriber(file),
        Err(_) => false,
    })
}

/// Install the file subscriber once per process when `--logs` asks for it.
///
/// Returns whether this process is now tracing to the file.
pub fn init_tracing(config: &AppConfig) -> bool {
    init_tracing_with(config, &TRACING_INIT)
}
