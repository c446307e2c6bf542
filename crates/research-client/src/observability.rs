//! Process-wide tracing setup for research sessions.
//!
//! Every session runs inside a `research_session` span carrying its id, so
//! the JSON output attaches `session_id` to each event without the call sites
//! repeating it.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const ENABLED_VAR: &str = "RESEARCH_OBSERVABILITY_ENABLED";
const LEVEL_VAR: &str = "RESEARCH_LOG_LEVEL";
const JSON_PATH_VAR: &str = "RESEARCH_JSON_LOG_PATH";
const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "research.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log records are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogSink {
    /// Compact lines on stderr; stdout stays free for answers.
    Console,
    /// JSON lines with span context, appended to this file.
    JsonFile(PathBuf),
}

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub enabled: bool,
    /// Explicit `RESEARCH_LOG_LEVEL` directive; `RUST_LOG` applies otherwise.
    pub level: Option<String>,
    pub sink: LogSink,
}

impl LogSettings {
    /// Reads `RESEARCH_OBSERVABILITY_ENABLED`, `RESEARCH_LOG_LEVEL` and
    /// `RESEARCH_JSON_LOG_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup(ENABLED_VAR)
            .and_then(|value| parse_switch(&value))
            .unwrap_or(true);
        let level = lookup(LEVEL_VAR).filter(|level| !level.trim().is_empty());
        let sink = match lookup(JSON_PATH_VAR) {
            Some(path) if !path.trim().is_empty() => LogSink::JsonFile(PathBuf::from(path)),
            _ => LogSink::Console,
        };
        Self {
            enabled,
            level,
            sink,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if let Some(level) = &self.level
            && let Ok(filter) = EnvFilter::try_new(level)
        {
            return filter;
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Splits a log path into the directory and file name the appender expects.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Installs the global subscriber from `LogSettings::from_env`, once per
/// process. Later calls are no-ops.
pub fn init_observability() {
    init_with(LogSettings::from_env());
}

/// Installs the global subscriber from explicit settings, once per process.
pub fn init_with(settings: LogSettings) {
    INIT.get_or_init(|| {
        if !settings.enabled {
            return;
        }
        let filter = settings.env_filter();
        match &settings.sink {
            LogSink::JsonFile(path) => {
                let (dir, file_name) = split_log_path(path);
                let _ = std::fs::create_dir_all(&dir);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(false)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
            LogSink::Console => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
        }
    });
}
