//! Short, display-ready descriptions of tool-activity records.
//!
//! A remote enrichment service is tried first. Any failure there falls back to
//! a deterministic heuristic so a progress entry is always produced.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{ClientError, EnrichError};

const RAW_CUTOFF: usize = 100;
const FIELD_CUTOFF: usize = 50;
const ELLIPSIS: &str = "...";
const EMPTY_RECORD: &str = "Processing tool activity";

/// Outcome of one summarization, distinguishing where the text came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Summary {
    /// The enrichment service produced the text.
    Remote(String),
    /// Enrichment was unavailable or failed; the heuristic produced the text.
    Fallback(String),
}

impl Summary {
    pub fn text(&self) -> &str {
        match self {
            Self::Remote(text) | Self::Fallback(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Remote(text) | Self::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Remote enrichment contract.
#[async_trait::async_trait]
pub trait Enricher: Send + Sync {
    /// Returns a description for the serialized tool-activity record.
    async fn enrich(&self, record: &str) -> Result<String, EnrichError>;
}

/// Summarizer used by sessions for `on_tool_start`/`on_tool_end` events.
#[derive(Clone, Default)]
pub struct LogSummarizer {
    enricher: Option<Arc<dyn Enricher>>,
}

impl LogSummarizer {
    /// Summarizer that tries `enricher` before the heuristic.
    pub fn new(enricher: Arc<dyn Enricher>) -> Self {
        Self {
            enricher: Some(enricher),
        }
    }

    /// Summarizer that never leaves the process.
    pub fn heuristic_only() -> Self {
        Self { enricher: None }
    }

    /// Describes one record. Never fails.
    pub async fn summarize(&self, record: &str) -> Summary {
        if let Some(enricher) = &self.enricher {
            match enricher.enrich(record).await {
                Ok(text) if !text.trim().is_empty() => {
                    return Summary::Remote(text.trim().to_string());
                }
                Ok(_) => debug!(event = "summary.fallback", reason = "blank"),
                Err(err) => debug!(event = "summary.fallback", error = %err),
            }
        }
        Summary::Fallback(heuristic_summary(record))
    }
}

#[derive(Deserialize)]
struct EnrichResponse {
    content: String,
}

/// `Enricher` backed by an HTTP endpoint that answers `{ "content": string }`.
pub struct HttpEnricher {
    client: reqwest::Client,
    url: url::Url,
}

impl HttpEnricher {
    pub fn new(url: url::Url, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build enrichment client: {e}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl Enricher for HttpEnricher {
    async fn enrich(&self, record: &str) -> Result<String, EnrichError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(json_body(record))
            .send()
            .await
            .map_err(|e| EnrichError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| EnrichError::Request(e.to_string()))?;
        let parsed: EnrichResponse =
            serde_json::from_str(&body).map_err(|e| EnrichError::Malformed(e.to_string()))?;
        if parsed.content.trim().is_empty() {
            return Err(EnrichError::Malformed("empty content".into()));
        }
        Ok(parsed.content)
    }
}

/// Records are forwarded verbatim when they are already JSON, otherwise as a
/// JSON string.
fn json_body(record: &str) -> String {
    if serde_json::from_str::<serde::de::IgnoredAny>(record).is_ok() {
        record.to_string()
    } else {
        Value::String(record.to_string()).to_string()
    }
}

/// Deterministic, network-free description of a tool-activity record.
///
/// A record that is not JSON, or is a bare JSON string, is shown as raw text.
/// Total: always returns a non-empty string.
pub fn heuristic_summary(record: &str) -> String {
    let value = match serde_json::from_str::<Value>(record) {
        Ok(Value::String(text)) => return raw_summary(&text),
        Ok(value) => value,
        Err(_) => return raw_summary(record),
    };

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty());
    let input = value.get("input").filter(|input| !input.is_null());
    if let (Some(name), Some(input)) = (name, input) {
        return describe_tool_call(name, input);
    }

    if let Some(output) = value.get("output") {
        return format!(
            "Completed with result: {}",
            truncate(&display_value(output), FIELD_CUTOFF)
        );
    }

    format!("Processing: {}", truncate(&value.to_string(), FIELD_CUTOFF))
}

fn raw_summary(raw: &str) -> String {
    if raw.is_empty() {
        EMPTY_RECORD.to_string()
    } else {
        truncate(raw, RAW_CUTOFF)
    }
}

fn describe_tool_call(name: &str, input: &Value) -> String {
    let label = name
        .strip_suffix("Tool")
        .filter(|label| !label.is_empty())
        .unwrap_or(name);
    match label {
        "Search" | "RipGrep" => format!("Searching for \"{}\"", field_or_raw(input, "query")),
        "ViewFile" => format!("Reading file: {}", field_or_raw(input, "path")),
        "ListDirectory" => format!("Listing directory: {}", field_or_raw(input, "path")),
        "SemanticSearch" => format!(
            "Performing semantic search for: \"{}\"",
            field_or_raw(input, "query")
        ),
        "RevealSymbol" => format!("Analyzing symbol: {}", field_or_raw(input, "symbol")),
        other => format!(
            "Using {other} tool with input: {}",
            truncate(&input.to_string(), FIELD_CUTOFF)
        ),
    }
}

fn field_or_raw(input: &Value, key: &str) -> String {
    match input.get(key).and_then(Value::as_str) {
        Some(field) => field.to_string(),
        None => display_value(input),
    }
}

/// Strings verbatim, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, cutoff: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(cutoff).collect();
    if chars.next().is_some() {
        format!("{head}{ELLIPSIS}")
    } else {
        head
    }
}
