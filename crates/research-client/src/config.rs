use std::time::Duration;

use url::Url;

use crate::errors::ClientError;

const STREAM_URL_ENV: &str = "RESEARCH_STREAM_URL";
const ENRICH_URL_ENV: &str = "RESEARCH_ENRICH_URL";
const CONNECT_TIMEOUT_ENV: &str = "RESEARCH_CONNECT_TIMEOUT_SECS";
const ENRICH_TIMEOUT_ENV: &str = "RESEARCH_ENRICH_TIMEOUT_SECS";

/// Endpoint configuration for a research client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// URL of the streaming research endpoint (`POST`, `data:` framed body).
    pub stream_url: String,
    /// URL of the log enrichment endpoint used by the summarizer.
    pub enrich_url: String,
    /// Connect timeout for the stream request. The stream itself has no
    /// overall timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout for enrichment calls.
    pub enrich_timeout: Duration,
}

/// Parsed endpoints produced by `ClientConfig::validate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub stream: Url,
    pub enrich: Url,
}

impl ClientConfig {
    /// Creates a config with default timeouts.
    pub fn new(stream_url: impl Into<String>, enrich_url: impl Into<String>) -> Self {
        Self {
            stream_url: stream_url.into(),
            enrich_url: enrich_url.into(),
            connect_timeout: Duration::from_secs(10),
            enrich_timeout: Duration::from_secs(15),
        }
    }

    /// Builds a config from `RESEARCH_STREAM_URL`, `RESEARCH_ENRICH_URL` and
    /// the optional `RESEARCH_CONNECT_TIMEOUT_SECS` /
    /// `RESEARCH_ENRICH_TIMEOUT_SECS`.
    ///
    /// Unset endpoints stay blank and are reported by `validate`, so callers
    /// can still fill them in from other sources.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::new(
            read(STREAM_URL_ENV).unwrap_or_default(),
            read(ENRICH_URL_ENV).unwrap_or_default(),
        );
        if let Some(raw) = read(CONNECT_TIMEOUT_ENV) {
            config = config.connect_timeout(parse_secs(CONNECT_TIMEOUT_ENV, &raw)?);
        }
        if let Some(raw) = read(ENRICH_TIMEOUT_ENV) {
            config = config.enrich_timeout(parse_secs(ENRICH_TIMEOUT_ENV, &raw)?);
        }
        Ok(config)
    }

    /// Overrides the stream connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the enrichment request timeout.
    pub fn enrich_timeout(mut self, timeout: Duration) -> Self {
        self.enrich_timeout = timeout;
        self
    }

    /// Checks that both endpoints are well-formed http(s) URLs.
    pub fn validate(&self) -> Result<Endpoints, ClientError> {
        Ok(Endpoints {
            stream: parse_endpoint("stream", &self.stream_url)?,
            enrich: parse_endpoint("enrichment", &self.enrich_url)?,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ClientError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ClientError::Config(format!(
            "{key} must be a positive number of seconds, got {raw:?}"
        ))),
    }
}

fn parse_endpoint(label: &str, raw: &str) -> Result<Url, ClientError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ClientError::Config(format!("{label} endpoint is not configured")));
    }
    let url = Url::parse(raw)
        .map_err(|e| ClientError::Config(format!("invalid {label} endpoint {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(ClientError::Config(format!(
            "invalid {label} endpoint {raw:?}: unsupported scheme {scheme:?}"
        ))),
    }
}
