use serde::{Deserialize, Serialize};
use tracing::warn;

/// Literal prefix that marks a line as an event frame.
pub const FRAME_PREFIX: &str = "data: ";

const PREVIEW_CHARS: usize = 80;

/// Events carried by the research stream, discriminated by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Files the index considers relevant to the query.
    SimilarFiles { content: Vec<String> },
    /// Incremental answer text.
    Content { content: String },
    /// Terminal failure reported by the research agent.
    Error { content: String },
    /// Terminal success with the full answer text.
    Complete { content: String },
    /// Coarse backend status line; carries no session state.
    Status { content: String },
    /// A tool invocation started.
    OnToolStart {
        #[serde(default)]
        data: serde_json::Value,
    },
    /// A tool invocation finished.
    OnToolEnd {
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Any `type` this client does not know about.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SimilarFiles { .. } => "similar_files",
            Self::Content { .. } => "content",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
            Self::Status { .. } => "status",
            Self::OnToolStart { .. } => "on_tool_start",
            Self::OnToolEnd { .. } => "on_tool_end",
            Self::Unknown => "unknown",
        }
    }
}

/// Parses one logical line into an event.
///
/// Lines without the `data: ` prefix are not frames and yield `None` quietly.
/// Frames whose payload fails to decode are dropped with a warning.
pub fn parse_frame(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(FRAME_PREFIX)?;
    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(
                event = "frame.dropped",
                error = %err,
                payload_len = payload.len() as u64,
                preview = %preview(payload),
                "dropping malformed stream frame"
            );
            None
        }
    }
}

fn preview(payload: &str) -> String {
    let mut chars = payload.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
