use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::frame::StreamEvent;

/// Progress entry appended when the candidate file list arrives.
pub const RESEARCH_STARTED: &str = "Starting research...";
/// Progress entry appended on successful completion.
pub const RESEARCH_COMPLETE: &str = "Research complete";

/// Lifecycle position of one research session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Events are still being consumed.
    #[default]
    Running,
    /// A `complete` event arrived.
    Completed,
    /// An `error` event arrived or the transport failed.
    Failed,
    /// The stream closed without a terminal event.
    Exhausted,
}

/// Accumulated, UI-observable state of one research session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: uuid::Uuid,
    /// Answer text; appended to by `content`, replaced by `complete`/`error`.
    pub answer: String,
    /// Human-readable progress entries in event arrival order.
    pub progress_log: Vec<String>,
    /// Candidate files, replaced wholesale on `similar_files`.
    pub similar_files: Vec<String>,
    pub status: SessionStatus,
    pub last_error: Option<String>,
}

/// What the caller must do after an event was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Ignored,
    /// State changed; the session keeps reading.
    Updated,
    /// The event's `data`, serialized as JSON, must be summarized and appended with
    /// `SessionState::push_progress` before the next event is applied.
    Summarize(String),
    /// State reached `Completed` or `Failed`; stop reading the stream.
    Terminal,
}

impl SessionState {
    /// Creates an empty running session.
    pub fn new(session_id: uuid::Uuid) -> Self {
        Self {
            session_id,
            answer: String::new(),
            progress_log: Vec::new(),
            similar_files: Vec::new(),
            status: SessionStatus::Running,
            last_error: None,
        }
    }

    /// True once `complete` or `error` has been applied.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Applies one decoded event.
    ///
    /// Terminal states are frozen: every later event is `Ignored`.
    pub fn apply(&mut self, event: StreamEvent) -> Transition {
        if self.is_terminal() {
            debug!(event = event.kind(), "ignoring event after terminal state");
            return Transition::Ignored;
        }
        match event {
            StreamEvent::SimilarFiles { content } => {
                debug!(files = content.len() as u64, "similar files received");
                self.similar_files = content;
                self.progress_log.push(RESEARCH_STARTED.to_string());
                Transition::Updated
            }
            StreamEvent::Content { content } => {
                if content.is_empty() {
                    return Transition::Ignored;
                }
                self.answer.push_str(&content);
                Transition::Updated
            }
            StreamEvent::Error { content } => {
                self.fail(content);
                Transition::Terminal
            }
            StreamEvent::Complete { content } => {
                self.answer = content;
                self.progress_log.push(RESEARCH_COMPLETE.to_string());
                self.status = SessionStatus::Completed;
                Transition::Terminal
            }
            StreamEvent::OnToolStart { data } | StreamEvent::OnToolEnd { data } => {
                Transition::Summarize(data.to_string())
            }
            StreamEvent::Status { content } => {
                debug!(status = %content, "backend status");
                Transition::Ignored
            }
            StreamEvent::Unknown => Transition::Ignored,
        }
    }

    /// Appends a progress entry unless the session is already terminal.
    pub fn push_progress(&mut self, entry: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.progress_log.push(entry.into());
        true
    }

    /// Records a transport failure as a terminal error.
    pub fn fail_transport(&mut self, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.fail(message.into());
    }

    /// Marks a stream that ended without a terminal event.
    pub fn mark_exhausted(&mut self) {
        if self.status == SessionStatus::Running {
            self.status = SessionStatus::Exhausted;
        }
    }

    fn fail(&mut self, message: String) {
        self.answer = format!("Error: {message}");
        self.last_error = Some(message);
        self.status = SessionStatus::Failed;
    }
}
