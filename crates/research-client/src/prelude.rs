//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, ClientConfig, ClientError, LogSummarizer, ResearchRequest, ResearchSession,
    SessionController, SessionState, SessionStatus, StreamEvent, Summary,
};
