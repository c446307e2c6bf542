//! Client for the code-research service's streamed event feed.
//!
//! Raw body chunks are reassembled into lines (`lines`), lines carrying the
//! `data: ` prefix are decoded into `StreamEvent`s (`frame`), and each event is
//! applied to an owned `SessionState` (`dispatch`). Tool-activity events are
//! turned into progress entries by the `LogSummarizer` (`summarize`). The
//! `SessionController` ties these together per request (`session`).
//!
//! # Usage
//!
//! ```no_run
//! use research_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let controller = SessionController::from_config(ClientConfig::from_env()?)?;
//! let session = controller
//!     .start(ResearchRequest::new("codegen-sh/codegen", "How are tools registered?"))
//!     .await?;
//!
//! let mut updates = session.subscribe();
//! tokio::spawn(async move {
//!     while updates.changed().await.is_ok() {
//!         let state = updates.borrow_and_update().clone();
//!         if let Some(entry) = state.progress_log.last() {
//!             eprintln!("{entry}");
//!         }
//!     }
//! });
//!
//! let state = session.finish().await?;
//! println!("{}", state.answer);
//! # Ok(())
//! # }
//! ```

/// Endpoint configuration.
pub mod config;
/// Session state and the event dispatch state machine.
pub mod dispatch;
/// Public error types.
pub mod errors;
/// `data: ` frame decoding.
pub mod frame;
/// Incremental line reassembly.
pub mod lines;
/// Process-wide tracing setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Session lifecycle and the per-session read loop.
pub mod session;
/// Tool-activity summaries: remote enrichment with a heuristic fallback.
pub mod summarize;
/// Stream transport contract and the reqwest implementation.
pub mod transport;

#[cfg(test)]
mod loopback;

pub use config::{ClientConfig, Endpoints};
pub use dispatch::{SessionState, SessionStatus, Transition};
pub use errors::{ClientError, EnrichError, TransportError};
pub use frame::{StreamEvent, parse_frame};
pub use lines::LineReassembler;
pub use session::{AbortHandle, ResearchSession, SessionController};
pub use summarize::{Enricher, HttpEnricher, LogSummarizer, Summary, heuristic_summary};
pub use transport::{ByteStream, ReqwestTransport, ResearchRequest, StreamTransport};
