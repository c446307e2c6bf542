use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::{Mutex, oneshot, watch};
use tracing::{Instrument as _, debug, info, info_span, warn};

use crate::config::ClientConfig;
use crate::dispatch::{SessionState, Transition};
use crate::errors::ClientError;
use crate::frame::parse_frame;
use crate::lines::LineReassembler;
use crate::summarize::{HttpEnricher, LogSummarizer};
use crate::transport::{ByteStream, ReqwestTransport, ResearchRequest, StreamTransport};

/// Handle used to stop a running session.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The session stops before dispatching its next line; its state is not
    /// published again and `finish` returns `ClientError::Cancelled`.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Starts research sessions and cancels the previous one on each new start.
pub struct SessionController {
    config: ClientConfig,
    transport: Arc<dyn StreamTransport>,
    summarizer: LogSummarizer,
    current: Mutex<Option<AbortHandle>>,
}

impl SessionController {
    /// Creates a controller over explicit collaborators.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn StreamTransport>,
        summarizer: LogSummarizer,
    ) -> Self {
        Self {
            config,
            transport,
            summarizer,
            current: Mutex::new(None),
        }
    }

    /// Creates a controller backed by reqwest for both the stream and
    /// enrichment endpoints.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let endpoints = config.validate()?;
        let transport = ReqwestTransport::new(endpoints.stream, config.connect_timeout)?;
        let enricher = HttpEnricher::new(endpoints.enrich, config.enrich_timeout)?;
        Ok(Self::new(
            config,
            Arc::new(transport),
            LogSummarizer::new(Arc::new(enricher)),
        ))
    }

    /// Validates the request and starts a new session.
    ///
    /// Any session started earlier by this controller is aborted first. No
    /// network call is made when validation fails.
    pub async fn start(&self, request: ResearchRequest) -> Result<ResearchSession, ClientError> {
        self.config.validate()?;
        let request = request.validated()?;

        let session_id = uuid::Uuid::new_v4();
        let (state_tx, state_rx) = watch::channel(SessionState::new(session_id));
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);
        let abort_handle = AbortHandle { tx: abort_tx };

        {
            let mut current = self.current.lock().await;
            if let Some(previous) = current.replace(abort_handle.clone()) {
                debug!(next_session = %session_id, "aborting previous session");
                previous.abort();
            }
        }

        let span = info_span!("research_session", session_id = %session_id);
        tokio::spawn(
            session_task(
                SessionTask {
                    session_id,
                    stream_url: self.config.stream_url.clone(),
                    transport: self.transport.clone(),
                    summarizer: self.summarizer.clone(),
                    request,
                },
                state_tx,
                final_tx,
                abort_rx,
            )
            .instrument(span),
        );

        Ok(ResearchSession {
            session_id,
            state_rx,
            final_rx,
            abort_handle,
        })
    }
}

/// One running research session.
pub struct ResearchSession {
    session_id: uuid::Uuid,
    state_rx: watch::Receiver<SessionState>,
    final_rx: oneshot::Receiver<Result<SessionState, ClientError>>,
    abort_handle: AbortHandle,
}

impl ResearchSession {
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Subscribes to state snapshots, published after every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for the session to stop and returns its final state.
    ///
    /// Stream errors and transport failures are part of the returned state;
    /// only cancellation and internal failures are errors here.
    pub async fn finish(self) -> Result<SessionState, ClientError> {
        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::protocol_msg(format!(
                "session task ended without final state (session={})",
                self.session_id
            ))),
        }
    }
}

struct SessionTask {
    session_id: uuid::Uuid,
    stream_url: String,
    transport: Arc<dyn StreamTransport>,
    summarizer: LogSummarizer,
    request: ResearchRequest,
}

enum Outcome {
    Finished(SessionState),
    Cancelled,
}

async fn session_task(
    task: SessionTask,
    state_tx: watch::Sender<SessionState>,
    final_tx: oneshot::Sender<Result<SessionState, ClientError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    info!(repo = %task.request.repo_name, "research session started");
    let result = match drive(task, &state_tx, &mut abort_rx).await {
        Outcome::Finished(state) => {
            info!(
                status = ?state.status,
                progress_entries = state.progress_log.len() as u64,
                answer_len = state.answer.len() as u64,
                "research session finished"
            );
            Ok(state)
        }
        Outcome::Cancelled => {
            info!("research session cancelled");
            Err(ClientError::Cancelled)
        }
    };
    let _ = final_tx.send(result);
}

async fn drive(
    task: SessionTask,
    state_tx: &watch::Sender<SessionState>,
    abort_rx: &mut watch::Receiver<bool>,
) -> Outcome {
    let mut state = SessionState::new(task.session_id);

    let opened = tokio::select! {
        biased;
        () = aborted(abort_rx) => return Outcome::Cancelled,
        opened = task.transport.open(&task.request) => opened,
    };
    let mut stream: ByteStream = match opened {
        Ok(stream) => stream,
        Err(err) => {
            warn!(
                error = %err,
                connectivity = err.is_connectivity(),
                "failed to open research stream"
            );
            state.fail_transport(err.user_message(&task.stream_url));
            publish(state_tx, &state);
            return Outcome::Finished(state);
        }
    };

    let mut lines = LineReassembler::default();
    loop {
        let next = tokio::select! {
            biased;
            () = aborted(abort_rx) => return Outcome::Cancelled,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(chunk)) => {
                for line in lines.push_chunk(&chunk) {
                    if *abort_rx.borrow() {
                        return Outcome::Cancelled;
                    }
                    let Some(event) = parse_frame(&line) else {
                        continue;
                    };
                    debug!(event = event.kind(), "dispatching event");
                    match state.apply(event) {
                        Transition::Ignored => {}
                        Transition::Updated => publish(state_tx, &state),
                        Transition::Summarize(record) => {
                            let summary = tokio::select! {
                                biased;
                                () = aborted(abort_rx) => return Outcome::Cancelled,
                                summary = task.summarizer.summarize(&record) => summary,
                            };
                            if state.push_progress(summary.into_text()) {
                                publish(state_tx, &state);
                            }
                        }
                        Transition::Terminal => {
                            publish(state_tx, &state);
                            return Outcome::Finished(state);
                        }
                    }
                }
            }
            Some(Err(err)) => {
                warn!(error = %err, "research stream failed");
                state.fail_transport(err.user_message(&task.stream_url));
                publish(state_tx, &state);
                return Outcome::Finished(state);
            }
            None => {
                if let Some(remainder) = lines.finish() {
                    warn!(
                        remainder_len = remainder.len() as u64,
                        "discarding unterminated trailing line"
                    );
                }
                warn!("research stream ended without a terminal event");
                state.mark_exhausted();
                publish(state_tx, &state);
                return Outcome::Finished(state);
            }
        }
    }
}

/// Resolves once the session is aborted or every abort handle is gone.
async fn aborted(abort_rx: &mut watch::Receiver<bool>) {
    let _ = abort_rx.wait_for(|aborted| *aborted).await;
}

fn publish(state_tx: &watch::Sender<SessionState>, state: &SessionState) {
    state_tx.send_replace(state.clone());
}
