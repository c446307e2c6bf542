//! Run one research session from the command line.
//!
//! Progress entries go to stderr as they arrive; the final answer goes to
//! stdout. Endpoints and timeouts come from flags, then the `RESEARCH_*`
//! environment read by `ClientConfig::from_env` (a `.env` file is loaded if
//! present).

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use research_client::observability::init_observability;
use research_client::prelude::*;
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "research", about = "Ask a question about a GitHub repository")]
struct Args {
    /// Repository to research, for example `codegen-sh/codegen`.
    repo: String,
    /// Question to ask about the repository.
    query: String,
    /// Streaming research endpoint (overrides RESEARCH_STREAM_URL).
    #[arg(long)]
    stream_url: Option<String>,
    /// Log enrichment endpoint (overrides RESEARCH_ENRICH_URL).
    #[arg(long)]
    enrich_url: Option<String>,
    /// Stream connect timeout in seconds (overrides RESEARCH_CONNECT_TIMEOUT_SECS).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    connect_timeout: Option<u64>,
    /// Enrichment request timeout in seconds (overrides RESEARCH_ENRICH_TIMEOUT_SECS).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    enrich_timeout: Option<u64>,
    /// Print the candidate file list before the answer.
    #[arg(long)]
    show_files: bool,
}

/// Applies command-line overrides on top of the environment config.
fn apply_flags(mut config: ClientConfig, args: &Args) -> ClientConfig {
    if let Some(url) = &args.stream_url {
        config.stream_url = url.clone();
    }
    if let Some(url) = &args.enrich_url {
        config.enrich_url = url.clone();
    }
    if let Some(secs) = args.connect_timeout {
        config = config.connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.enrich_timeout {
        config = config.enrich_timeout(Duration::from_secs(secs));
    }
    config
}

async fn run(args: Args) -> Result<SessionState, ClientError> {
    let config = apply_flags(ClientConfig::from_env()?, &args);
    let controller = SessionController::from_config(config)?;
    let session = controller
        .start(ResearchRequest::new(args.repo, args.query))
        .await?;

    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            for entry in state.progress_log.iter().skip(printed) {
                eprintln!("  {entry}");
            }
            printed = state.progress_log.len();
        }
    });

    let state = session.finish().await;
    let _ = printer.await;
    state
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_observability();

    let args = Args::parse();
    let show_files = args.show_files;
    match run(args).await {
        Ok(state) => {
            if show_files && !state.similar_files.is_empty() {
                println!("Relevant files:");
                for file in &state.similar_files {
                    println!("  {file}");
                }
                println!();
            }
            println!("{}", state.answer);
            match state.status {
                SessionStatus::Completed => ExitCode::SUCCESS,
                SessionStatus::Exhausted => {
                    eprintln!("research stream ended before the answer was complete");
                    ExitCode::FAILURE
                }
                SessionStatus::Failed | SessionStatus::Running => ExitCode::FAILURE,
            }
        }
        Err(err) => {
            error!(error = %err, "research session failed to run");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
