//! Zendesk support chat in the terminal.
//!
//! Reads `ARCADE_USER_ID`, `OPENAI_MODEL`, `ARCADE_API_KEY` and
//! `OPENAI_API_KEY` from the environment or a `.env` file.
//!
//! ```sh
//! deskhand
//! deskhand --thread-id ticket-42 --session-dir ~/.deskhand/threads
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use deskhand::agent::CheckpointError;
use deskhand::arcade::DEFAULT_TOOL_LIMIT;
use deskhand::prelude::*;
use deskhand_zendesk::{ConfigError, DEFAULT_APPROVAL_TOOLS, DEFAULT_TOOLKIT, ZendeskConfig};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Chat with a Zendesk support agent.
#[derive(Parser)]
#[command(name = "deskhand", version)]
struct Cli {
    /// Conversation to continue.
    #[arg(long, default_value = "1")]
    thread_id: String,

    /// Maximum number of tools to load.
    #[arg(long, default_value_t = DEFAULT_TOOL_LIMIT)]
    tool_limit: usize,

    /// Arcade toolkit to load (repeatable).
    #[arg(long = "toolkit", default_value = DEFAULT_TOOLKIT)]
    toolkits: Vec<String>,

    /// Additional tool to load by name (repeatable).
    #[arg(long = "tool")]
    tools: Vec<String>,

    /// Tool that needs your approval before it runs (repeatable).
    #[arg(long = "approve-tool", default_values = DEFAULT_APPROVAL_TOOLS)]
    approval_tools: Vec<String>,

    /// Keep conversations in this directory instead of in memory.
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Stop waiting for a browser authorization after this many seconds.
    #[arg(long)]
    auth_timeout_secs: Option<u64>,

    /// Log debug output to stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Checkpoint(#[from] CheckpointError),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        warn!("Could not load .env: {e}");
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let mut config = ZendeskConfig::from_env()?;
    config.thread_id = cli.thread_id;
    config.tool_limit = cli.tool_limit;
    config.toolkits = cli.toolkits;
    config.tools = cli.tools;
    config.approval_tools = cli.approval_tools;
    config.session_dir = cli.session_dir;
    config.auth_timeout = cli.auth_timeout_secs.map(Duration::from_secs);

    let arcade = Arc::new(match &config.arcade_base_url {
        Some(url) => ArcadeClient::with_base_url(config.arcade_api_key.clone(), url.clone())?,
        None => ArcadeClient::new(config.arcade_api_key.clone())?,
    });
    let tools = get_tools(&arcade, &config.tool_selection()).await?;
    info!("Loaded {} tool(s): {}", tools.len(), tools.names().join(", "));

    let chat = match &config.openai_base_url {
        Some(url) => ChatClient::with_base_url(config.openai_api_key.clone(), url.clone())?,
        None => ChatClient::new(config.openai_api_key.clone())?,
    };

    let checkpointer: Arc<dyn Checkpointer> = match &config.session_dir {
        Some(dir) => Arc::new(FileSaver::new(dir.clone())?),
        None => Arc::new(MemorySaver::new()),
    };

    let agent = ReactAgent::new(chat, tools, config.agent_config(), checkpointer);
    let gate = ArcadeAuthGate::new(arcade).with_timeout(config.auth_timeout);
    let context = AppContext::new(agent, config.run_config());

    let mut session = SessionLoop::new(context, InterruptResolver::new(gate), StdConsole::new());
    session.run().await;
    Ok(())
}
