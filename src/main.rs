use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, EnvFilter};

mod data_url;
mod error;
mod ingest;
mod models;
mod orchestrator;
mod preview;
mod repl;
mod server;
mod session;
mod settings;

use models::MockResponder;
use orchestrator::ChatOrchestrator;
use settings::{CliOverrides, EnvDefaults};

#[derive(Debug, Parser)]
#[command(name = "filechat")]
#[command(about = "Chat with a selectable model about an attached file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Initial model id (see `/models`)
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    max_attachment_bytes: Option<u64>,
    #[arg(long)]
    responder_delay_ms: Option<u64>,
}

impl From<SessionArgs> for CliOverrides {
    fn from(a: SessionArgs) -> Self {
        Self {
            model: a.model,
            max_attachment_bytes: a.max_attachment_bytes,
            responder_delay_ms: a.responder_delay_ms,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive chat on stdin/stdout
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Serve one chat session over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:7171")]
        listen: String,
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let env = EnvDefaults::from_env();
    match cli.command {
        Commands::Chat { session } => {
            let eff = settings::resolve_effective_settings(&env, &session.into());
            let responder = MockResponder { delay: Duration::from_millis(eff.responder_delay_ms) };
            let chat = ChatOrchestrator::new(&eff);
            let input = BufReader::new(tokio::io::stdin());
            repl::run(chat, &responder, input, tokio::io::stdout()).await?;
        }
        Commands::Serve { listen, session } => {
            let addr: SocketAddr = listen.parse()?;
            let eff = settings::resolve_effective_settings(&env, &session.into());
            let responder = Arc::new(MockResponder { delay: Duration::from_millis(eff.responder_delay_ms) });
            let state = server::AppState::new(ChatOrchestrator::new(&eff), responder);
            server::serve(addr, state).await?;
        }
    }
    Ok(())
}
