//! # Ragbot — retrieval-augmented Q&A server
//!
//! Usage:
//!   ragbot                                  # Load documents.txt and serve on 127.0.0.1:8000
//!   ragbot serve --port 9000                # Custom port
//!   ragbot load --documents notes.txt       # Seed the store and exit
//!   ragbot ask "What is the capital?" -k 2  # One-shot question from the terminal

use anyhow::Result;
use clap::{Parser, Subcommand};
use ragbot_core::config::RagbotConfig;
use ragbot_knowledge::LoadOutcome;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ragbot",
    version,
    about = "📚 Ragbot — answers questions from your documents"
)]
struct Cli {
    /// Config file (default: $RAGBOT_CONFIG or ~/.ragbot/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load documents (if the store is empty) and start the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Newline-delimited documents file
        #[arg(short, long)]
        documents: Option<String>,
    },
    /// Load documents into an empty store and exit
    Load {
        #[arg(short, long)]
        documents: Option<String>,
    },
    /// Ask a single question and print the answer
    Ask {
        question: String,
        #[arg(short = 'k', long, default_value_t = ragbot_agent::DEFAULT_TOP_K)]
        top_k: i64,
    },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn load_config(cli: &Cli) -> Result<RagbotConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("RAGBOT_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(RagbotConfig::default_path);
    let path = PathBuf::from(expand_path(&path.to_string_lossy()));

    let mut config = if cli.config.is_some() {
        // an explicitly named file must exist
        RagbotConfig::load_from(&path)?
    } else {
        RagbotConfig::load(&path)?
    };
    config.apply_env()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "ragbot=debug,ragbot_gateway=debug,ragbot_agent=debug,ragbot_knowledge=debug,ragbot_providers=debug,tower_http=debug"
    } else {
        "ragbot=info,ragbot_gateway=info,ragbot_knowledge=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = load_config(&cli)?;

    match cli.command {
        None => {}
        Some(Command::Serve {
            ref host,
            port,
            ref documents,
        }) => {
            if let Some(h) = host {
                config.gateway.host = h.clone();
            }
            if let Some(p) = port {
                config.gateway.port = p;
            }
            if let Some(d) = documents {
                config.store.documents_path = d.clone();
            }
        }
        Some(Command::Load { ref documents }) => {
            if let Some(d) = documents {
                config.store.documents_path = d.clone();
            }
        }
        Some(Command::Ask { .. }) => {}
    }

    config.store.path = expand_path(&config.store.path);
    config.store.documents_path = expand_path(&config.store.documents_path);
    tracing::debug!("Resolved config: {:?}", config);

    match cli.command {
        None | Some(Command::Serve { .. }) => ragbot_gateway::start(&config).await,
        Some(Command::Load { .. }) => {
            let service = ragbot_gateway::build_query_service(&config).await?;
            let path = Path::new(&config.store.documents_path);
            match ragbot_knowledge::load_documents(service.store().as_ref(), path).await? {
                LoadOutcome::Loaded(n) => println!("✅ Loaded {n} document(s) from {}", path.display()),
                LoadOutcome::AlreadyLoaded(n) => {
                    println!("ℹ️  Store already holds {n} document(s); nothing loaded")
                }
            }
            Ok(())
        }
        Some(Command::Ask { question, top_k }) => {
            let service = ragbot_gateway::build_query_service(&config).await?;
            let answer = service.ask(&question, top_k).await?;
            println!("{}\n", answer.answer);
            println!("Sources:");
            for (i, source) in answer.sources.iter().enumerate() {
                println!("  {}. {source}", i + 1);
            }
            Ok(())
        }
    }
}
