//! Threadwise CLI binary entry point.

use std::io::Write;
use std::path::Path;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use threadwise::cli::{run_command, ChatArgs, ClearArgs, Cli, Commands, ReplCommand, ReplOutcome};
use threadwise::config::EngineConfig;
use threadwise::engine::Engine;
use threadwise::error::Result;
use threadwise::memory::{open_store, ThreadStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Chat(args) => handle_chat(args).await,
        Commands::Clear(args) => handle_clear(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path)
}

async fn handle_chat(args: ChatArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(temperature) = args.temperature {
        config.settings.temperature = Some(temperature);
    }
    if let Some(passages) = args.passages {
        config.retrieval.passages_path = Some(passages);
    }

    let engine = Engine::from_config(&config).await?;
    let thread_id = args
        .thread
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    println!("thread {thread_id} (/history, /clear, /quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match run_command(&engine, &thread_id, ReplCommand::parse(&line)).await {
            ReplOutcome::Quit => break,
            ReplOutcome::Continue(output) => {
                for text in output {
                    println!("{text}");
                }
            }
        }
    }
    Ok(())
}

async fn handle_clear(args: ClearArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let store = open_store(&config.store)?;
    match args.thread {
        Some(thread_id) => store.clear(&thread_id).await?,
        None => store.clear_all().await?,
    }
    println!("(cleared)");
    Ok(())
}
