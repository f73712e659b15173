//! Command-line arguments for the `threadwise` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::engine::Engine;
use crate::types::Speaker;

/// Printed in place of an answer when a command fails.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't answer that just now. Please try again.";

#[derive(Parser, Debug)]
#[command(name = "threadwise", version, about = "Threadwise conversational agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat interactively on one thread
    Chat(ChatArgs),
    /// Clear stored threads
    Clear(ClearArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Thread id to continue (a new one is generated when omitted)
    #[arg(short, long)]
    pub thread: Option<String>,

    /// JSON passages file for the retrieval tool
    #[arg(short, long)]
    pub passages: Option<PathBuf>,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f64>,
}

/// Arguments for the `clear` subcommand.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Thread to clear; every thread when omitted
    #[arg(short, long)]
    pub thread: Option<String>,
}

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Clear,
    History,
    Quit,
    Say(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "/clear" => Self::Clear,
            "/history" => Self::History,
            "/quit" | "/exit" => Self::Quit,
            text => Self::Say(text.to_string()),
        }
    }
}

/// What the prompt loop does after one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplOutcome {
    /// Print these lines and read the next command.
    Continue(Vec<String>),
    Quit,
}

/// Run one prompt command against `thread_id`.
///
/// Engine errors are logged and answered with [`FALLBACK_REPLY`]; they never
/// end the loop.
pub async fn run_command(engine: &Engine, thread_id: &str, command: ReplCommand) -> ReplOutcome {
    let result = match command {
        ReplCommand::Empty => Ok(Vec::new()),
        ReplCommand::Quit => return ReplOutcome::Quit,
        ReplCommand::Clear => engine
            .clear(thread_id)
            .await
            .map(|()| vec!["(cleared)".to_string()]),
        ReplCommand::History => engine.history(thread_id).await.map(|entries| {
            entries
                .into_iter()
                .map(|entry| {
                    let who = match entry.speaker {
                        Speaker::User => "you",
                        Speaker::Assistant => "bot",
                    };
                    format!("{who}: {}", entry.text)
                })
                .collect()
        }),
        ReplCommand::Say(text) => engine.respond(thread_id, &text).await.map(|answer| vec![answer]),
    };

    match result {
        Ok(lines) => ReplOutcome::Continue(lines),
        Err(e) => {
            tracing::error!(error = %e, thread_id, "command failed");
            ReplOutcome::Continue(vec![FALLBACK_REPLY.to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{EngineError, Result};
    use crate::memory::ThreadStore;
    use crate::provider::{Generator, ToolDefinition};
    use crate::types::{Message, Transcript};

    struct Canned;

    #[async_trait]
    impl Generator for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _: &[Message], _: &[ToolDefinition]) -> Result<Message> {
            Ok(Message::assistant("1 plus 2 is 3."))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ThreadStore for BrokenStore {
        async fn load(&self, _: &str) -> Result<Transcript> {
            Err(EngineError::Storage("disk unavailable".to_string()))
        }

        async fn save(&self, _: &str, _: &Transcript) -> Result<()> {
            Err(EngineError::Storage("disk unavailable".to_string()))
        }

        async fn clear(&self, _: &str) -> Result<()> {
            Err(EngineError::Storage("disk unavailable".to_string()))
        }

        async fn clear_all(&self) -> Result<()> {
            Err(EngineError::Storage("disk unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn commands_answer_and_report_history() {
        let engine = Engine::builder(Arc::new(Canned)).build().unwrap();

        assert_eq!(
            run_command(&engine, "t1", ReplCommand::Say("1 plus 2 is?".into())).await,
            ReplOutcome::Continue(vec!["1 plus 2 is 3.".to_string()])
        );
        assert_eq!(
            run_command(&engine, "t1", ReplCommand::History).await,
            ReplOutcome::Continue(vec![
                "you: 1 plus 2 is?".to_string(),
                "bot: 1 plus 2 is 3.".to_string(),
            ])
        );
        assert_eq!(
            run_command(&engine, "t1", ReplCommand::Quit).await,
            ReplOutcome::Quit
        );
    }

    #[tokio::test]
    async fn store_failures_print_fallback_and_keep_going() {
        let engine = Engine::builder(Arc::new(Canned))
            .with_store(Arc::new(BrokenStore))
            .build()
            .unwrap();
        let fallback = ReplOutcome::Continue(vec![FALLBACK_REPLY.to_string()]);

        for command in [
            ReplCommand::Clear,
            ReplCommand::History,
            ReplCommand::Say("hi".into()),
        ] {
            assert_eq!(run_command(&engine, "t1", command).await, fallback);
        }
    }

    #[test]
    fn parses_repl_commands() {
        assert_eq!(ReplCommand::parse(" /clear "), ReplCommand::Clear);
        assert_eq!(ReplCommand::parse("/history"), ReplCommand::History);
        assert_eq!(ReplCommand::parse("/exit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
        assert_eq!(
            ReplCommand::parse("1 plus 2 is?"),
            ReplCommand::Say("1 plus 2 is?".to_string())
        );
    }

    #[test]
    fn chat_args_parse() {
        let cli = Cli::parse_from(["threadwise", "chat", "--thread", "t1", "-p", "docs.json"]);
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.thread.as_deref(), Some("t1"));
                assert_eq!(args.passages, Some(PathBuf::from("docs.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
