//! Threadwise: a thread-checkpointed conversational agent engine.
//!
//! An [`Engine`](engine::Engine) turns a user message plus a thread's stored
//! history into a reply. Each turn runs a small graph that alternates between
//! a generate step and tool invocation (typically document retrieval) until
//! the generator produces a final answer. The extended transcript is then
//! written back to a [`ThreadStore`](memory::ThreadStore).
//!
//! # Quick Start
//!
//! ```no_run
//! use threadwise::prelude::*;
//!
//! # async fn example() -> threadwise::error::Result<()> {
//! let config = EngineConfig::load(None)?;
//! let engine = Engine::from_config(&config).await?;
//! let answer = engine.respond("t1", "What is your website?").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
