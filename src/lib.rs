//! # Forking Paths
//!
//! An interactive branching-narrative engine. A traveler describes who they
//! are, enters the Garden of Forking Paths, and at every island picks the
//! left or the right path. A narrator writes each new island from the full
//! journey so far; the engine validates what it writes and keeps the history
//! append-only.
//!
//! ## Architecture
//!
//! ```text
//! Tool client → McpServer (stdio) → PathEngine → Narrator → Langbase Pipes (HTTP)
//!                    ↓
//!              SessionStore (SQLite)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use forking_paths::garden::{PathEngine, PipeNarrator, Side, TravelerIdentity};
//! use forking_paths::langbase::LangbaseClient;
//! use forking_paths::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let langbase = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let engine = PathEngine::new(PipeNarrator::new(langbase, &config.pipes));
//!
//!     let (mut session, outcome) = engine.begin(TravelerIdentity::new("Artorias")?).await;
//!     outcome?;
//!     engine.choose(&mut session, Side::Left)?;
//!     engine.advance(&mut session).await?;
//!     engine.end(&mut session)?;
//!     Ok(())
//! }
//! ```

/// Operator commands for saved journeys.
pub mod cli;
/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases for every layer.
pub mod error;
/// Sessions, the path engine and narrators.
pub mod garden;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// System prompts for the garden pipes.
pub mod prompts;
/// JSON-RPC tool server and request handling.
pub mod server;
/// SQLite persistence for sessions.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use garden::{PathEngine, Session, Side, TravelerIdentity};
pub use server::{AppState, McpServer, SharedState};
