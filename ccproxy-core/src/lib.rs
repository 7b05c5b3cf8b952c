//! # ccproxy-core
//!
//! Core library for ccproxy - a bridge that lets other programs read and
//! append to Claude Code conversations.
//!
//! This library provides:
//! - A tolerant codec for Claude Code's JSONL conversation logs
//! - Session discovery, lookup and context recovery over `~/.claude/projects`
//! - Durable, append-only writes of new user messages
//! - Best-effort notification of the running agent process
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! The log files belong to Claude Code. This library never rewrites or
//! truncates them and keeps no state between calls:
//! - **Read paths** (listing, context, history) skip bad lines and bad files
//! - **Write path** (append) reports every failure
//! - **Notification** is fire-and-forget and never fails a request
//!
//! ## Example
//!
//! ```rust,no_run
//! use ccproxy_core::{Config, SessionStore};
//!
//! let config = Config::load().expect("failed to load config");
//! let store = SessionStore::from_config(&config);
//!
//! for session in store.list_sessions() {
//!     println!("{} {}", session.session_id, session.last_message);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use notify::{NotifyError, Notifier};
pub use session::SessionStore;
pub use types::*;

// Public modules
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod project_path;
pub mod session;
pub mod types;
