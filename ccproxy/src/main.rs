//! ccproxy - HTTP bridge into Claude Code conversations
//!
//! Lists Claude Code sessions, appends externally authored user messages to
//! their logs and nudges the running agent so it picks them up.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/ccproxy/ccproxy.log (~/.local/state/ccproxy/ccproxy.log)
//! - Config: $XDG_CONFIG_HOME/ccproxy/config.toml (~/.config/ccproxy/config.toml)

mod server;

use anyhow::{Context, Result};
use ccproxy_core::{Config, Notifier, SessionStore};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Parser)]
#[command(name = "ccproxy")]
#[command(about = "Read and append to Claude Code conversations over HTTP")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve(ServeArgs),

    /// Print discovered sessions as JSON
    Sessions,

    /// Append a message to a session and notify the agent
    Send {
        /// Session id (log file stem)
        session_id: String,

        /// Message text
        message: String,

        /// Project path hint used to find the session directory
        #[arg(short, long)]
        project: Option<String>,

        /// Skip agent notification
        #[arg(long)]
        no_notify: bool,
    },
}

#[derive(clap::Args, Default)]
struct ServeArgs {
    /// Listening port (overrides config and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind (default: from config)
    #[arg(long)]
    host: Option<String>,

    /// Skip agent notification
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        ccproxy_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let store = SessionStore::from_config(&config);

    match args.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(serve) => run_serve(&config, store, serve).await,
        Command::Sessions => {
            let sessions = store.list_sessions();
            println!("{}", serde_json::to_string_pretty(&json!({ "sessions": sessions }))?);
            Ok(())
        }
        Command::Send {
            session_id,
            message,
            project,
            no_notify,
        } => {
            let receipt = store
                .send(&session_id, &message, project.as_deref())
                .with_context(|| format!("failed to send message to {session_id}"))?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);

            // A one-shot run has to wait for the notification or it dies with the runtime.
            if !no_notify {
                if let Some(handle) = Notifier::detect(&config.notify).dispatch(&message) {
                    let _ = handle.await;
                }
            }
            Ok(())
        }
    }
}

async fn run_serve(config: &Config, store: SessionStore, serve: ServeArgs) -> Result<()> {
    let port = config.resolve_port(serve.port);
    let host = serve.host.unwrap_or_else(|| config.server.host.clone());

    let notifier = if serve.no_notify {
        Notifier::Disabled
    } else {
        Notifier::detect(&config.notify)
    };
    if let Notifier::Unsupported { platform } = &notifier {
        tracing::warn!(platform, "Agent notification is unavailable on this platform");
    }

    let addr = tokio::net::lookup_host((host.as_str(), port))
        .await
        .with_context(|| format!("failed to resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("no address for {host}:{port}"))?;

    let state = AppState {
        store: Arc::new(store),
        notifier: Arc::new(notifier),
        port,
    };

    server::run_http_server(addr, state).await
}
