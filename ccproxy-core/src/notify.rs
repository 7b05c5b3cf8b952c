//! Best-effort notification of the running agent process
//!
//! After a message is appended to a conversation log, the live Claude Code
//! process has no reason to re-read it. On macOS with Terminal.app we can
//! nudge it by typing the same text into the terminal tab the process is
//! attached to.
//!
//! This is advisory only. The append is the authoritative side effect;
//! every failure here is logged and dropped, and the work runs on a detached
//! task so it never delays the caller.

use crate::config::NotifyConfig;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Upper bound for the whole lookup-and-inject sequence.
const INJECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Finds the Terminal.app tab bound to a tty, focuses it and types the
/// message. Arguments: message text, tty path, focus delay in milliseconds.
/// Prints `true` when a tab was found.
const TERMINAL_APP_SCRIPT: &str = r#"on run argv
    set messageText to item 1 of argv
    set targetTTY to item 2 of argv
    set focusDelay to ((item 3 of argv) as integer) / 1000
    tell application "Terminal"
        repeat with w in windows
            repeat with t in tabs of w
                try
                    if (tty of t) is targetTTY then
                        set selected tab of w to t
                        set frontmost of w to true
                        activate
                        delay focusDelay
                        do script messageText & return in t
                        return "true"
                    end if
                end try
            end repeat
        end repeat
    end tell
    return "false"
end run
"#;

/// Why a notification did not reach the agent.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to run {command}: {source}")]
    Command {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("no running process named {0:?}")]
    ProcessNotFound(String),

    #[error("process {0} has no controlling terminal")]
    NoTerminal(u32),

    #[error("osascript failed: {0}")]
    Script(String),

    #[error("no Terminal.app tab attached to {0}")]
    TabNotFound(String),

    #[error("notification timed out after {0:?}")]
    Timeout(Duration),
}

/// Notification capability of this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notifier {
    /// macOS Terminal.app injection via AppleScript
    TerminalApp {
        process_name: String,
        focus_delay: Duration,
    },
    /// No injection mechanism exists for this platform
    Unsupported { platform: &'static str },
    /// Turned off in configuration
    Disabled,
}

impl Notifier {
    /// Pick the notifier for the current platform.
    pub fn detect(config: &NotifyConfig) -> Self {
        if !config.enabled {
            return Notifier::Disabled;
        }
        if cfg!(target_os = "macos") {
            Notifier::TerminalApp {
                process_name: config.process_name.clone(),
                focus_delay: Duration::from_millis(config.focus_delay_ms),
            }
        } else {
            Notifier::Unsupported {
                platform: std::env::consts::OS,
            }
        }
    }

    /// Whether [`Notifier::dispatch`] can do anything on this host.
    pub fn is_supported(&self) -> bool {
        matches!(self, Notifier::TerminalApp { .. })
    }

    /// Fire-and-forget delivery of `text` to the agent.
    ///
    /// Returns the handle of the spawned task, or `None` when nothing was
    /// dispatched. Must be called from within a tokio runtime when supported.
    pub fn dispatch(&self, text: &str) -> Option<JoinHandle<()>> {
        match self {
            Notifier::Disabled => {
                tracing::debug!("Notification disabled, skipping");
                None
            }
            Notifier::Unsupported { platform } => {
                tracing::warn!(
                    platform,
                    "Message injection is only supported on macOS with Terminal.app"
                );
                None
            }
            Notifier::TerminalApp { .. } if text.is_empty() => None,
            Notifier::TerminalApp {
                process_name,
                focus_delay,
            } => {
                let process_name = process_name.clone();
                let focus_delay = *focus_delay;
                let text = text.to_string();

                Some(tokio::spawn(async move {
                    tracing::info!(process = %process_name, "Injecting message into Terminal.app");
                    let outcome = tokio::time::timeout(
                        INJECT_TIMEOUT,
                        inject_terminal_app(&process_name, focus_delay, &text),
                    )
                    .await
                    .unwrap_or(Err(NotifyError::Timeout(INJECT_TIMEOUT)));

                    match outcome {
                        Ok(tty) => {
                            tracing::info!(tty = %tty, "Message injected into agent terminal")
                        }
                        Err(e) => tracing::warn!(error = %e, "Message injection failed"),
                    }
                }))
            }
        }
    }
}

/// Locate the agent's tty and type `text` into the matching tab.
async fn inject_terminal_app(
    process_name: &str,
    focus_delay: Duration,
    text: &str,
) -> Result<String, NotifyError> {
    let pid = find_pid(process_name).await?;
    let tty = find_tty(pid).await?;
    tracing::debug!(pid, tty = %tty, "Found agent terminal");

    let mut child = Command::new("osascript")
        .arg("-")
        .arg(text)
        .arg(&tty)
        .arg(focus_delay.as_millis().to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| NotifyError::Command {
            command: "osascript",
            source,
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(TERMINAL_APP_SCRIPT.as_bytes())
            .await
            .map_err(|source| NotifyError::Command {
                command: "osascript",
                source,
            })?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| NotifyError::Command {
            command: "osascript",
            source,
        })?;

    if !output.status.success() {
        return Err(NotifyError::Script(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    if String::from_utf8_lossy(&output.stdout).trim() != "true" {
        return Err(NotifyError::TabNotFound(tty));
    }
    Ok(tty)
}

async fn find_pid(process_name: &str) -> Result<u32, NotifyError> {
    let output = Command::new("pgrep")
        .arg("-x")
        .arg(process_name)
        .output()
        .await
        .map_err(|source| NotifyError::Command {
            command: "pgrep",
            source,
        })?;

    parse_pid(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| NotifyError::ProcessNotFound(process_name.to_string()))
}

async fn find_tty(pid: u32) -> Result<String, NotifyError> {
    let output = Command::new("ps")
        .args(["-o", "tty=", "-p"])
        .arg(pid.to_string())
        .output()
        .await
        .map_err(|source| NotifyError::Command {
            command: "ps",
            source,
        })?;

    parse_tty(&String::from_utf8_lossy(&output.stdout)).ok_or(NotifyError::NoTerminal(pid))
}

/// First pid printed by `pgrep`.
fn parse_pid(stdout: &str) -> Option<u32> {
    stdout.lines().find_map(|line| line.trim().parse().ok())
}

/// Device path from `ps -o tty=` output; `??` means no terminal.
fn parse_tty(stdout: &str) -> Option<String> {
    let name = stdout.lines().map(str::trim).find(|line| !line.is_empty())?;
    if name == "??" || name == "?" {
        return None;
    }
    if name.starts_with("/dev/") {
        Some(name.to_string())
    } else {
        Some(format!("/dev/{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_respects_config() {
        let disabled = NotifyConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(Notifier::detect(&disabled), Notifier::Disabled);

        let notifier = Notifier::detect(&NotifyConfig::default());
        assert_eq!(notifier.is_supported(), cfg!(target_os = "macos"));
    }

    #[test]
    fn test_unsupported_and_disabled_do_nothing() {
        assert!(Notifier::Disabled.dispatch("hi").is_none());
        let unsupported = Notifier::Unsupported { platform: "linux" };
        assert!(!unsupported.is_supported());
        assert!(unsupported.dispatch("hi").is_none());
    }

    #[test]
    fn test_empty_message_not_dispatched() {
        let notifier = Notifier::TerminalApp {
            process_name: "claude".to_string(),
            focus_delay: Duration::from_millis(500),
        };
        assert!(notifier.dispatch("").is_none());
    }

    #[test]
    fn test_parse_pid() {
        assert_eq!(parse_pid("4242\n4243\n"), Some(4242));
        assert_eq!(parse_pid(""), None);
        assert_eq!(parse_pid("garbage\n"), None);
    }

    #[test]
    fn test_parse_tty() {
        assert_eq!(parse_tty("ttys003\n"), Some("/dev/ttys003".to_string()));
        assert_eq!(parse_tty("  pts/2 \n"), Some("/dev/pts/2".to_string()));
        assert_eq!(parse_tty("??\n"), None);
        assert_eq!(parse_tty(""), None);
    }

    #[test]
    fn test_script_takes_message_as_argument() {
        assert!(TERMINAL_APP_SCRIPT.starts_with("on run argv"));
        assert!(TERMINAL_APP_SCRIPT.contains("item 1 of argv"));
        assert!(TERMINAL_APP_SCRIPT.contains("do script messageText & return in t"));
    }
}
