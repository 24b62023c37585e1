//! Terminal application backends.
//!
//! [`TerminalBackend`] is the whole surface the engine needs from a terminal
//! application: enumerate tabs, create them, type into them, and read them
//! back. Implementations never interpret the commands they submit.

mod apple_terminal;
mod iterm;
pub mod script;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use terminator_runtime::ScriptRunner;
use thiserror::Error;

pub use apple_terminal::AppleTerminal;
pub use iterm::ITerm;

use crate::config::TerminalApp;

/// Failure reported by a terminal application.
///
/// Application-not-running, unknown identifiers, and denied automation
/// permission all land here with a human-readable message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
	pub message: String,
	/// Set when the scripting call was cut off after this long.
	pub timeout: Option<Duration>,
}

impl BackendError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			timeout: None,
		}
	}

	pub fn timed_out(operation: impl Into<String>, elapsed: Duration) -> Self {
		Self {
			message: operation.into(),
			timeout: Some(elapsed),
		}
	}
}

/// Result type alias for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// One tab as enumerated by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
	pub window: String,
	pub tab: String,
	pub tty: Option<String>,
	pub title: String,
}

/// A freshly created tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTab {
	pub tab: String,
	pub tty: Option<String>,
	pub title: String,
}

/// Capabilities the engine needs from a terminal application.
///
/// `activate` flags control whether a call may bring the application to the
/// front; [`select_tab`](TerminalBackend::select_tab) always does.
#[async_trait]
pub trait TerminalBackend: Send + Sync {
	/// Short backend name for logs and `info`.
	fn name(&self) -> &'static str;

	/// Every reachable tab. Windows that close mid-enumeration are skipped.
	async fn list_sessions(&self) -> BackendResult<Vec<TabInfo>>;

	/// Opens a new window and returns its identifier.
	async fn create_window(&self, activate: bool) -> BackendResult<String>;

	/// Opens a tab in `window` and gives it `title`.
	async fn create_tab(&self, window: &str, title: &str, activate: bool) -> BackendResult<CreatedTab>;

	/// Brings the tab to the front of its window and the application forward.
	async fn select_tab(&self, window: &str, tab: &str) -> BackendResult<()>;

	/// Types `command` into the tab followed by a newline.
	async fn submit_command(&self, window: &str, tab: &str, command: &str, activate: bool) -> BackendResult<()>;

	/// Scrollback contents of the tab.
	async fn read_history(&self, window: &str, tab: &str) -> BackendResult<String>;

	async fn clear_screen(&self, window: &str, tab: &str, activate: bool) -> BackendResult<()>;

	/// Best-effort Ctrl-C. Only used when process-group signaling fails.
	async fn send_interrupt(&self, window: &str, tab: &str, activate: bool) -> BackendResult<()>;
}

/// Builds the backend for `app`, driving it through `runner`.
pub fn create_backend(app: TerminalApp, runner: ScriptRunner) -> Arc<dyn TerminalBackend> {
	match app {
		TerminalApp::Terminal => Arc::new(AppleTerminal::new(runner)),
		TerminalApp::ITerm => Arc::new(ITerm::new(runner)),
	}
}
