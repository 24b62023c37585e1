//! iTerm2 backend.
//!
//! Windows are addressed by `id`, sessions by their `unique id`. Session
//! identity lives in the session name.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use terminator_runtime::ScriptRunner;
use tracing::debug;

use super::script::{self, SEPARATORS, numeric_id, quote};
use super::{BackendError, BackendResult, CreatedTab, TabInfo, TerminalBackend};

const APP: &str = "iTerm";

/// Handler that resolves a session by window id and unique id, selecting its
/// tab when asked.
const FIND_SESSION: &str = r#"on findSession(wid, sid, wantSelect)
	tell application "iTerm"
		set w to window id wid
		repeat with t in tabs of w
			repeat with s in sessions of t
				if (unique id of s) is sid then
					if wantSelect then
						select w
						tell t to select
						tell s to select
					end if
					return s
				end if
			end repeat
		end repeat
	end tell
	error "Can't get session " & sid number -1728
end findSession
"#;

pub struct ITerm {
	runner: ScriptRunner,
	fresh_windows: Mutex<HashSet<String>>,
}

impl ITerm {
	pub fn new(runner: ScriptRunner) -> Self {
		Self {
			runner,
			fresh_windows: Mutex::new(HashSet::new()),
		}
	}

	async fn run(&self, operation: &str, script: &str) -> BackendResult<String> {
		script::run(&self.runner, APP, operation, script).await
	}

	/// Runs `body` against the session bound to `s`.
	async fn with_session(
		&self,
		operation: &str,
		window: &str,
		tab: &str,
		activate: bool,
		body: &str,
	) -> BackendResult<String> {
		let script = format!(
			"{FIND_SESSION}set s to my findSession({}, {}, {activate})\ntell application \"iTerm\"\n{}{body}\nend tell",
			numeric_id(window)?,
			quote(tab),
			if activate { "\tactivate\n" } else { "" },
		);
		self.run(operation, &script).await
	}
}

#[async_trait]
impl TerminalBackend for ITerm {
	fn name(&self) -> &'static str {
		"iterm"
	}

	async fn list_sessions(&self) -> BackendResult<Vec<TabInfo>> {
		let script = format!(
			r#"{SEPARATORS}set out to ""
if application "iTerm" is not running then return out
tell application "iTerm"
	repeat with w in windows
		try
			set wid to (id of w) as text
			repeat with t in tabs of w
				repeat with s in sessions of t
					set out to out & wid & fs & (unique id of s) & fs & (tty of s) & fs & (name of s) & rs
				end repeat
			end repeat
		end try
	end repeat
end tell
return out"#
		);
		let output = self.run("list", &script).await?;
		Ok(script::parse_tabs(&output))
	}

	async fn create_window(&self, activate: bool) -> BackendResult<String> {
		let script = format!(
			"tell application \"iTerm\"\n{}\tset w to (create window with default profile)\n\treturn (id of w) as text\nend tell",
			if activate { "\tactivate\n" } else { "" }
		);
		let window = self.run("create window", &script).await?.trim().to_string();
		if window.is_empty() {
			return Err(BackendError::new("iTerm did not report the new window id"));
		}
		debug!(target = "terminator.backend", app = APP, window = %window, "created window");
		self.fresh_windows.lock().insert(window.clone());
		Ok(window)
	}

	async fn create_tab(&self, window: &str, title: &str, activate: bool) -> BackendResult<CreatedTab> {
		let wid = numeric_id(window)?;
		let adopt = self.fresh_windows.lock().remove(window);
		let open = if adopt {
			"\tset s to current session of current tab of w\n"
		} else {
			"\ttell w\n\t\tset t to (create tab with default profile)\n\tend tell\n\tset s to current session of t\n"
		};
		let script = format!(
			"{SEPARATORS}tell application \"iTerm\"\n{}\tset w to window id {wid}\n{open}\tset name of s to {}\n\treturn (unique id of s) & fs & (tty of s)\nend tell",
			if activate { "\tactivate\n" } else { "" },
			quote(title),
		);
		let output = self.run("create tab", &script).await?;
		Ok(script::parse_created(&output, title))
	}

	async fn select_tab(&self, window: &str, tab: &str) -> BackendResult<()> {
		self.with_session("select tab", window, tab, true, "").await.map(|_| ())
	}

	async fn submit_command(&self, window: &str, tab: &str, command: &str, activate: bool) -> BackendResult<()> {
		let body = format!("\ttell s to write text {}", quote(command));
		self.with_session("submit", window, tab, activate, &body).await.map(|_| ())
	}

	async fn read_history(&self, window: &str, tab: &str) -> BackendResult<String> {
		self.with_session("read history", window, tab, false, "\treturn contents of s")
			.await
	}

	async fn clear_screen(&self, window: &str, tab: &str, activate: bool) -> BackendResult<()> {
		self.with_session("clear", window, tab, activate, "\ttell s to write text \"clear\"")
			.await
			.map(|_| ())
	}

	async fn send_interrupt(&self, window: &str, tab: &str, activate: bool) -> BackendResult<()> {
		self.with_session(
			"interrupt",
			window,
			tab,
			activate,
			"\ttell s to write text (character id 3) newline NO",
		)
		.await
		.map(|_| ())
	}
}
