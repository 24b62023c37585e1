//! Terminal.app backend.
//!
//! Windows are addressed by `id`, tabs by their 1-based index. Session
//! identity lives in the tab's custom title. Terminal's dictionary cannot
//! open a tab in an existing window, so new tabs go through a System Events
//! ⌘T keystroke, which needs Terminal frontmost.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use terminator_runtime::ScriptRunner;
use tracing::debug;

use super::script::{self, SEPARATORS, numeric_id, quote};
use super::{BackendError, BackendResult, CreatedTab, TabInfo, TerminalBackend};

const APP: &str = "Terminal";

pub struct AppleTerminal {
	runner: ScriptRunner,
	/// Windows opened by this process whose initial tab is still unclaimed.
	fresh_windows: Mutex<HashSet<String>>,
}

impl AppleTerminal {
	pub fn new(runner: ScriptRunner) -> Self {
		Self {
			runner,
			fresh_windows: Mutex::new(HashSet::new()),
		}
	}

	async fn run(&self, operation: &str, script: &str) -> BackendResult<String> {
		script::run(&self.runner, APP, operation, script).await
	}
}

fn activate_line(activate: bool) -> &'static str {
	if activate { "\tactivate\n" } else { "" }
}

fn tab_ref(window: &str, tab: &str) -> BackendResult<String> {
	Ok(format!("tab {} of window id {}", numeric_id(tab)?, numeric_id(window)?))
}

#[async_trait]
impl TerminalBackend for AppleTerminal {
	fn name(&self) -> &'static str {
		"terminal"
	}

	async fn list_sessions(&self) -> BackendResult<Vec<TabInfo>> {
		let script = format!(
			r#"{SEPARATORS}set out to ""
if application "Terminal" is not running then return out
tell application "Terminal"
	repeat with w in windows
		try
			set wid to (id of w) as text
			set i to 0
			repeat with t in tabs of w
				set i to i + 1
				set ttyText to ""
				try
					set ttyText to tty of t
				end try
				set titleText to ""
				try
					set titleText to custom title of t
				end try
				set out to out & wid & fs & (i as text) & fs & ttyText & fs & titleText & rs
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
			"tell application \"Terminal\"\n{}\tdo script \"\"\n\treturn (id of front window) as text\nend tell",
			activate_line(activate)
		);
		let window = self.run("create window", &script).await?.trim().to_string();
		if window.is_empty() {
			return Err(BackendError::new("Terminal did not report the new window id"));
		}
		debug!(target = "terminator.backend", app = APP, window = %window, "created window");
		self.fresh_windows.lock().insert(window.clone());
		Ok(window)
	}

	async fn create_tab(&self, window: &str, title: &str, activate: bool) -> BackendResult<CreatedTab> {
		let wid = numeric_id(window)?;
		let adopt = self.fresh_windows.lock().remove(window);
		// ⌘T only reaches the frontmost application, so opening a tab always activates.
		let script = format!(
			r#"{SEPARATORS}tell application "Terminal"
{activate}	set w to window id {wid}
	set t to missing value
	if {adopt} and (count of tabs of w) is 1 then
		if not (busy of tab 1 of w) then set t to tab 1 of w
	end if
	if t is missing value then
		activate
		set index of w to 1
		tell application "System Events" to keystroke "t" using command down
		delay 0.3
		set t to last tab of w
	end if
	set custom title of t to {title}
	set title displays custom title of t to true
	return ((count of tabs of w) as text) & fs & (tty of t)
end tell"#,
			activate = activate_line(activate),
			adopt = adopt,
			title = quote(title),
		);
		let output = self.run("create tab", &script).await?;
		Ok(script::parse_created(&output, title))
	}

	async fn select_tab(&self, window: &str, tab: &str) -> BackendResult<()> {
		let target = tab_ref(window, tab)?;
		let script = format!(
			"tell application \"Terminal\"\n\tactivate\n\tset selected of {target} to true\n\tset index of window id {} to 1\nend tell",
			numeric_id(window)?
		);
		self.run("select tab", &script).await.map(|_| ())
	}

	async fn submit_command(&self, window: &str, tab: &str, command: &str, activate: bool) -> BackendResult<()> {
		let target = tab_ref(window, tab)?;
		let script = format!(
			"tell application \"Terminal\"\n{}\tdo script {} in {target}\nend tell",
			activate_line(activate),
			quote(command)
		);
		self.run("submit", &script).await.map(|_| ())
	}

	async fn read_history(&self, window: &str, tab: &str) -> BackendResult<String> {
		let target = tab_ref(window, tab)?;
		let script = format!("tell application \"Terminal\"\n\treturn history of {target}\nend tell");
		self.run("read history", &script).await
	}

	async fn clear_screen(&self, window: &str, tab: &str, activate: bool) -> BackendResult<()> {
		let target = tab_ref(window, tab)?;
		let script = format!(
			"tell application \"Terminal\"\n{}\tdo script \"clear\" in {target}\nend tell",
			activate_line(activate)
		);
		self.run("clear", &script).await.map(|_| ())
	}

	async fn send_interrupt(&self, window: &str, tab: &str, _activate: bool) -> BackendResult<()> {
		// Keystrokes go to the frontmost window, so the tab has to be brought forward.
		self.select_tab(window, tab).await?;
		let script = "tell application \"System Events\" to keystroke \"c\" using control down";
		self.run("interrupt", script).await.map(|_| ())
	}
}
