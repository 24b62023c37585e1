//! Helpers shared by the AppleScript backends.
//!
//! Scripts return rows separated by `RS` (U+001E) whose fields are separated
//! by tabs; titles never contain either once they went through tag
//! sanitizing, and foreign titles only need to survive as opaque text.

use terminator_runtime::{Error as RuntimeError, ScriptRunner};
use tracing::debug;

pub use terminator_runtime::osascript::quote;

use super::{BackendError, BackendResult, TabInfo};

pub const FIELD_SEP: char = '\t';
pub const RECORD_SEP: char = '\u{1e}';

/// AppleScript prologue binding `fs`/`rs` to the separators above.
///
/// `tab` is a class name inside Terminal's dictionary, so the field
/// separator is spelled out by code point.
pub const SEPARATORS: &str = "set fs to character id 9\nset rs to character id 30\n";

/// Runs `script` for `app`, translating runtime failures into messages a
/// user can act on.
pub async fn run(runner: &ScriptRunner, app: &str, operation: &str, script: &str) -> BackendResult<String> {
	runner.run(script).await.map_err(|err| {
		debug!(target = "terminator.backend", app, operation, error = %err, "script failed");
		describe_failure(app, operation, err)
	})
}

fn describe_failure(app: &str, operation: &str, err: RuntimeError) -> BackendError {
	match err {
		RuntimeError::ToolMissing { program } => BackendError::new(format!(
			"{program} not found on PATH; driving {app} requires macOS"
		)),
		RuntimeError::Timeout { elapsed, .. } => {
			BackendError::timed_out(format!("{app} {operation}"), elapsed)
		}
		RuntimeError::CommandFailed { stderr, .. } => BackendError::new(classify_stderr(app, operation, &stderr)),
		RuntimeError::Io(io) => BackendError::new(format!("failed to launch osascript: {io}")),
	}
}

/// Maps well-known AppleScript error numbers to readable messages.
pub fn classify_stderr(app: &str, operation: &str, stderr: &str) -> String {
	if stderr.contains("-1743") || stderr.contains("Not authorized") {
		format!(
			"automation permission denied for {app}; allow it under System Settings > Privacy & Security > Automation"
		)
	} else if stderr.contains("-600") || stderr.contains("isn't running") {
		format!("{app} is not running")
	} else if stderr.contains("-1728") || stderr.contains("Can't get") || stderr.contains("Invalid index") {
		format!("{app} {operation}: window or tab no longer exists ({})", stderr.trim())
	} else if stderr.contains("-1719") || stderr.contains("assistive access") {
		format!("{app} {operation}: System Events needs accessibility access ({})", stderr.trim())
	} else {
		format!("{app} {operation} failed: {}", stderr.trim())
	}
}

/// Rejects identifiers that would not be safe to splice into a script as a
/// bare number.
pub fn numeric_id(id: &str) -> BackendResult<&str> {
	if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
		Ok(id)
	} else {
		Err(BackendError::new(format!("invalid terminal identifier: {id:?}")))
	}
}

/// Splits script output into rows of at least `min_fields` fields.
pub fn rows(output: &str, min_fields: usize) -> Vec<Vec<&str>> {
	output
		.split(RECORD_SEP)
		.map(|row| row.trim_start_matches(['\n', '\r']))
		.filter(|row| !row.is_empty())
		.map(|row| row.split(FIELD_SEP).collect::<Vec<_>>())
		.filter(|fields| fields.len() >= min_fields)
		.collect()
}

/// Parses `window, tab, tty, title` rows.
pub fn parse_tabs(output: &str) -> Vec<TabInfo> {
	rows(output, 4)
		.into_iter()
		.filter(|f| !f[0].is_empty() && !f[1].is_empty())
		.map(|f| TabInfo {
			window: f[0].to_string(),
			tab: f[1].to_string(),
			tty: non_empty(f[2]),
			// A title may itself contain tabs; keep everything after the third separator.
			title: f[3..].join("\t"),
		})
		.collect()
}

/// `tab id, tty` as returned by the create-tab scripts.
pub fn parse_created(output: &str, title: &str) -> super::CreatedTab {
	let mut fields = output.trim().splitn(2, FIELD_SEP);
	let tab = fields.next().unwrap_or_default().trim().to_string();
	let tty = fields.next().and_then(non_empty);
	super::CreatedTab {
		tab,
		tty,
		title: title.to_string(),
	}
}

fn non_empty(value: &str) -> Option<String> {
	let value = value.trim();
	(!value.is_empty() && value != "missing value").then(|| value.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_rows_and_skips_garbage() {
		let output = "12\t1\t/dev/ttys001\tbuild [tm:-]\u{1e}12\t2\t\tvim\u{1e}broken\u{1e}\n";
		let tabs = parse_tabs(output);
		assert_eq!(tabs.len(), 2);
		assert_eq!(tabs[0].tty.as_deref(), Some("/dev/ttys001"));
		assert_eq!(tabs[0].title, "build [tm:-]");
		assert_eq!(tabs[1].tty, None);
		assert_eq!(tabs[1].title, "vim");
	}

	#[test]
	fn titles_keep_embedded_tabs() {
		let tabs = parse_tabs("3\t7\tmissing value\tweird\ttitle\u{1e}");
		assert_eq!(tabs[0].title, "weird\ttitle");
		assert_eq!(tabs[0].tty, None);
	}

	#[test]
	fn created_tab_without_id_is_empty() {
		let created = parse_created("", "t");
		assert!(created.tab.is_empty());

		let created = parse_created("4\t/dev/ttys009\n", "t");
		assert_eq!(created.tab, "4");
		assert_eq!(created.tty.as_deref(), Some("/dev/ttys009"));
	}

	#[test]
	fn numeric_ids_only() {
		assert_eq!(numeric_id("1234").unwrap(), "1234");
		assert!(numeric_id("12; do shell script").is_err());
		assert!(numeric_id("").is_err());
	}

	#[test]
	fn stderr_classification() {
		let msg = classify_stderr("Terminal", "list", "execution error: Not authorized to send Apple events to Terminal. (-1743)");
		assert!(msg.contains("permission denied"));

		let msg = classify_stderr("iTerm", "select", "Can't get window id 9. (-1728)");
		assert!(msg.contains("no longer exists"));

		let msg = classify_stderr("iTerm", "list", "boom");
		assert_eq!(msg, "iTerm list failed: boom");
	}
}
