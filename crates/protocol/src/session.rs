//! Session identity types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Composite identifier of one terminal tab.
///
/// Both halves are backend-specific strings (a window id and a tab index for
/// Terminal.app, a window id and a session unique id for iTerm2). The engine
/// never interprets them beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
	pub window: String,
	pub tab: String,
}

impl SessionId {
	pub fn new(window: impl Into<String>, tab: impl Into<String>) -> Self {
		Self {
			window: window.into(),
			tab: tab.into(),
		}
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.window, self.tab)
	}
}

/// One terminal session answering to a tag.
///
/// Handles are rebuilt from the backend's live session list on every
/// invocation; nothing here outlives the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
	/// Backend identifier of the window/tab pair.
	pub id: SessionId,
	/// Sanitized logical tag.
	pub tag: String,
	/// Absolute project path, when the session was resolved with one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub project_path: Option<PathBuf>,
	/// Fixed-length project hash embedded in the title.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub project_hash: Option<String>,
	/// TTY device path (e.g. `/dev/ttys004`), unknown for some backends.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tty: Option<String>,
	/// Title as displayed by the terminal.
	pub title: String,
	/// Whether a non-shell process currently owns the TTY foreground.
	pub is_busy: bool,
}

/// Which window a newly created session should land in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowGrouping {
	/// Share a window with other sessions of the same project.
	Project,
	/// Use the first available window.
	#[default]
	Smart,
	/// Always open a new window.
	Off,
}

impl FromStr for WindowGrouping {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"project" | "by-project" => Ok(Self::Project),
			"smart" | "first-available" => Ok(Self::Smart),
			"off" | "none" => Ok(Self::Off),
			other => Err(format!("unknown window grouping: {other}")),
		}
	}
}

impl fmt::Display for WindowGrouping {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Project => write!(f, "project"),
			Self::Smart => write!(f, "smart"),
			Self::Off => write!(f, "off"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn grouping_accepts_aliases() {
		assert_eq!("by-project".parse::<WindowGrouping>().unwrap(), WindowGrouping::Project);
		assert_eq!("first-available".parse::<WindowGrouping>().unwrap(), WindowGrouping::Smart);
		assert_eq!("NONE".parse::<WindowGrouping>().unwrap(), WindowGrouping::Off);
		assert!("tiles".parse::<WindowGrouping>().is_err());
	}

	#[test]
	fn handle_serializes_camel_case_and_skips_unknowns() {
		let handle = SessionHandle {
			id: SessionId::new("42", "1"),
			tag: "build".into(),
			project_path: None,
			project_hash: None,
			tty: None,
			title: "build [tm:-]".into(),
			is_busy: false,
		};

		let json = serde_json::to_string(&handle).unwrap();
		assert!(json.contains("\"isBusy\":false"));
		assert!(!json.contains("projectPath"));
		assert!(!json.contains("tty"));
	}
}
