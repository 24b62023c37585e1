//! Execute request types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether backend calls made for a request may bring the terminal forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusMode {
	/// Always activate the terminal and select the tab.
	Force,
	/// Never steal focus.
	Never,
	/// Focus only when preparing a session or creating a new one.
	#[default]
	Default,
}

impl FocusMode {
	/// Resolves the mode into a concrete activate flag.
	pub fn activates(self, prepared_only: bool, created: bool) -> bool {
		match self {
			Self::Force => true,
			Self::Never => false,
			Self::Default => prepared_only || created,
		}
	}
}

impl FromStr for FocusMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"force" | "force-focus" => Ok(Self::Force),
			"never" | "no-focus" => Ok(Self::Never),
			"default" | "auto" => Ok(Self::Default),
			other => Err(format!("unknown focus mode: {other}")),
		}
	}
}

impl fmt::Display for FocusMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Force => write!(f, "force"),
			Self::Never => write!(f, "never"),
			Self::Default => write!(f, "default"),
		}
	}
}

/// A single `execute` call.
///
/// An absent or blank `command` turns the request into "prepare only": the
/// session is resolved, cleared and optionally focused, but nothing is
/// submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
	pub tag: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub project_path: Option<PathBuf>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub command: Option<String>,
	#[serde(default)]
	pub background: bool,
	/// Trailing output lines to return; falls back to the configured default.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lines: Option<usize>,
	/// Foreground completion timeout; falls back to the configured default.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_secs: Option<u64>,
	#[serde(default)]
	pub focus: FocusMode,
	/// Clear the screen before running. Always set by policy.
	#[serde(default = "clear_default")]
	pub clear: bool,
}

fn clear_default() -> bool {
	true
}

impl ExecuteRequest {
	/// Builds a prepare-only request for `tag`.
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			project_path: None,
			command: None,
			background: false,
			lines: None,
			timeout_secs: None,
			focus: FocusMode::Default,
			clear: true,
		}
	}

	pub fn with_command(mut self, command: impl Into<String>) -> Self {
		self.command = Some(command.into());
		self
	}

	pub fn with_project(mut self, project: impl Into<PathBuf>) -> Self {
		self.project_path = Some(project.into());
		self
	}

	pub fn with_background(mut self, background: bool) -> Self {
		self.background = background;
		self
	}

	pub fn with_timeout_secs(mut self, secs: u64) -> Self {
		self.timeout_secs = Some(secs);
		self
	}

	pub fn with_lines(mut self, lines: usize) -> Self {
		self.lines = Some(lines);
		self
	}

	pub fn with_focus(mut self, focus: FocusMode) -> Self {
		self.focus = focus;
		self
	}

	/// The command text, or `None` when this is a prepare-only request.
	pub fn effective_command(&self) -> Option<&str> {
		self.command.as_deref().map(str::trim).filter(|c| !c.is_empty())
	}
}
