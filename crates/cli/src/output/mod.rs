//! Structured output envelope for all CLI commands.
//!
//! Every command produces a result envelope on stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "execute",
//!   "inputs": { "tag": "build" },
//!   "data": { ... },
//!   "timings": { "durationMs": 1234 }
//! }
//! ```
//!
//! On failure:
//!
//! ```json
//! {
//!   "ok": false,
//!   "command": "execute",
//!   "error": {
//!     "code": "SESSION_BUSY",
//!     "message": "session 'build' is busy running vim",
//!     "details": { "tag": "build" }
//!   }
//! }
//! ```

#[cfg(test)]
mod tests;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use terminator::{ExecuteOutcome, KillOutcome, ReadOutcome, SessionHandle};

/// Current schema version for command output.
///
/// Increment this when making breaking changes to the output structure.
pub const SCHEMA_VERSION: u32 = 1;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// TOON output (default, token-efficient for LLMs)
	#[default]
	Toon,
	/// JSON output
	Json,
	/// Newline-delimited JSON
	Ndjson,
	/// Human-readable text
	Text,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"toon" => Ok(OutputFormat::Toon),
			"json" => Ok(OutputFormat::Json),
			"ndjson" => Ok(OutputFormat::Ndjson),
			"text" => Ok(OutputFormat::Text),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Toon => write!(f, "toon"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
			OutputFormat::Text => write!(f, "text"),
		}
	}
}

/// The result envelope returned by all commands.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,

	pub ok: bool,

	/// Command name (e.g., "execute", "read", "kill")
	pub command: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub inputs: Option<CommandInputs>,

	/// Command-specific result data (only present on success)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	/// Error information (only present on failure)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,

	/// Warnings collected while the command ran
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub diagnostics: Vec<Diagnostic>,
}

/// Inputs that were used for the command (for traceability)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandInputs {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tag: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub project: Option<PathBuf>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub command: Option<String>,
}

/// Error information for failed commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	/// Human-readable error message
	pub message: String,

	/// Tag, project, or command the error is about
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// The terminal application refused or failed a scripting call
	BackendError,
	/// No session carries the requested tag
	SessionNotFound,
	/// The session is still running something after an interrupt
	SessionBusy,
	/// An automation call exceeded its bound
	Timeout,
	/// A signal could not be delivered
	ProcessControlError,
	/// Invalid input provided
	InvalidInput,
	/// File I/O error
	IoError,
	/// Unknown/internal error
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::BackendError => write!(f, "BACKEND_ERROR"),
			ErrorCode::SessionNotFound => write!(f, "SESSION_NOT_FOUND"),
			ErrorCode::SessionBusy => write!(f, "SESSION_BUSY"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::ProcessControlError => write!(f, "PROCESS_CONTROL_ERROR"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	/// Total duration in milliseconds
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
	pub level: DiagnosticLevel,
	pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
	Info,
	Warning,
}

/// Builder for constructing command results
pub struct ResultBuilder<T: Serialize> {
	command: String,
	inputs: Option<CommandInputs>,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
	diagnostics: Vec<Diagnostic>,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			inputs: None,
			data: None,
			error: None,
			start_time: Instant::now(),
			diagnostics: Vec::new(),
		}
	}

	/// Measures the duration from `start` instead of from construction.
	pub fn started_at(mut self, start: Instant) -> Self {
		self.start_time = start;
		self
	}

	pub fn inputs(mut self, inputs: CommandInputs) -> Self {
		self.inputs = Some(inputs);
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	/// Adds one warning diagnostic per message.
	pub fn warnings<I, S>(mut self, warnings: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.diagnostics.extend(warnings.into_iter().map(|message| Diagnostic {
			level: DiagnosticLevel::Warning,
			message: message.into(),
		}));
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();
		CommandResult {
			schema_version: Some(SCHEMA_VERSION),
			ok,
			command: self.command,
			inputs: self.inputs,
			data: self.data,
			error: self.error,
			timings: Some(Timings::from(self.start_time.elapsed())),
			diagnostics: self.diagnostics,
		}
	}
}

/// Print a command result to stdout in the specified format
pub fn print_result<T: Serialize + TextRender>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Toon => {
			if let Ok(json_value) = serde_json::to_value(result) {
				println!("{}", toon::encode(&json_value, None));
			}
		}
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: Serialize + TextRender>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();

	if result.ok {
		if let Some(ref data) = result.data {
			let _ = write!(stdout, "{}", data.render_text());
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}

	for diag in &result.diagnostics {
		let prefix = match diag.level {
			DiagnosticLevel::Info => "info",
			DiagnosticLevel::Warning => "warning",
		};
		let _ = writeln!(stdout, "[{prefix}] {}", diag.message);
	}
}

/// Print an error to stderr in human-readable format
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("{} [{}]: {}", "error".red().bold(), error.code, error.message);
}

/// Plain-text rendering used by `-f text`.
pub trait TextRender {
	fn render_text(&self) -> String;
}

impl TextRender for () {
	fn render_text(&self) -> String {
		String::new()
	}
}

impl TextRender for serde_json::Value {
	fn render_text(&self) -> String {
		serde_json::to_string_pretty(self).map(|s| s + "\n").unwrap_or_default()
	}
}

fn session_line(session: &SessionHandle) -> String {
	let state = if session.is_busy { "busy".yellow() } else { "idle".green() };
	format!(
		"{:<20} {:<10} {:<14} {}\n",
		session.tag.bold(),
		session.id.to_string(),
		session.tty.as_deref().unwrap_or("-"),
		state
	)
}

impl TextRender for SessionHandle {
	fn render_text(&self) -> String {
		session_line(self)
	}
}

impl TextRender for Vec<SessionHandle> {
	fn render_text(&self) -> String {
		if self.is_empty() {
			return "no sessions\n".dimmed().to_string();
		}
		self.iter().map(session_line).collect()
	}
}

impl TextRender for ExecuteOutcome {
	fn render_text(&self) -> String {
		let mut out = String::new();
		if !self.output.is_empty() {
			out.push_str(&self.output);
			out.push('\n');
		}
		if self.prepared_only {
			out.push_str(&format!("{} {}\n", "prepared".green(), self.session.id));
		}
		if self.timed_out {
			let status = if self.killed_by_timeout { "killed after timeout" } else { "timed out" };
			out.push_str(&format!("{}\n", status.yellow()));
		}
		if let Some(ref log) = self.log_file {
			out.push_str(&format!("log: {}\n", log.display()));
		}
		out
	}
}

impl TextRender for ReadOutcome {
	fn render_text(&self) -> String {
		if self.history.is_empty() {
			String::new()
		} else {
			format!("{}\n", self.history)
		}
	}
}

impl TextRender for KillOutcome {
	fn render_text(&self) -> String {
		match self.process {
			Some(ref process) if self.still_running => {
				format!("{} {} (pgid {}) is still running\n", "warning:".yellow(), process.command, process.pgid)
			}
			Some(ref process) => format!("stopped {} (pgid {})\n", process.command, process.pgid),
			None => "nothing running\n".dimmed().to_string(),
		}
	}
}
