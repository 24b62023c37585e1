//! Results returned by engine actions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::process::ProcessInfo;
use crate::session::SessionHandle;

/// Result of an `execute` call.
///
/// A foreground timeout is not an error: it is reported here with
/// `timed_out` set and whatever output was captured so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOutcome {
	/// Session after execution, with its busy state refreshed.
	pub session: SessionHandle,
	/// Captured output, trailing lines only.
	pub output: String,
	/// Process id of the command, when the engine learned it.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pid: Option<u32>,
	/// Whether the engine tried to kill the command after its timeout.
	pub killed_by_timeout: bool,
	/// Whether the completion marker never showed up in time.
	pub timed_out: bool,
	pub background: bool,
	/// No command was given; the session was only prepared.
	pub prepared_only: bool,
	/// The session was created by this call.
	pub created: bool,
	/// Log file kept on disk (timeouts, errors and background commands).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub log_file: Option<PathBuf>,
	/// Non-fatal problems, e.g. a failed kill after a timeout.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<String>,
}

/// Result of a `read` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOutcome {
	pub session: SessionHandle,
	pub history: String,
	/// Number of lines in `history`.
	pub lines: usize,
}

/// How a busy process was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillMethod {
	/// Signals were delivered to the process group.
	Signal,
	/// Signaling failed; the backend simulated Ctrl-C instead.
	InterruptKeystroke,
}

/// Result of a `kill` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillOutcome {
	pub session: SessionHandle,
	/// Foreground process found before interrupting, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub process: Option<ProcessInfo>,
	/// Whether any interrupt was sent. `false` when there was nothing to kill.
	pub interrupted: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<KillMethod>,
	/// The process group outlived every escalation step.
	pub still_running: bool,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<String>,
}
