//! Error types for the terminator runtime.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the operating system.
#[derive(Debug, Error)]
pub enum Error {
	/// A required external program is not on `PATH`.
	#[error("{program} not found on PATH")]
	ToolMissing { program: &'static str },

	/// An external program exited unsuccessfully.
	#[error("{program} failed{}: {stderr}", code.map(|c| format!(" (exit {c})")).unwrap_or_default())]
	CommandFailed {
		program: String,
		code: Option<i32>,
		stderr: String,
	},

	/// An external program did not finish within its bound.
	#[error("{program} timed out after {}s", elapsed.as_secs())]
	Timeout {
		program: String,
		elapsed: Duration,
	},

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}

	/// Standard error output of a failed command, if any.
	pub fn stderr(&self) -> Option<&str> {
		match self {
			Error::CommandFailed { stderr, .. } => Some(stderr),
			_ => None,
		}
	}
}
