//! Engine error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by callers to pick an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	BackendError,
	SessionNotFound,
	SessionBusy,
	Timeout,
	ProcessControlError,
	InternalError,
	InvalidInput,
	Io,
	Config,
}

/// Errors returned by the engine.
///
/// A foreground command that outlives its timeout is not an error; it comes
/// back as a partial [`ExecuteOutcome`](crate::ExecuteOutcome).
#[derive(Debug, Error)]
pub enum Error {
	/// The terminal application refused or failed a scripting call.
	#[error("terminal backend error: {0}")]
	Backend(BackendError),

	#[error("no session tagged '{tag}'{}", project.as_ref().map(|p| format!(" for {}", p.display())).unwrap_or_default())]
	SessionNotFound { tag: String, project: Option<PathBuf> },

	/// The session is still running something after an interrupt.
	#[error("session '{tag}' is busy{}", command.as_ref().map(|c| format!(" running {c}")).unwrap_or_default())]
	SessionBusy { tag: String, command: Option<String> },

	/// An automation call exceeded its bound.
	#[error("{operation} timed out after {secs}s")]
	Timeout { operation: String, secs: u64 },

	#[error("process control failed: {0}")]
	ProcessControl(String),

	#[error("internal error: {0}")]
	Internal(String),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("configuration error: {0}")]
	Config(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Backend(_) => ErrorKind::BackendError,
			Error::SessionNotFound { .. } => ErrorKind::SessionNotFound,
			Error::SessionBusy { .. } => ErrorKind::SessionBusy,
			Error::Timeout { .. } => ErrorKind::Timeout,
			Error::ProcessControl(_) => ErrorKind::ProcessControlError,
			Error::Internal(_) => ErrorKind::InternalError,
			Error::InvalidInput(_) => ErrorKind::InvalidInput,
			Error::Config(_) => ErrorKind::Config,
			Error::Io(_) => ErrorKind::Io,
		}
	}

	/// Tag the error is about, when it names one.
	pub fn tag(&self) -> Option<&str> {
		match self {
			Error::SessionNotFound { tag, .. } | Error::SessionBusy { tag, .. } => Some(tag),
			_ => None,
		}
	}
}

impl From<BackendError> for Error {
	fn from(err: BackendError) -> Self {
		match err.timeout {
			Some(elapsed) => Error::Timeout {
				operation: err.message,
				secs: elapsed.as_secs(),
			},
			None => Error::Backend(err),
		}
	}
}

impl From<terminator_runtime::Error> for Error {
	fn from(err: terminator_runtime::Error) -> Self {
		match err {
			terminator_runtime::Error::Io(io) => Error::Io(io),
			terminator_runtime::Error::Timeout { program, elapsed } => Error::Timeout {
				operation: program,
				secs: elapsed.as_secs(),
			},
			other => Error::ProcessControl(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn backend_timeouts_become_timeout_errors() {
		let err: Error = BackendError::timed_out("osascript", Duration::from_secs(15)).into();
		assert_eq!(err.kind(), ErrorKind::Timeout);

		let err: Error = BackendError::new("Terminal is not running").into();
		assert_eq!(err.kind(), ErrorKind::BackendError);
		assert!(err.to_string().contains("Terminal is not running"));
	}

	#[test]
	fn busy_error_names_the_command() {
		let err = Error::SessionBusy {
			tag: "build".into(),
			command: Some("cargo".into()),
		};
		assert_eq!(err.to_string(), "session 'build' is busy running cargo");
		assert_eq!(err.tag(), Some("build"));
	}
}
