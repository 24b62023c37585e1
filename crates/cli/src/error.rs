use serde_json::json;
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Engine(#[from] terminator::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, details) = match self {
			CliError::Engine(err) => engine_code(err),
			CliError::Json(_) => (ErrorCode::InternalError, None),
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}

fn engine_code(err: &terminator::Error) -> (ErrorCode, Option<serde_json::Value>) {
	use terminator::{Error, ErrorKind};

	let code = match err.kind() {
		ErrorKind::BackendError => ErrorCode::BackendError,
		ErrorKind::SessionNotFound => ErrorCode::SessionNotFound,
		ErrorKind::SessionBusy => ErrorCode::SessionBusy,
		ErrorKind::Timeout => ErrorCode::Timeout,
		ErrorKind::ProcessControlError => ErrorCode::ProcessControlError,
		ErrorKind::InternalError => ErrorCode::InternalError,
		ErrorKind::InvalidInput | ErrorKind::Config => ErrorCode::InvalidInput,
		ErrorKind::Io => ErrorCode::IoError,
	};

	let details = match err {
		Error::SessionNotFound { tag, project } => Some(json!({ "tag": tag, "project": project })),
		Error::SessionBusy { tag, command } => Some(json!({ "tag": tag, "command": command })),
		Error::Timeout { operation, secs } => Some(json!({ "operation": operation, "timeoutSecs": secs })),
		_ => err.tag().map(|tag| json!({ "tag": tag })),
	};
	(code, details)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn busy_session_carries_tag_and_command() {
		let err = CliError::from(terminator::Error::SessionBusy {
			tag: "build".into(),
			command: Some("vim".into()),
		});
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::SessionBusy);
		let details = cmd.details.unwrap();
		assert_eq!(details["tag"], "build");
		assert_eq!(details["command"], "vim");
	}

	#[test]
	fn config_errors_are_invalid_input() {
		let err = CliError::from(terminator::Error::Config("bad grouping".into()));
		assert_eq!(err.to_command_error().code, ErrorCode::InvalidInput);
	}

	#[test]
	fn io_errors_map_to_io_code() {
		let err = CliError::from(terminator::Error::Io(std::io::Error::other("disk full")));
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::IoError);
		assert!(cmd.message.contains("disk full"));
	}

	#[test]
	fn serialization_failures_are_internal() {
		let err = CliError::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
		assert_eq!(err.to_command_error().code, ErrorCode::InternalError);
	}
}
