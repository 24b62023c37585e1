//! Bounded `osascript` execution.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{Error, Result};

const PROGRAM: &str = "osascript";

/// Runs AppleScript source through `osascript`, killing it after `timeout`.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
	timeout: Duration,
}

impl ScriptRunner {
	pub fn new(timeout: Duration) -> Self {
		Self { timeout }
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Whether `osascript` can be found on `PATH`.
	pub fn available() -> bool {
		which::which(PROGRAM).is_ok()
	}

	/// Executes `script` and returns its standard output without the
	/// trailing newline.
	///
	/// The script is fed on stdin so it never shows up in the process table.
	pub async fn run(&self, script: &str) -> Result<String> {
		let program = which::which(PROGRAM).map_err(|_| Error::ToolMissing { program: PROGRAM })?;
		trace!(target = "terminator.osascript", script, "running script");

		let mut child = Command::new(program)
			.arg("-")
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()?;

		if let Some(mut stdin) = child.stdin.take() {
			stdin.write_all(script.as_bytes()).await?;
			stdin.shutdown().await?;
		}

		let output = tokio::time::timeout(self.timeout, child.wait_with_output())
			.await
			.map_err(|_| Error::Timeout {
				program: PROGRAM.to_string(),
				elapsed: self.timeout,
			})??;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			debug!(target = "terminator.osascript", code = ?output.status.code(), %stderr, "script failed");
			return Err(Error::CommandFailed {
				program: PROGRAM.to_string(),
				code: output.status.code(),
				stderr,
			});
		}

		let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
		while stdout.ends_with('\n') || stdout.ends_with('\r') {
			stdout.pop();
		}
		Ok(stdout)
	}
}

/// Quotes `value` as an AppleScript string literal.
pub fn quote(value: &str) -> String {
	let mut out = String::with_capacity(value.len() + 2);
	out.push('"');
	for ch in value.chars() {
		match ch {
			'\\' => out.push_str("\\\\"),
			'"' => out.push_str("\\\""),
			_ => out.push(ch),
		}
	}
	out.push('"');
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quote_escapes_backslashes_and_quotes() {
		assert_eq!(quote("plain"), "\"plain\"");
		assert_eq!(quote(r#"say "hi""#), r#""say \"hi\"""#);
		assert_eq!(quote(r"C:\tmp"), r#""C:\\tmp""#);
	}

	#[cfg(not(target_os = "macos"))]
	#[tokio::test]
	async fn missing_osascript_is_reported() {
		if ScriptRunner::available() {
			return;
		}
		let err = ScriptRunner::new(Duration::from_secs(1))
			.run("return 1")
			.await
			.unwrap_err();
		assert!(matches!(err, Error::ToolMissing { program: "osascript" }));
	}
}
