//! User hook run before the engine interrupts or kills a process.

use std::process::Stdio;
use std::time::Duration;

use terminator_protocol::ProcessInfo;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// What the hook is told about the process about to be signaled.
#[derive(Debug, Clone)]
pub struct HookContext<'a> {
	pub tag: &'a str,
	pub tty: Option<&'a str>,
	pub process: &'a ProcessInfo,
}

impl HookContext<'_> {
	fn env(&self) -> [(&'static str, String); 5] {
		[
			("TERMINATOR_TAG", self.tag.to_string()),
			("TERMINATOR_PGID", self.process.pgid.to_string()),
			("TERMINATOR_PID", self.process.pid.to_string()),
			("TERMINATOR_COMMAND", self.process.command.clone()),
			("TERMINATOR_TTY", self.tty.unwrap_or_default().to_string()),
		]
	}
}

/// Runs `script` through `sh -c` with the context exported as environment
/// variables.
///
/// The hook is killed once `timeout` elapses; a non-zero exit is an error.
pub async fn run_pre_kill_hook(script: &str, ctx: &HookContext<'_>, timeout: Duration) -> Result<()> {
	info!(
		target = "terminator.hooks",
		tag = ctx.tag,
		pgid = ctx.process.pgid,
		command = %ctx.process.command,
		"running pre-kill hook"
	);

	let child = Command::new("sh")
		.arg("-c")
		.arg(script)
		.envs(ctx.env())
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::piped())
		.kill_on_drop(true)
		.spawn()?;

	let output = tokio::time::timeout(timeout, child.wait_with_output())
		.await
		.map_err(|_| Error::Timeout {
			program: "pre-kill hook".to_string(),
			elapsed: timeout,
		})??;

	if output.status.success() {
		debug!(target = "terminator.hooks", "pre-kill hook finished");
		Ok(())
	} else {
		Err(Error::CommandFailed {
			program: "pre-kill hook".to_string(),
			code: output.status.code(),
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn process() -> ProcessInfo {
		ProcessInfo {
			pgid: 4242,
			pid: 4243,
			command: "cargo".into(),
		}
	}

	#[tokio::test]
	async fn hook_sees_process_environment() {
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("env.txt");
		let script = format!(
			"echo \"$TERMINATOR_TAG $TERMINATOR_PGID $TERMINATOR_PID $TERMINATOR_COMMAND $TERMINATOR_TTY\" > '{}'",
			out.display()
		);
		let info = process();
		let ctx = HookContext {
			tag: "build",
			tty: Some("/dev/ttys004"),
			process: &info,
		};

		run_pre_kill_hook(&script, &ctx, Duration::from_secs(5)).await.unwrap();

		let written = std::fs::read_to_string(out).unwrap();
		assert_eq!(written.trim(), "build 4242 4243 cargo /dev/ttys004");
	}

	#[tokio::test]
	async fn failing_hook_reports_exit_code() {
		let info = process();
		let ctx = HookContext {
			tag: "build",
			tty: None,
			process: &info,
		};

		let err = run_pre_kill_hook("echo nope >&2; exit 3", &ctx, Duration::from_secs(5))
			.await
			.unwrap_err();
		match err {
			Error::CommandFailed { code, stderr, .. } => {
				assert_eq!(code, Some(3));
				assert_eq!(stderr, "nope");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn slow_hook_is_cut_off() {
		let info = process();
		let ctx = HookContext {
			tag: "build",
			tty: None,
			process: &info,
		};

		let err = run_pre_kill_hook("sleep 5", &ctx, Duration::from_millis(200))
			.await
			.unwrap_err();
		assert!(err.is_timeout());
	}
}
