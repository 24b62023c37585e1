use terminator::{Dispatcher, ExecuteOutcome, ExecuteRequest};
use tracing::info;

use super::Reply;
use crate::cli::ExecuteArgs;
use crate::error::Result;

pub async fn run(dispatcher: &Dispatcher, args: ExecuteArgs) -> Result<Reply<ExecuteOutcome>> {
	let outcome = dispatcher.execute(build_request(args)).await?;
	info!(
		target = "terminator.cli",
		tag = %outcome.session.tag,
		created = outcome.created,
		timed_out = outcome.timed_out,
		"execute done"
	);
	let warnings = outcome.warnings.clone();
	Ok(Reply::with_warnings(outcome, warnings))
}

fn build_request(args: ExecuteArgs) -> ExecuteRequest {
	let mut request = ExecuteRequest::new(args.target.tag.clone())
		.with_background(args.background)
		.with_focus(args.focus);
	if let Some(line) = args.command_line() {
		request = request.with_command(line);
	}
	if let Some(project) = args.target.project {
		request = request.with_project(project);
	}
	if let Some(secs) = args.timeout {
		request = request.with_timeout_secs(secs);
	}
	if let Some(lines) = args.lines {
		request = request.with_lines(lines);
	}
	request
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;
	use crate::cli::{Cli, Commands};

	fn execute_args(argv: &[&str]) -> ExecuteArgs {
		match Cli::try_parse_from(argv).unwrap().command {
			Commands::Execute(args) => args,
			_ => panic!("Expected Execute command"),
		}
	}

	#[test]
	fn requests_always_clear_the_screen() {
		let request = build_request(execute_args(&["terminator", "execute", "-t", "build", "-b", "make", "test"]));
		assert!(request.clear);
		assert!(request.background);
		assert_eq!(request.command.as_deref(), Some("make test"));

		let request = build_request(execute_args(&["terminator", "execute", "-t", "build"]));
		assert!(request.clear);
		assert!(request.command.is_none());
	}
}
