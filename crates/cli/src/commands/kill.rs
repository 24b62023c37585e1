use terminator::{Dispatcher, KillOutcome};
use tracing::warn;

use super::Reply;
use crate::cli::KillArgs;
use crate::error::Result;

pub async fn run(dispatcher: &Dispatcher, args: KillArgs) -> Result<Reply<KillOutcome>> {
	let outcome = dispatcher
		.kill(&args.target.tag, args.target.project.as_deref(), args.focus)
		.await?;
	if outcome.still_running {
		warn!(target = "terminator.cli", tag = %outcome.session.tag, "process survived kill");
	}
	let warnings = outcome.warnings.clone();
	Ok(Reply::with_warnings(outcome, warnings))
}
