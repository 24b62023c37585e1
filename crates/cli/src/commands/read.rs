use terminator::{Dispatcher, ReadOutcome};

use super::Reply;
use crate::cli::ReadArgs;
use crate::error::Result;

pub async fn run(dispatcher: &Dispatcher, args: ReadArgs) -> Result<Reply<ReadOutcome>> {
	let outcome = dispatcher
		.read(&args.target.tag, args.target.project.as_deref(), args.lines)
		.await?;
	Ok(Reply::new(outcome))
}
