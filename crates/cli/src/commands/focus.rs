use terminator::{Dispatcher, SessionHandle};

use super::Reply;
use crate::cli::TargetArgs;
use crate::error::Result;

pub async fn run(dispatcher: &Dispatcher, args: TargetArgs) -> Result<Reply<SessionHandle>> {
	let session = dispatcher.focus(&args.tag, args.project.as_deref()).await?;
	Ok(Reply::new(session))
}
