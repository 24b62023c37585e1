use terminator::{Dispatcher, SessionHandle};

use super::Reply;
use crate::cli::ListArgs;
use crate::error::Result;

pub async fn run(dispatcher: &Dispatcher, args: ListArgs) -> Result<Reply<Vec<SessionHandle>>> {
	let sessions = dispatcher.list(args.tag.as_deref()).await?;
	Ok(Reply::new(sessions))
}
