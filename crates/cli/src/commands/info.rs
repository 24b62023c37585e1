use terminator::Dispatcher;

use super::Reply;
use crate::error::Result;

pub fn run(dispatcher: &Dispatcher) -> Result<Reply<serde_json::Value>> {
	let info = serde_json::to_value(dispatcher.info())?;
	Ok(Reply::new(info))
}
