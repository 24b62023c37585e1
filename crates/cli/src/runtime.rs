//! Engine setup for one CLI invocation.

use terminator::{Dispatcher, EngineConfig};
use tracing::debug;

use crate::cli::GlobalArgs;
use crate::error::Result;

/// Resolves configuration (defaults, file, environment, flags) and builds a
/// dispatcher bound to the real terminal and process table.
pub fn build_dispatcher(global: &GlobalArgs) -> Result<Dispatcher> {
	let config = EngineConfig::load(global.config.as_deref(), &global.overrides())?;
	debug!(
		target = "terminator.cli",
		app = %config.app,
		grouping = %config.window_grouping,
		log_dir = %config.log_dir.display(),
		"engine configured"
	);
	Ok(Dispatcher::system(config))
}
