use serde::{Deserialize, Serialize};

/// Snapshot of the process that owns a TTY's foreground.
///
/// Derived from the OS process table on every query and never cached: the
/// foreground group changes between polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
	/// Process group id, the target for signals.
	pub pgid: i32,
	/// Representative process id inside the group.
	pub pid: i32,
	/// Command name (basename, no arguments).
	pub command: String,
}
