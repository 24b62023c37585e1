//! Shell text submitted to sessions.

use std::path::Path;

use uuid::Uuid;

/// Wraps `s` in single quotes, escaping embedded single quotes.
pub fn shell_quote(s: &str) -> String {
	format!("'{}'", s.replace('\'', "'\\''"))
}

/// Foreground form: all output goes to the log, then the marker is appended.
pub fn foreground(command: &str, log: &Path, marker: &str) -> String {
	let log = shell_quote(&log.to_string_lossy());
	format!("(({command}) > {log} 2>&1; echo {marker} >> {log})")
}

/// Background form: detached from the shell's job table, no marker.
pub fn background(command: &str, log: &Path) -> String {
	let log = shell_quote(&log.to_string_lossy());
	format!("(({command}) > {log} 2>&1) & disown")
}

/// Moves a fresh session into its project directory.
pub fn change_directory(project: &Path) -> String {
	format!("cd {} && clear", shell_quote(&project.to_string_lossy()))
}

/// Unique marker written once a foreground command finishes.
pub fn completion_marker() -> String {
	format!("__TERMINATOR_DONE_{}__", Uuid::new_v4().simple())
}

/// Marker that is never written; used to take a bounded snapshot of a
/// background command's early output.
pub fn background_marker() -> String {
	format!("__TERMINATOR_BG_{}__", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quotes_single_quotes() {
		assert_eq!(shell_quote("plain"), "'plain'");
		assert_eq!(shell_quote("it's"), "'it'\\''s'");
	}

	#[test]
	fn foreground_appends_marker_after_command() {
		let wrapped = foreground("make test", Path::new("/tmp/x y.log"), "__M__");
		assert_eq!(wrapped, "((make test) > '/tmp/x y.log' 2>&1; echo __M__ >> '/tmp/x y.log')");
	}

	#[test]
	fn background_disowns() {
		let wrapped = background("npm run dev", Path::new("/tmp/a.log"));
		assert_eq!(wrapped, "((npm run dev) > '/tmp/a.log' 2>&1) & disown");
	}

	#[test]
	fn markers_are_unique() {
		assert_ne!(completion_marker(), completion_marker());
		assert!(background_marker().starts_with("__TERMINATOR_BG_"));
	}
}
