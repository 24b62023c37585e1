//! Per-command log files.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// Path of the file a wrapped command redirects into.
///
/// The shell creates the file; the engine only reads and removes it.
#[derive(Debug)]
pub struct LogFile {
	path: PathBuf,
}

impl LogFile {
	/// Reserves `<dir>/terminator_<tty>_<unix-ms>_<uuid8>.log`, creating `dir`.
	pub fn allocate(dir: &Path, tty: Option<&str>) -> Result<Self> {
		std::fs::create_dir_all(dir)?;
		let millis = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis())
			.unwrap_or_default();
		let suffix = Uuid::new_v4().simple().to_string();
		let name = format!("terminator_{}_{millis}_{}.log", tty_component(tty), &suffix[..8]);
		Ok(Self { path: dir.join(name) })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Deletes the file after a clean completion.
	pub fn discard(self) {
		match std::fs::remove_file(&self.path) {
			Ok(()) => debug!(target = "terminator.logs", path = %self.path.display(), "removed log"),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
			Err(err) => warn!(target = "terminator.logs", path = %self.path.display(), error = %err, "failed to remove log"),
		}
	}

	/// Keeps the file on disk and hands back its path.
	pub fn retain(self) -> PathBuf {
		debug!(target = "terminator.logs", path = %self.path.display(), "retaining log");
		self.path
	}
}

fn tty_component(tty: Option<&str>) -> String {
	let Some(tty) = tty else {
		return "notty".to_string();
	};
	let short = tty.strip_prefix("/dev/").unwrap_or(tty);
	short
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_carry_the_tty() {
		let dir = tempfile::tempdir().unwrap();
		let log = LogFile::allocate(dir.path(), Some("/dev/ttys004")).unwrap();
		let name = log.path().file_name().unwrap().to_string_lossy().into_owned();
		assert!(name.starts_with("terminator_ttys004_"));
		assert!(name.ends_with(".log"));

		let log = LogFile::allocate(dir.path(), Some("/dev/pts/3")).unwrap();
		let name = log.path().file_name().unwrap().to_string_lossy().into_owned();
		assert!(name.starts_with("terminator_pts-3_"));
	}

	#[test]
	fn discard_tolerates_missing_files() {
		let dir = tempfile::tempdir().unwrap();
		let log = LogFile::allocate(&dir.path().join("nested"), None).unwrap();
		std::fs::write(log.path(), "x").unwrap();
		let path = log.path().to_path_buf();
		log.discard();
		assert!(!path.exists());

		LogFile::allocate(dir.path(), None).unwrap().discard();
	}
}
