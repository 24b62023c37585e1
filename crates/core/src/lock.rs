//! Advisory per-session lock.
//!
//! Two concurrent callers using the same tag would otherwise both resolve
//! the same tab and type into it. The lock covers resolve through submit;
//! output polling runs unlocked.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use tokio::time::Instant;
use tracing::{debug, trace};

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on `<dir>/<key>.lock`, released on drop.
#[derive(Debug)]
pub struct SessionLock {
	file: File,
	path: PathBuf,
}

impl SessionLock {
	/// Waits up to `timeout` for the lock. `Ok(None)` means another holder
	/// kept it the whole time.
	pub async fn acquire(dir: &Path, key: &str, timeout: Duration) -> std::io::Result<Option<Self>> {
		std::fs::create_dir_all(dir)?;
		let path = dir.join(format!("{key}.lock"));
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(false)
			.open(&path)?;

		let deadline = Instant::now() + timeout;
		loop {
			match FileExt::try_lock_exclusive(&file) {
				Ok(()) => {
					debug!(target = "terminator.lock", path = %path.display(), "acquired session lock");
					return Ok(Some(Self { file, path }));
				}
				Err(err) if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
					let now = Instant::now();
					if now >= deadline {
						return Ok(None);
					}
					trace!(target = "terminator.lock", path = %path.display(), "lock contended");
					tokio::time::sleep(RETRY_INTERVAL.min(deadline - now)).await;
				}
				Err(err) => return Err(err),
			}
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl Drop for SessionLock {
	fn drop(&mut self) {
		let _ = FileExt::unlock(&self.file);
		trace!(target = "terminator.lock", path = %self.path.display(), "released session lock");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn second_holder_times_out_until_release() {
		let dir = tempfile::tempdir().unwrap();
		let first = SessionLock::acquire(dir.path(), "build-global", Duration::from_millis(100))
			.await
			.unwrap()
			.unwrap();

		let second = SessionLock::acquire(dir.path(), "build-global", Duration::from_millis(150))
			.await
			.unwrap();
		assert!(second.is_none());

		drop(first);
		let third = SessionLock::acquire(dir.path(), "build-global", Duration::from_millis(150))
			.await
			.unwrap();
		assert!(third.is_some());
	}

	#[tokio::test]
	async fn different_keys_do_not_contend() {
		let dir = tempfile::tempdir().unwrap();
		let _a = SessionLock::acquire(dir.path(), "a-global", Duration::ZERO).await.unwrap().unwrap();
		let b = SessionLock::acquire(dir.path(), "b-global", Duration::ZERO).await.unwrap();
		assert!(b.is_some());
	}
}
