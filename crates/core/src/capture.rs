//! Output capture through a log file and a completion marker.
//!
//! A foreground command writes everything into its log file and appends a
//! unique marker when it exits. Capture polls the file until the marker shows
//! up, the deadline passes, or the caller cancels.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// One capture run.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
	pub log_file: PathBuf,
	pub marker: String,
	pub timeout: Duration,
	/// Trailing lines kept in the result; `0` keeps everything.
	pub max_lines: usize,
	pub poll_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
	Waiting,
	MarkerFound,
	TimedOut,
	Cancelled,
}

/// Terminal state of a capture plus the trimmed output.
#[derive(Debug, Clone)]
pub struct Capture {
	pub state: CaptureState,
	pub output: String,
	pub elapsed: Duration,
}

/// Polls `req.log_file` until the marker appears.
///
/// Each sleep is clamped to the time left, so the call returns within
/// `timeout + poll_interval` of starting. A timed-out capture carries the
/// partial output followed by an annotation line.
pub async fn wait_for_marker(req: &CaptureRequest, cancel: &CancellationToken) -> Capture {
	let (state, content, elapsed) = poll(req, cancel).await;
	let mut output = trim_output(&content, Some(&req.marker), req.max_lines);
	if state == CaptureState::TimedOut {
		if !output.is_empty() {
			output.push('\n');
		}
		output.push_str(&timeout_annotation(req.timeout));
	}
	debug!(target = "terminator.capture", ?state, elapsed_ms = elapsed.as_millis() as u64, "capture finished");

	Capture { state, output, elapsed }
}

/// Bounded snapshot of a background command's early output.
///
/// Polls for a marker that is never written, so it always runs for the
/// whole `window` (or until cancelled) and never annotates.
pub async fn capture_initial(
	log_file: &Path,
	window: Duration,
	max_lines: usize,
	poll_interval: Duration,
	cancel: &CancellationToken,
) -> String {
	let req = CaptureRequest {
		log_file: log_file.to_path_buf(),
		marker: crate::command::background_marker(),
		timeout: window,
		max_lines,
		poll_interval,
	};
	let (_, content, _) = poll(&req, cancel).await;
	trim_output(&content, None, max_lines)
}

async fn poll(req: &CaptureRequest, cancel: &CancellationToken) -> (CaptureState, String, Duration) {
	let started = Instant::now();
	let deadline = started + req.timeout;
	let mut state = CaptureState::Waiting;
	let mut content = String::new();

	while state == CaptureState::Waiting {
		content = read_log(&req.log_file).await;
		if content.contains(&req.marker) {
			state = CaptureState::MarkerFound;
			break;
		}

		let now = Instant::now();
		if now >= deadline {
			state = CaptureState::TimedOut;
			break;
		}

		let nap = req.poll_interval.min(deadline - now);
		trace!(target = "terminator.capture", bytes = content.len(), ?nap, "marker not yet written");
		tokio::select! {
			_ = cancel.cancelled() => state = CaptureState::Cancelled,
			_ = tokio::time::sleep(nap) => {}
		}
	}

	(state, content, started.elapsed())
}

const ANNOTATION_PREFIX: &str = "[terminator]";

fn timeout_annotation(timeout: Duration) -> String {
	format!(
		"{ANNOTATION_PREFIX} command still running after {}s; output incomplete",
		timeout.as_secs()
	)
}

async fn read_log(path: &Path) -> String {
	match tokio::fs::read(path).await {
		Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
		Err(_) => String::new(),
	}
}

/// Deterministic output trimming.
///
/// Keeps everything before the first `marker` occurrence, normalizes line
/// endings, drops trailing whitespace and blank lines, and returns the last
/// `max_lines` lines (`0` means unlimited).
pub fn trim_output(content: &str, marker: Option<&str>, max_lines: usize) -> String {
	let before = match marker {
		Some(marker) if !marker.is_empty() => content.find(marker).map_or(content, |idx| &content[..idx]),
		_ => content,
	};
	let normalized = before.replace("\r\n", "\n");
	tail_lines(normalized.trim_end(), max_lines)
}

/// Last `max_lines` lines of `text`; `0` keeps everything.
pub fn tail_lines(text: &str, max_lines: usize) -> String {
	if max_lines == 0 {
		return text.to_string();
	}
	let lines: Vec<&str> = text.lines().collect();
	let start = lines.len().saturating_sub(max_lines);
	lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trim_cuts_at_marker_and_keeps_tail() {
		let content = "a\r\nb\r\nc\r\n__M__\nlater\n";
		assert_eq!(trim_output(content, Some("__M__"), 0), "a\nb\nc");
		assert_eq!(trim_output(content, Some("__M__"), 2), "b\nc");
	}

	#[test]
	fn trim_drops_trailing_blank_lines() {
		assert_eq!(trim_output("hi\n\n  \n\t\n", None, 10), "hi");
		assert_eq!(trim_output("", Some("__M__"), 5), "");
	}

	#[test]
	fn trim_is_deterministic() {
		let content = "one\ntwo\nthree\n__M__\n";
		let first = trim_output(content, Some("__M__"), 2);
		for _ in 0..5 {
			assert_eq!(trim_output(content, Some("__M__"), 2), first);
		}
	}

	#[tokio::test]
	async fn marker_ends_the_wait() {
		let dir = tempfile::tempdir().unwrap();
		let log = dir.path().join("out.log");
		std::fs::write(&log, "hello\nworld\n__DONE__\n").unwrap();

		let req = CaptureRequest {
			log_file: log,
			marker: "__DONE__".into(),
			timeout: Duration::from_secs(5),
			max_lines: 100,
			poll_interval: Duration::from_millis(20),
		};
		let capture = wait_for_marker(&req, &CancellationToken::new()).await;
		assert_eq!(capture.state, CaptureState::MarkerFound);
		assert_eq!(capture.output, "hello\nworld");
	}

	#[tokio::test]
	async fn marker_written_later_is_picked_up() {
		let dir = tempfile::tempdir().unwrap();
		let log = dir.path().join("late.log");
		let writer_path = log.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(150)).await;
			tokio::fs::write(&writer_path, "built\n__DONE__\n").await.unwrap();
		});

		let req = CaptureRequest {
			log_file: log,
			marker: "__DONE__".into(),
			timeout: Duration::from_secs(5),
			max_lines: 0,
			poll_interval: Duration::from_millis(25),
		};
		let capture = wait_for_marker(&req, &CancellationToken::new()).await;
		assert_eq!(capture.state, CaptureState::MarkerFound);
		assert_eq!(capture.output, "built");
	}

	#[tokio::test]
	async fn timeout_overshoot_is_bounded() {
		let dir = tempfile::tempdir().unwrap();
		let log = dir.path().join("slow.log");
		std::fs::write(&log, "partial\n").unwrap();

		let timeout = Duration::from_millis(300);
		let poll = Duration::from_millis(200);
		let req = CaptureRequest {
			log_file: log,
			marker: "__NEVER__".into(),
			timeout,
			max_lines: 10,
			poll_interval: poll,
		};
		let started = std::time::Instant::now();
		let capture = wait_for_marker(&req, &CancellationToken::new()).await;
		let elapsed = started.elapsed();

		assert_eq!(capture.state, CaptureState::TimedOut);
		assert!(capture.output.starts_with("partial\n[terminator]"));
		assert!(elapsed < timeout + poll + Duration::from_millis(250), "took {elapsed:?}");
	}

	#[tokio::test]
	async fn missing_file_reads_as_empty() {
		let dir = tempfile::tempdir().unwrap();
		let output = capture_initial(
			&dir.path().join("absent.log"),
			Duration::from_millis(60),
			10,
			Duration::from_millis(20),
			&CancellationToken::new(),
		)
		.await;
		assert_eq!(output, "");
	}

	#[tokio::test]
	async fn cancellation_stops_polling() {
		let dir = tempfile::tempdir().unwrap();
		let token = CancellationToken::new();
		let req = CaptureRequest {
			log_file: dir.path().join("never.log"),
			marker: "__NEVER__".into(),
			timeout: Duration::from_secs(30),
			max_lines: 0,
			poll_interval: Duration::from_millis(50),
		};
		let canceller = token.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(100)).await;
			canceller.cancel();
		});

		let capture = wait_for_marker(&req, &token).await;
		assert_eq!(capture.state, CaptureState::Cancelled);
		assert!(capture.elapsed < Duration::from_secs(5));
	}
}
