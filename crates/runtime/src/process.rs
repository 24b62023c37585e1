//! Foreground process discovery and process-group signaling.
//!
//! A terminal session is "busy" when a non-shell process sits in the
//! foreground process group of its TTY. Detached jobs never count.
//! The OS process table is the only source of truth: results are derived on
//! every query and never cached.

use std::time::Duration;

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use terminator_protocol::ProcessInfo;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::Result;

/// Interval between liveness probes while waiting for a group to exit.
const TERMINATION_POLL: Duration = Duration::from_millis(100);

/// Time allowed for the kernel to reap a group after SIGKILL.
const KILL_SETTLE: Duration = Duration::from_millis(500);

/// Signals the engine sends to process groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSignal {
	Interrupt,
	Terminate,
	Kill,
}

impl GroupSignal {
	fn as_nix(self) -> Signal {
		match self {
			Self::Interrupt => Signal::SIGINT,
			Self::Terminate => Signal::SIGTERM,
			Self::Kill => Signal::SIGKILL,
		}
	}
}

/// How a terminate-then-kill escalation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
	/// The group exited after SIGTERM (or was already gone).
	Exited,
	/// The group only went away after SIGKILL.
	Killed,
	/// The group is still alive after SIGKILL.
	Survived,
	/// No signal could be delivered.
	SignalFailed,
}

impl Termination {
	/// Whether any signal reached the group.
	pub fn attempted(self) -> bool {
		!matches!(self, Self::SignalFailed)
	}
}

/// Read access to the process table plus process-group signaling.
#[async_trait]
pub trait ProcessInspector: Send + Sync {
	/// Most relevant non-shell process attached to `tty`, if any.
	async fn foreground_process(&self, tty: &str) -> Result<Option<ProcessInfo>>;

	/// Sends `signal` to every member of `pgid`.
	///
	/// Returns whether the signal call succeeded, not whether the group died.
	fn signal_group(&self, pgid: i32, signal: GroupSignal) -> bool;

	/// Whether `pgid` still has at least one non-zombie member.
	async fn is_group_alive(&self, pgid: i32) -> bool;

	/// SIGTERM, wait up to `grace` for the group to exit, then SIGKILL.
	async fn terminate_group(&self, pgid: i32, grace: Duration) -> Termination {
		if !self.signal_group(pgid, GroupSignal::Terminate) {
			return if self.is_group_alive(pgid).await {
				Termination::SignalFailed
			} else {
				Termination::Exited
			};
		}

		let deadline = Instant::now() + grace;
		loop {
			if !self.is_group_alive(pgid).await {
				return Termination::Exited;
			}
			let now = Instant::now();
			if now >= deadline {
				break;
			}
			tokio::time::sleep(TERMINATION_POLL.min(deadline - now)).await;
		}

		debug!(target = "terminator.process", pgid, "group ignored SIGTERM; sending SIGKILL");
		if !self.signal_group(pgid, GroupSignal::Kill) {
			return if self.is_group_alive(pgid).await {
				Termination::SignalFailed
			} else {
				Termination::Exited
			};
		}

		let deadline = Instant::now() + KILL_SETTLE;
		while Instant::now() < deadline {
			if !self.is_group_alive(pgid).await {
				return Termination::Killed;
			}
			tokio::time::sleep(TERMINATION_POLL).await;
		}
		if self.is_group_alive(pgid).await {
			Termination::Survived
		} else {
			Termination::Killed
		}
	}
}

/// [`ProcessInspector`] backed by `ps` and `killpg(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInspector;

impl SystemInspector {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl ProcessInspector for SystemInspector {
	async fn foreground_process(&self, tty: &str) -> Result<Option<ProcessInfo>> {
		let output = Command::new("ps")
			.args(["-t", tty_arg(tty), "-o", "pid=,pgid=,tpgid=,stat=,comm="])
			.output()
			.await?;

		// ps exits non-zero when no process matches; stdout is still authoritative.
		let stdout = String::from_utf8_lossy(&output.stdout);
		let entries: Vec<TtyProcess> = stdout.lines().filter_map(parse_tty_line).collect();
		let picked = pick_foreground(&entries);
		debug!(
			target = "terminator.process",
			tty,
			candidates = entries.len(),
			picked = ?picked.as_ref().map(|p| p.pid),
			"foreground scan"
		);
		Ok(picked)
	}

	fn signal_group(&self, pgid: i32, signal: GroupSignal) -> bool {
		if pgid <= 1 {
			warn!(target = "terminator.process", pgid, "refusing to signal reserved process group");
			return false;
		}
		match killpg(Pid::from_raw(pgid), signal.as_nix()) {
			Ok(()) => {
				debug!(target = "terminator.process", pgid, ?signal, "signaled group");
				true
			}
			Err(err) => {
				warn!(target = "terminator.process", pgid, ?signal, error = %err, "killpg failed");
				false
			}
		}
	}

	async fn is_group_alive(&self, pgid: i32) -> bool {
		if pgid <= 1 {
			return false;
		}
		match killpg(Pid::from_raw(pgid), None) {
			Err(Errno::ESRCH) => return false,
			Err(Errno::EPERM) => return true,
			Err(_) => return false,
			Ok(()) => {}
		}

		// The group exists; make sure it is not only zombies waiting to be reaped.
		match Command::new("ps").args(["-axo", "pid=,pgid=,stat="]).output().await {
			Ok(output) => group_has_live_member(&String::from_utf8_lossy(&output.stdout), pgid),
			Err(err) => {
				debug!(target = "terminator.process", pgid, error = %err, "ps unavailable; assuming alive");
				true
			}
		}
	}
}

/// One row of `ps -t <tty> -o pid=,pgid=,tpgid=,stat=,comm=`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TtyProcess {
	pid: i32,
	pgid: i32,
	tpgid: i32,
	stat: String,
	command: String,
}

impl TtyProcess {
	fn in_foreground_group(&self) -> bool {
		self.pgid == self.tpgid || self.stat.contains('+')
	}

	fn is_zombie(&self) -> bool {
		self.stat.starts_with('Z')
	}
}

fn tty_arg(tty: &str) -> &str {
	tty.strip_prefix("/dev/").unwrap_or(tty)
}

fn parse_tty_line(line: &str) -> Option<TtyProcess> {
	let mut parts = line.split_whitespace();
	let pid = parts.next()?.parse().ok()?;
	let pgid = parts.next()?.parse().ok()?;
	let tpgid = parts.next()?.parse().ok()?;
	let stat = parts.next()?.to_string();
	let command = parts.collect::<Vec<_>>().join(" ");
	if command.is_empty() {
		return None;
	}
	Some(TtyProcess {
		pid,
		pgid,
		tpgid,
		stat,
		command,
	})
}

/// Strips the directory and the login-shell dash from a `comm` value.
pub fn command_basename(command: &str) -> &str {
	let name = command.rsplit('/').next().unwrap_or(command);
	name.strip_prefix('-').unwrap_or(name)
}

/// Whether `name` is an interactive shell that never counts as busy.
pub fn is_shell(name: &str) -> bool {
	matches!(
		command_basename(name),
		"bash" | "zsh" | "sh" | "fish" | "tcsh" | "csh" | "login"
	)
}

/// Lower is more relevant: running, uninterruptible, sleeping, stopped.
fn state_rank(stat: &str) -> u8 {
	match stat.chars().next() {
		Some('R') => 0,
		Some('D') | Some('U') => 1,
		Some('S') | Some('I') => 2,
		Some('T') => 3,
		_ => 2,
	}
}

fn pick_foreground(entries: &[TtyProcess]) -> Option<ProcessInfo> {
	entries
		.iter()
		.filter(|p| p.in_foreground_group() && !p.is_zombie() && !is_shell(&p.command))
		.min_by_key(|p| (state_rank(&p.stat), std::cmp::Reverse(p.pid)))
		.map(|p| ProcessInfo {
			pgid: p.pgid,
			pid: p.pid,
			command: command_basename(&p.command).to_string(),
		})
}

fn group_has_live_member(ps_output: &str, pgid: i32) -> bool {
	ps_output.lines().any(|line| {
		let mut parts = line.split_whitespace();
		let (Some(_pid), Some(group), Some(stat)) = (parts.next(), parts.next(), parts.next()) else {
			return false;
		};
		group.parse::<i32>().ok() == Some(pgid) && !stat.starts_with('Z')
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entries(table: &str) -> Vec<TtyProcess> {
		table.lines().filter_map(parse_tty_line).collect()
	}

	#[test]
	fn shells_alone_are_not_busy() {
		let table = "  501   501   501 Ss+  -zsh\n  777   777   501 S    /bin/bash\n";
		assert_eq!(pick_foreground(&entries(table)), None);
	}

	#[test]
	fn foreground_group_wins_over_background_jobs() {
		let table = "\
  501   501   900 Ss   -zsh
  800   800   900 R    yes
  900   900   900 S+   sleep
";
		let picked = pick_foreground(&entries(table)).unwrap();
		assert_eq!(picked.pid, 900);
		assert_eq!(picked.command, "sleep");
	}

	#[test]
	fn detached_jobs_at_the_prompt_are_not_busy() {
		let table = "  501   501   501 Ss+  -zsh\n  800   800   501 S    node\n";
		assert_eq!(pick_foreground(&entries(table)), None);

		let table = "  501   501   501 Ss+  -zsh\n  800   800   501 R    node\n  810   810   501 S    python3\n";
		assert_eq!(pick_foreground(&entries(table)), None);
	}

	#[test]
	fn plus_flag_marks_foreground_when_tpgid_is_stale() {
		let table = "  501   501    -1 Ss   -zsh\n  700   700    -1 S+   cargo\n";
		let picked = pick_foreground(&entries(table)).unwrap();
		assert_eq!(picked.pgid, 700);
	}

	#[test]
	fn running_beats_sleeping_then_highest_pid() {
		let table = "\
  900   900   900 S+   make
  901   900   900 R+   cc
  902   900   900 S+   cc
";
		assert_eq!(pick_foreground(&entries(table)).unwrap().pid, 901);

		let table = "\
  910   910   910 S+   node
  920   910   910 S+   node
  930   910   910 T+   vim
";
		assert_eq!(pick_foreground(&entries(table)).unwrap().pid, 920);
	}

	#[test]
	fn zombies_are_ignored() {
		let table = "  501   501   600 Ss   zsh\n  600   600   600 Z+   python3\n";
		assert_eq!(pick_foreground(&entries(table)), None);
	}

	#[test]
	fn command_paths_and_login_dashes_are_stripped() {
		assert_eq!(command_basename("/usr/local/bin/python3"), "python3");
		assert_eq!(command_basename("-zsh"), "zsh");
		assert!(is_shell("/bin/zsh"));
		assert!(is_shell("-login"));
		assert!(!is_shell("zshdb"));
	}

	#[test]
	fn malformed_rows_are_skipped() {
		assert!(parse_tty_line("").is_none());
		assert!(parse_tty_line("  12 abc 12 S sleep").is_none());
		assert!(parse_tty_line("  12 12 12 S").is_none());
	}

	#[test]
	fn tty_prefix_is_removed_for_ps() {
		assert_eq!(tty_arg("/dev/ttys004"), "ttys004");
		assert_eq!(tty_arg("pts/3"), "pts/3");
	}

	#[test]
	fn zombie_only_groups_are_dead() {
		let table = "  10 10 Z\n  11 10 Z+\n  12 12 S\n";
		assert!(!group_has_live_member(table, 10));
		assert!(group_has_live_member(table, 12));
		assert!(!group_has_live_member(table, 99));
	}

	#[test]
	fn reserved_groups_are_never_signaled() {
		let inspector = SystemInspector::new();
		assert!(!inspector.signal_group(0, GroupSignal::Interrupt));
		assert!(!inspector.signal_group(1, GroupSignal::Kill));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn terminate_group_stops_a_sleeping_group() {
		use std::process::Stdio;

		let mut child = Command::new("sleep")
			.arg("30")
			.process_group(0)
			.stdout(Stdio::null())
			.spawn()
			.unwrap();
		let pgid = child.id().unwrap() as i32;
		let reaper = tokio::spawn(async move { child.wait().await });

		let inspector = SystemInspector::new();
		assert!(inspector.is_group_alive(pgid).await);

		let result = inspector.terminate_group(pgid, Duration::from_secs(2)).await;
		assert!(matches!(result, Termination::Exited | Termination::Killed));
		reaper.await.unwrap().unwrap();
		assert!(!inspector.is_group_alive(pgid).await);
	}
}
