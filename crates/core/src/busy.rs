//! Freeing a session from a busy foreground process.
//!
//! ```text
//! Check ──none──► Free
//!   │
//!   └─process──► Interrupt ──wait──► Reconfirm ──dead──► Free
//!                                        └──alive──► StillBusy
//! ```
//!
//! Each transition is one [`BusyMachine::step`] so callers and tests can
//! drive the machine from any state. Failures to interrupt are collected as
//! warnings; only the final state decides what happens next.

use std::time::Duration;

use terminator_protocol::{KillMethod, ProcessInfo, SessionHandle};
use terminator_runtime::{GroupSignal, HookContext, ProcessInspector, run_pre_kill_hook};
use tracing::{debug, info, warn};

use crate::backend::TerminalBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusyState {
	Check,
	Interrupt(ProcessInfo),
	Reconfirm(ProcessInfo),
	Free,
	StillBusy(ProcessInfo),
}

impl BusyState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Free | Self::StillBusy(_))
	}
}

/// Knobs for one busy check.
#[derive(Debug, Clone, Copy)]
pub struct BusySettings<'a> {
	pub sigint_wait: Duration,
	pub pre_kill_script: Option<&'a str>,
	pub hook_timeout: Duration,
	/// Whether the keystroke fallback may bring the terminal forward.
	pub activate: bool,
}

/// Outcome of running the machine to a terminal state.
#[derive(Debug, Clone)]
pub struct BusyReport {
	/// Either [`BusyState::Free`] or [`BusyState::StillBusy`].
	pub state: BusyState,
	/// Process that was interrupted, if any.
	pub interrupted: Option<ProcessInfo>,
	pub method: Option<KillMethod>,
	pub warnings: Vec<String>,
}

pub struct BusyMachine<'a> {
	backend: &'a dyn TerminalBackend,
	inspector: &'a dyn ProcessInspector,
	session: &'a SessionHandle,
	settings: BusySettings<'a>,
	interrupted: Option<ProcessInfo>,
	method: Option<KillMethod>,
	warnings: Vec<String>,
}

impl<'a> BusyMachine<'a> {
	pub fn new(
		backend: &'a dyn TerminalBackend,
		inspector: &'a dyn ProcessInspector,
		session: &'a SessionHandle,
		settings: BusySettings<'a>,
	) -> Self {
		Self {
			backend,
			inspector,
			session,
			settings,
			interrupted: None,
			method: None,
			warnings: Vec::new(),
		}
	}

	/// Performs one transition.
	pub async fn step(&mut self, state: BusyState) -> BusyState {
		match state {
			BusyState::Check => self.check().await,
			BusyState::Interrupt(process) => self.interrupt(process).await,
			BusyState::Reconfirm(process) => {
				if self.inspector.is_group_alive(process.pgid).await {
					warn!(
						target = "terminator.busy",
						tag = %self.session.tag,
						pgid = process.pgid,
						command = %process.command,
						"process survived interrupt"
					);
					BusyState::StillBusy(process)
				} else {
					debug!(target = "terminator.busy", tag = %self.session.tag, pgid = process.pgid, "process exited after interrupt");
					BusyState::Free
				}
			}
			terminal => terminal,
		}
	}

	/// Steps from `start` until the machine settles.
	pub async fn run_from(mut self, start: BusyState) -> BusyReport {
		let mut state = start;
		while !state.is_terminal() {
			state = self.step(state).await;
		}
		BusyReport {
			state,
			interrupted: self.interrupted,
			method: self.method,
			warnings: self.warnings,
		}
	}

	async fn check(&mut self) -> BusyState {
		let Some(tty) = self.session.tty.as_deref() else {
			return BusyState::Free;
		};
		match self.inspector.foreground_process(tty).await {
			Ok(Some(process)) => BusyState::Interrupt(process),
			Ok(None) => BusyState::Free,
			Err(err) => {
				self.warnings.push(format!("could not inspect {tty}: {err}"));
				BusyState::Free
			}
		}
	}

	async fn interrupt(&mut self, process: ProcessInfo) -> BusyState {
		self.run_hook(&process).await;

		info!(
			target = "terminator.busy",
			tag = %self.session.tag,
			pgid = process.pgid,
			command = %process.command,
			"interrupting foreground process"
		);
		if self.inspector.signal_group(process.pgid, GroupSignal::Interrupt) {
			self.method = Some(KillMethod::Signal);
		} else {
			let id = &self.session.id;
			match self.backend.send_interrupt(&id.window, &id.tab, self.settings.activate).await {
				Ok(()) => self.method = Some(KillMethod::InterruptKeystroke),
				Err(err) => self
					.warnings
					.push(format!("could not interrupt {} (pgid {}): {err}", process.command, process.pgid)),
			}
		}
		self.interrupted = Some(process.clone());

		tokio::time::sleep(self.settings.sigint_wait).await;
		BusyState::Reconfirm(process)
	}

	/// Runs the configured pre-kill hook; failures become warnings.
	pub async fn run_hook(&mut self, process: &ProcessInfo) {
		if let Some(warning) = pre_kill_hook(self.session, process, &self.settings).await {
			self.warnings.push(warning);
		}
	}
}

/// Runs the pre-kill hook for `process`, returning a warning on failure.
pub async fn pre_kill_hook(session: &SessionHandle, process: &ProcessInfo, settings: &BusySettings<'_>) -> Option<String> {
	let script = settings.pre_kill_script?;
	let ctx = HookContext {
		tag: &session.tag,
		tty: session.tty.as_deref(),
		process,
	};
	match run_pre_kill_hook(script, &ctx, settings.hook_timeout).await {
		Ok(()) => None,
		Err(err) => {
			warn!(target = "terminator.busy", tag = %session.tag, error = %err, "pre-kill hook failed");
			Some(format!("pre-kill hook failed: {err}"))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{InspectorCall, MockBackend, ScriptedInspector};
	use terminator_protocol::SessionId;

	fn session(tty: Option<&str>) -> SessionHandle {
		SessionHandle {
			id: SessionId::new("1", "1"),
			tag: "build".into(),
			project_path: None,
			project_hash: None,
			tty: tty.map(str::to_string),
			title: "build [tm:-]".into(),
			is_busy: false,
		}
	}

	fn settings() -> BusySettings<'static> {
		BusySettings {
			sigint_wait: Duration::from_millis(10),
			pre_kill_script: None,
			hook_timeout: Duration::from_secs(1),
			activate: false,
		}
	}

	fn process(pgid: i32) -> ProcessInfo {
		ProcessInfo {
			pgid,
			pid: pgid,
			command: "sleep".into(),
		}
	}

	#[tokio::test]
	async fn idle_session_is_free_without_signals() {
		let backend = MockBackend::new();
		let inspector = ScriptedInspector::new();
		let handle = session(Some("/dev/ttys001"));
		let report = BusyMachine::new(&backend, &inspector, &handle, settings())
			.run_from(BusyState::Check)
			.await;
		assert_eq!(report.state, BusyState::Free);
		assert!(report.interrupted.is_none());
		assert!(inspector.signals().is_empty());
	}

	#[tokio::test]
	async fn unknown_tty_counts_as_free() {
		let backend = MockBackend::new();
		let inspector = ScriptedInspector::new();
		let handle = session(None);
		let mut machine = BusyMachine::new(&backend, &inspector, &handle, settings());
		assert_eq!(machine.step(BusyState::Check).await, BusyState::Free);
		assert!(inspector.calls().is_empty());
	}

	#[tokio::test]
	async fn interrupt_then_reconfirm_frees_the_session() {
		let backend = MockBackend::new();
		let inspector = ScriptedInspector::new();
		inspector.set_foreground("/dev/ttys001", process(700));
		inspector.dies_on(700, GroupSignal::Interrupt);
		let handle = session(Some("/dev/ttys001"));

		let mut machine = BusyMachine::new(&backend, &inspector, &handle, settings());
		let state = machine.step(BusyState::Check).await;
		assert_eq!(state, BusyState::Interrupt(process(700)));
		let state = machine.step(state).await;
		assert_eq!(state, BusyState::Reconfirm(process(700)));
		assert_eq!(machine.step(state).await, BusyState::Free);
		assert_eq!(inspector.signals(), vec![(700, GroupSignal::Interrupt)]);
	}

	#[tokio::test]
	async fn stubborn_process_stays_busy() {
		let backend = MockBackend::new();
		let inspector = ScriptedInspector::new();
		inspector.set_foreground("/dev/ttys001", process(701));
		let handle = session(Some("/dev/ttys001"));

		let report = BusyMachine::new(&backend, &inspector, &handle, settings())
			.run_from(BusyState::Check)
			.await;
		assert_eq!(report.state, BusyState::StillBusy(process(701)));
		assert_eq!(report.method, Some(KillMethod::Signal));

		let calls = inspector.calls();
		let signal_at = calls
			.iter()
			.position(|c| *c == InspectorCall::Signal(701, GroupSignal::Interrupt))
			.unwrap();
		let alive_at = calls.iter().position(|c| *c == InspectorCall::Alive(701)).unwrap();
		assert!(signal_at < alive_at);
	}

	#[tokio::test]
	async fn failed_signal_falls_back_to_keystroke() {
		let backend = MockBackend::new();
		let inspector = ScriptedInspector::new();
		inspector.set_foreground("/dev/ttys001", process(702));
		inspector.fail_signals();
		let handle = session(Some("/dev/ttys001"));

		let report = BusyMachine::new(&backend, &inspector, &handle, settings())
			.run_from(BusyState::Check)
			.await;
		assert_eq!(report.method, Some(KillMethod::InterruptKeystroke));
		assert_eq!(backend.interrupts(), 1);
	}

	#[tokio::test]
	async fn hook_failure_is_a_warning() {
		let backend = MockBackend::new();
		let inspector = ScriptedInspector::new();
		inspector.set_foreground("/dev/ttys001", process(703));
		inspector.dies_on(703, GroupSignal::Interrupt);
		let handle = session(Some("/dev/ttys001"));
		let settings = BusySettings {
			pre_kill_script: Some("exit 9"),
			..settings()
		};

		let report = BusyMachine::new(&backend, &inspector, &handle, settings)
			.run_from(BusyState::Check)
			.await;
		assert_eq!(report.state, BusyState::Free);
		assert_eq!(report.warnings.len(), 1);
		assert!(report.warnings[0].contains("pre-kill hook"));
	}
}
