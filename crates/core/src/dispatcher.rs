//! Command dispatch: the `execute`, `read`, `list`, `focus`, `kill`, and
//! `info` actions.
//!
//! An execute call walks
//!
//! ```text
//! resolve ─► clear ─► busy check ─► wrap ─► submit ─┬─► poll for marker ─► (timeout kill)
//!                                                   └─► background snapshot
//! ```
//!
//! strictly in order. The session lock covers resolve through submit.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use terminator_protocol::{
	ExecuteOutcome, ExecuteRequest, FocusMode, KillMethod, KillOutcome, ReadOutcome, SessionHandle,
};
use terminator_runtime::{ProcessInspector, ScriptRunner, SystemInspector, Termination};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{TerminalBackend, create_backend};
use crate::busy::{BusyMachine, BusyReport, BusySettings, BusyState, pre_kill_hook};
use crate::capture::{self, CaptureRequest, CaptureState};
use crate::command;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::lock::SessionLock;
use crate::logs::LogFile;
use crate::registry::{SessionKey, SessionRegistry, session_lock_name};

/// Effective engine setup reported by the `info` action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
	pub backend: &'static str,
	pub config: serde_json::Value,
}

pub struct Dispatcher {
	backend: Arc<dyn TerminalBackend>,
	inspector: Arc<dyn ProcessInspector>,
	registry: SessionRegistry,
	config: EngineConfig,
	cancel: CancellationToken,
}

impl Dispatcher {
	pub fn new(backend: Arc<dyn TerminalBackend>, inspector: Arc<dyn ProcessInspector>, config: EngineConfig) -> Self {
		let registry = SessionRegistry::new(backend.clone(), inspector.clone(), config.window_grouping);
		Self {
			backend,
			inspector,
			registry,
			config,
			cancel: CancellationToken::new(),
		}
	}

	/// Dispatcher driving the configured terminal application and the real
	/// process table.
	pub fn system(config: EngineConfig) -> Self {
		let backend = create_backend(config.app, ScriptRunner::new(config.script_timeout));
		Self::new(backend, Arc::new(SystemInspector::new()), config)
	}

	/// Token that aborts any in-flight output polling when cancelled.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn registry(&self) -> &SessionRegistry {
		&self.registry
	}

	/// Runs (or only prepares) a command in the session for `req.tag`.
	pub async fn execute(&self, req: ExecuteRequest) -> Result<ExecuteOutcome> {
		let key = SessionKey::new(&req.tag, req.project_path.as_deref())?;
		let command = req.effective_command().map(str::to_string);
		let prepared_only = command.is_none();
		let max_lines = req.lines.unwrap_or(self.config.default_lines);

		let lock = self.lock(key.tag(), &key.lock_name()).await?;

		let resolved = self
			.registry
			.resolve(&key, req.focus.activates(prepared_only, true))
			.await?;
		let created = resolved.created;
		let mut session = resolved.handle;

		// A tag-only request can land on a project-scoped tab; project callers
		// guard that tab under its own name.
		let scoped = match (key.project_hash(), session.project_hash.as_deref()) {
			(None, Some(_)) => Some(self.lock(key.tag(), &session_lock_name(&session)).await?),
			_ => None,
		};
		let lock = (lock, scoped);
		let activate = req.focus.activates(prepared_only, created);
		let (window, tab) = (session.id.window.clone(), session.id.tab.clone());

		if req.clear {
			self.backend.clear_screen(&window, &tab, activate).await?;
		}

		let Some(command) = command else {
			if activate {
				self.backend.select_tab(&window, &tab).await?;
			}
			drop(lock);
			info!(target = "terminator.dispatch", tag = %session.tag, id = %session.id, created, "session prepared");
			return Ok(ExecuteOutcome {
				session,
				output: String::new(),
				pid: None,
				killed_by_timeout: false,
				timed_out: false,
				background: req.background,
				prepared_only: true,
				created,
				log_file: None,
				warnings: Vec::new(),
			});
		};

		let report = self.free_session(&session, activate, BusyState::Check).await;
		let mut warnings = report.warnings;
		if let BusyState::StillBusy(process) = report.state {
			if !self.config.reuse_busy {
				return Err(Error::SessionBusy {
					tag: session.tag.clone(),
					command: Some(process.command),
				});
			}
			warnings.push(format!(
				"session still running {} (pgid {}); submitting anyway",
				process.command, process.pgid
			));
		}

		let log = LogFile::allocate(&self.config.log_dir, session.tty.as_deref())?;

		if req.background {
			let wrapped = command::background(&command, log.path());
			self.backend.submit_command(&window, &tab, &wrapped, activate).await?;
			drop(lock);
			info!(target = "terminator.dispatch", tag = %session.tag, id = %session.id, "background command submitted");

			let output = capture::capture_initial(
				log.path(),
				self.config.background_timeout,
				max_lines,
				self.config.poll_interval,
				&self.cancel,
			)
			.await;
			self.registry.refresh_busy(&mut session).await;
			return Ok(ExecuteOutcome {
				session,
				output,
				pid: None,
				killed_by_timeout: false,
				timed_out: false,
				background: true,
				prepared_only: false,
				created,
				log_file: Some(log.retain()),
				warnings,
			});
		}

		let marker = command::completion_marker();
		let wrapped = command::foreground(&command, log.path(), &marker);
		self.backend.submit_command(&window, &tab, &wrapped, activate).await?;
		drop(lock);
		debug!(target = "terminator.dispatch", tag = %session.tag, id = %session.id, "foreground command submitted");

		let timeout = req
			.timeout_secs
			.map(std::time::Duration::from_secs)
			.unwrap_or(self.config.foreground_timeout);
		let capture = capture::wait_for_marker(
			&CaptureRequest {
				log_file: log.path().to_path_buf(),
				marker,
				timeout,
				max_lines,
				poll_interval: self.config.poll_interval,
			},
			&self.cancel,
		)
		.await;

		let mut outcome = ExecuteOutcome {
			session: session.clone(),
			output: capture.output,
			pid: None,
			killed_by_timeout: false,
			timed_out: false,
			background: false,
			prepared_only: false,
			created,
			log_file: None,
			warnings,
		};

		match capture.state {
			CaptureState::MarkerFound => log.discard(),
			CaptureState::TimedOut => {
				outcome.timed_out = true;
				self.kill_after_timeout(&session, &mut outcome).await;
				outcome.log_file = Some(log.retain());
			}
			CaptureState::Cancelled | CaptureState::Waiting => {
				outcome.warnings.push("output capture cancelled".to_string());
				outcome.log_file = Some(log.retain());
			}
		}

		self.registry.refresh_busy(&mut session).await;
		outcome.session = session;
		info!(
			target = "terminator.dispatch",
			tag = %outcome.session.tag,
			timed_out = outcome.timed_out,
			killed = outcome.killed_by_timeout,
			"foreground command finished"
		);
		Ok(outcome)
	}

	/// Scrollback of the session, trimmed to the last `lines` lines.
	pub async fn read(&self, tag: &str, project: Option<&Path>, lines: Option<usize>) -> Result<ReadOutcome> {
		let key = SessionKey::new(tag, project)?;
		let session = self.registry.require(&key).await?;
		let raw = self.backend.read_history(&session.id.window, &session.id.tab).await?;
		let history = capture::trim_output(&raw, None, lines.unwrap_or(self.config.default_lines));
		let lines = if history.is_empty() { 0 } else { history.lines().count() };
		Ok(ReadOutcome { session, history, lines })
	}

	pub async fn list(&self, tag: Option<&str>) -> Result<Vec<SessionHandle>> {
		self.registry.list(tag).await
	}

	/// Brings the session's tab forward.
	pub async fn focus(&self, tag: &str, project: Option<&Path>) -> Result<SessionHandle> {
		let key = SessionKey::new(tag, project)?;
		let session = self.registry.require(&key).await?;
		self.backend.select_tab(&session.id.window, &session.id.tab).await?;
		Ok(session)
	}

	/// Interrupts the session's foreground process, escalating to SIGTERM
	/// and SIGKILL when it ignores SIGINT.
	pub async fn kill(&self, tag: &str, project: Option<&Path>, focus: FocusMode) -> Result<KillOutcome> {
		let key = SessionKey::new(tag, project)?;
		let mut session = self.registry.require(&key).await?;
		let activate = focus.activates(false, false);
		if activate {
			self.backend.select_tab(&session.id.window, &session.id.tab).await?;
		}

		let process = match session.tty.as_deref() {
			Some(tty) => self.inspector.foreground_process(tty).await?,
			None => None,
		};
		let Some(process) = process else {
			debug!(target = "terminator.dispatch", tag = %session.tag, "nothing to kill");
			return Ok(KillOutcome {
				session,
				process: None,
				interrupted: false,
				method: None,
				still_running: false,
				warnings: Vec::new(),
			});
		};

		let report = self
			.free_session(&session, activate, BusyState::Interrupt(process.clone()))
			.await;
		let mut warnings = report.warnings;
		let mut method = report.method;
		let mut still_running = false;

		if let BusyState::StillBusy(survivor) = report.state {
			match self.inspector.terminate_group(survivor.pgid, self.config.kill_grace).await {
				Termination::Exited | Termination::Killed => method = Some(KillMethod::Signal),
				Termination::Survived => {
					warnings.push(format!("{} (pgid {}) survived SIGKILL", survivor.command, survivor.pgid));
					still_running = true;
				}
				Termination::SignalFailed => {
					return Err(Error::ProcessControl(format!(
						"could not signal {} (pgid {})",
						survivor.command, survivor.pgid
					)));
				}
			}
		}

		self.registry.refresh_busy(&mut session).await;
		info!(
			target = "terminator.dispatch",
			tag = %session.tag,
			pgid = process.pgid,
			still_running,
			"kill finished"
		);
		Ok(KillOutcome {
			session,
			process: Some(process),
			interrupted: method.is_some(),
			method,
			still_running,
			warnings,
		})
	}

	pub fn info(&self) -> EngineInfo {
		EngineInfo {
			backend: self.backend.name(),
			config: self.config.snapshot(),
		}
	}

	async fn lock(&self, tag: &str, name: &str) -> Result<SessionLock> {
		SessionLock::acquire(&self.config.lock_dir(), name, self.config.lock_timeout)
			.await?
			.ok_or_else(|| Error::SessionBusy {
				tag: tag.to_string(),
				command: None,
			})
	}

	fn busy_settings(&self, activate: bool) -> BusySettings<'_> {
		BusySettings {
			sigint_wait: self.config.sigint_wait,
			pre_kill_script: self.config.pre_kill_script.as_deref(),
			hook_timeout: self.config.hook_timeout,
			activate,
		}
	}

	async fn free_session(&self, session: &SessionHandle, activate: bool, start: BusyState) -> BusyReport {
		BusyMachine::new(
			self.backend.as_ref(),
			self.inspector.as_ref(),
			session,
			self.busy_settings(activate),
		)
		.run_from(start)
		.await
	}

	/// Terminates whatever still holds the session after a foreground timeout.
	async fn kill_after_timeout(&self, session: &SessionHandle, outcome: &mut ExecuteOutcome) {
		let Some(tty) = session.tty.as_deref() else {
			outcome.warnings.push("session tty unknown; timed-out command left running".to_string());
			return;
		};
		let process = match self.inspector.foreground_process(tty).await {
			Ok(Some(process)) => process,
			Ok(None) => return,
			Err(err) => {
				outcome.warnings.push(format!("could not inspect {tty}: {err}"));
				return;
			}
		};

		if let Some(warning) = pre_kill_hook(session, &process, &self.busy_settings(false)).await {
			outcome.warnings.push(warning);
		}

		let termination = self.inspector.terminate_group(process.pgid, self.config.kill_grace).await;
		outcome.pid = u32::try_from(process.pid).ok();
		outcome.killed_by_timeout = termination.attempted();
		match termination {
			Termination::Exited | Termination::Killed => {
				info!(target = "terminator.dispatch", tag = %session.tag, pgid = process.pgid, ?termination, "killed timed-out command");
			}
			Termination::Survived => {
				warn!(target = "terminator.dispatch", tag = %session.tag, pgid = process.pgid, "timed-out command survived SIGKILL");
				outcome
					.warnings
					.push(format!("{} (pgid {}) survived SIGKILL", process.command, process.pgid));
			}
			Termination::SignalFailed => {
				warn!(target = "terminator.dispatch", tag = %session.tag, pgid = process.pgid, "could not signal timed-out command");
				outcome
					.warnings
					.push(format!("could not signal {} (pgid {})", process.command, process.pgid));
			}
		}
	}
}
