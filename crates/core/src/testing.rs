//! Test doubles for the engine.
//!
//! - [`MockBackend`]: in-memory windows and tabs that record every call.
//!   In shell mode it really runs submitted commands under `sh`, each in its
//!   own process group, so capture and kill paths see real processes.
//! - [`ShellInspector`]: pairs with a shell-mode [`MockBackend`]; reports
//!   its running commands as foreground processes and signals them for real.
//!   A submission that returns to the prompt (such as a detached job) stops
//!   counting as soon as its shell exits.
//! - [`ScriptedInspector`]: a process table driven by the test.
//!
//! ```ignore
//! let backend = Arc::new(MockBackend::with_shell());
//! let inspector = Arc::new(backend.inspector());
//! let dispatcher = Dispatcher::new(backend.clone(), inspector, config);
//! ```

use std::collections::{HashMap, HashSet};
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use terminator_protocol::ProcessInfo;
use terminator_runtime::{GroupSignal, ProcessInspector, SystemInspector};

use crate::backend::{BackendError, BackendResult, CreatedTab, TabInfo, TerminalBackend};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
	ListSessions,
	CreateWindow { activate: bool },
	CreateTab { window: String, title: String, activate: bool },
	SelectTab { window: String, tab: String },
	Submit { window: String, tab: String, command: String, activate: bool },
	ReadHistory { window: String, tab: String },
	Clear { window: String, tab: String, activate: bool },
	Interrupt { window: String, tab: String, activate: bool },
}

#[derive(Debug, Clone)]
pub struct MockTab {
	pub id: String,
	pub tty: String,
	pub title: String,
	pub history: String,
}

#[derive(Debug, Default)]
struct MockWindow {
	id: String,
	tabs: Vec<MockTab>,
	next_tab: u32,
}

#[derive(Debug, Default)]
struct MockState {
	windows: Vec<MockWindow>,
	next_window: u32,
	next_tty: u32,
	calls: Vec<BackendCall>,
	failing: HashSet<&'static str>,
	omit_tab_ids: bool,
}

/// Commands started in shell mode, keyed by the tty of their tab.
type RunningTable = Arc<Mutex<HashMap<String, ProcessInfo>>>;

/// In-memory [`TerminalBackend`].
#[derive(Default)]
pub struct MockBackend {
	state: Mutex<MockState>,
	running: Option<RunningTable>,
}

impl MockBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// Backend that runs every submitted command with `sh -c`.
	pub fn with_shell() -> Self {
		Self {
			state: Mutex::default(),
			running: Some(Arc::default()),
		}
	}

	/// Inspector seeing the commands started by this backend.
	///
	/// # Panics
	///
	/// Panics unless the backend was built with [`MockBackend::with_shell`].
	pub fn inspector(&self) -> ShellInspector {
		ShellInspector {
			running: self.running.clone().expect("inspector() requires MockBackend::with_shell()"),
			system: SystemInspector::new(),
			signals: Mutex::default(),
		}
	}

	/// Adds an empty window and returns its id.
	pub fn add_window(&self) -> String {
		let mut state = self.state.lock();
		push_window(&mut state)
	}

	/// Adds a tab titled `title` to `window`, returning `(tab, tty)`.
	pub fn add_tab(&self, window: &str, title: &str) -> (String, String) {
		let mut state = self.state.lock();
		let tab = push_tab(&mut state, window, title).expect("unknown window");
		(tab.id, tab.tty)
	}

	/// Makes every call to `operation` fail (names as in [`BackendCall`],
	/// e.g. `"submit"`, `"clear"`, `"list"`).
	pub fn fail_on(&self, operation: &'static str) {
		self.state.lock().failing.insert(operation);
	}

	/// Makes `create_tab` report an empty tab id.
	pub fn omit_tab_ids(&self) {
		self.state.lock().omit_tab_ids = true;
	}

	pub fn set_history(&self, window: &str, tab: &str, history: &str) {
		let mut state = self.state.lock();
		if let Some(t) = find_tab_mut(&mut state, window, tab) {
			t.history = history.to_string();
		}
	}

	pub fn calls(&self) -> Vec<BackendCall> {
		self.state.lock().calls.clone()
	}

	pub fn clear_calls(&self) {
		self.state.lock().calls.clear();
	}

	/// Commands submitted so far, in order.
	pub fn submitted(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				BackendCall::Submit { command, .. } => Some(command),
				_ => None,
			})
			.collect()
	}

	pub fn interrupts(&self) -> usize {
		self.calls()
			.iter()
			.filter(|c| matches!(c, BackendCall::Interrupt { .. }))
			.count()
	}

	pub fn window_count(&self) -> usize {
		self.state.lock().windows.len()
	}

	pub fn tabs(&self) -> Vec<TabInfo> {
		let state = self.state.lock();
		list(&state)
	}

	fn record(&self, call: BackendCall, operation: &'static str) -> BackendResult<()> {
		let mut state = self.state.lock();
		state.calls.push(call);
		if state.failing.contains(operation) {
			return Err(BackendError::new(format!("mock {operation} failure")));
		}
		Ok(())
	}

	fn spawn(&self, tty: &str, command: &str) -> BackendResult<()> {
		let Some(running) = self.running.clone() else {
			return Ok(());
		};
		let mut child = Command::new("sh")
			.arg("-c")
			.arg(command)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.process_group(0)
			.spawn()
			.map_err(|e| BackendError::new(format!("mock shell failed: {e}")))?;

		let pid = child.id() as i32;
		running.lock().insert(
			tty.to_string(),
			ProcessInfo {
				pgid: pid,
				pid,
				command: "sh".into(),
			},
		);

		let tty = tty.to_string();
		std::thread::spawn(move || {
			let _ = child.wait();
			let mut table = running.lock();
			if table.get(&tty).is_some_and(|p| p.pid == pid) {
				table.remove(&tty);
			}
		});
		Ok(())
	}
}

fn push_window(state: &mut MockState) -> String {
	state.next_window += 1;
	let id = (100 + state.next_window).to_string();
	state.windows.push(MockWindow {
		id: id.clone(),
		..MockWindow::default()
	});
	id
}

fn push_tab(state: &mut MockState, window: &str, title: &str) -> Option<MockTab> {
	state.next_tty += 1;
	let tty = format!("/dev/ttys{:03}", state.next_tty);
	let w = state.windows.iter_mut().find(|w| w.id == window)?;
	w.next_tab += 1;
	let tab = MockTab {
		id: w.next_tab.to_string(),
		tty,
		title: title.to_string(),
		history: String::new(),
	};
	w.tabs.push(tab.clone());
	Some(tab)
}

fn find_tab_mut<'a>(state: &'a mut MockState, window: &str, tab: &str) -> Option<&'a mut MockTab> {
	state
		.windows
		.iter_mut()
		.find(|w| w.id == window)?
		.tabs
		.iter_mut()
		.find(|t| t.id == tab)
}

fn list(state: &MockState) -> Vec<TabInfo> {
	state
		.windows
		.iter()
		.flat_map(|w| {
			w.tabs.iter().map(|t| TabInfo {
				window: w.id.clone(),
				tab: t.id.clone(),
				tty: Some(t.tty.clone()),
				title: t.title.clone(),
			})
		})
		.collect()
}

fn missing(window: &str, tab: &str) -> BackendError {
	BackendError::new(format!("mock tab {window}/{tab} does not exist"))
}

#[async_trait]
impl TerminalBackend for MockBackend {
	fn name(&self) -> &'static str {
		"mock"
	}

	async fn list_sessions(&self) -> BackendResult<Vec<TabInfo>> {
		self.record(BackendCall::ListSessions, "list")?;
		Ok(list(&self.state.lock()))
	}

	async fn create_window(&self, activate: bool) -> BackendResult<String> {
		self.record(BackendCall::CreateWindow { activate }, "create_window")?;
		Ok(push_window(&mut self.state.lock()))
	}

	async fn create_tab(&self, window: &str, title: &str, activate: bool) -> BackendResult<CreatedTab> {
		self.record(
			BackendCall::CreateTab {
				window: window.to_string(),
				title: title.to_string(),
				activate,
			},
			"create_tab",
		)?;
		let mut state = self.state.lock();
		let omit = state.omit_tab_ids;
		let tab = push_tab(&mut state, window, title)
			.ok_or_else(|| BackendError::new(format!("mock window {window} does not exist")))?;
		Ok(CreatedTab {
			tab: if omit { String::new() } else { tab.id },
			tty: Some(tab.tty),
			title: tab.title,
		})
	}

	async fn select_tab(&self, window: &str, tab: &str) -> BackendResult<()> {
		self.record(
			BackendCall::SelectTab {
				window: window.to_string(),
				tab: tab.to_string(),
			},
			"select",
		)?;
		let mut state = self.state.lock();
		find_tab_mut(&mut state, window, tab).map(|_| ()).ok_or_else(|| missing(window, tab))
	}

	async fn submit_command(&self, window: &str, tab: &str, command: &str, activate: bool) -> BackendResult<()> {
		self.record(
			BackendCall::Submit {
				window: window.to_string(),
				tab: tab.to_string(),
				command: command.to_string(),
				activate,
			},
			"submit",
		)?;
		let tty = {
			let mut state = self.state.lock();
			let t = find_tab_mut(&mut state, window, tab).ok_or_else(|| missing(window, tab))?;
			t.history.push_str(command);
			t.history.push('\n');
			t.tty.clone()
		};
		self.spawn(&tty, command)
	}

	async fn read_history(&self, window: &str, tab: &str) -> BackendResult<String> {
		self.record(
			BackendCall::ReadHistory {
				window: window.to_string(),
				tab: tab.to_string(),
			},
			"read",
		)?;
		let mut state = self.state.lock();
		find_tab_mut(&mut state, window, tab)
			.map(|t| t.history.clone())
			.ok_or_else(|| missing(window, tab))
	}

	async fn clear_screen(&self, window: &str, tab: &str, activate: bool) -> BackendResult<()> {
		self.record(
			BackendCall::Clear {
				window: window.to_string(),
				tab: tab.to_string(),
				activate,
			},
			"clear",
		)?;
		let mut state = self.state.lock();
		find_tab_mut(&mut state, window, tab).map(|_| ()).ok_or_else(|| missing(window, tab))
	}

	async fn send_interrupt(&self, window: &str, tab: &str, activate: bool) -> BackendResult<()> {
		self.record(
			BackendCall::Interrupt {
				window: window.to_string(),
				tab: tab.to_string(),
				activate,
			},
			"interrupt",
		)
	}
}

/// [`ProcessInspector`] over the commands a shell-mode [`MockBackend`]
/// started. Signals and liveness go to the real process table.
pub struct ShellInspector {
	running: RunningTable,
	system: SystemInspector,
	signals: Mutex<Vec<(i32, GroupSignal)>>,
}

impl ShellInspector {
	/// Every signal sent so far, in order.
	pub fn signals(&self) -> Vec<(i32, GroupSignal)> {
		self.signals.lock().clone()
	}
}

#[async_trait]
impl ProcessInspector for ShellInspector {
	async fn foreground_process(&self, tty: &str) -> terminator_runtime::Result<Option<ProcessInfo>> {
		let entry = self.running.lock().get(tty).cloned();
		match entry {
			// The reaper thread may lag behind the group's exit.
			Some(process) if self.system.is_group_alive(process.pgid).await => Ok(Some(process)),
			_ => Ok(None),
		}
	}

	fn signal_group(&self, pgid: i32, signal: GroupSignal) -> bool {
		self.signals.lock().push((pgid, signal));
		self.system.signal_group(pgid, signal)
	}

	async fn is_group_alive(&self, pgid: i32) -> bool {
		self.system.is_group_alive(pgid).await
	}
}

/// A recorded inspector call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectorCall {
	Foreground(String),
	Signal(i32, GroupSignal),
	Alive(i32),
}

#[derive(Debug, Default)]
struct ScriptedState {
	foreground: HashMap<String, ProcessInfo>,
	alive: HashSet<i32>,
	dies_on: HashMap<i32, Vec<GroupSignal>>,
	signals_fail: bool,
	calls: Vec<InspectorCall>,
}

/// Process table driven entirely by the test.
#[derive(Default)]
pub struct ScriptedInspector {
	state: Mutex<ScriptedState>,
}

impl ScriptedInspector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Puts `process` in the foreground of `tty` and marks its group alive.
	pub fn set_foreground(&self, tty: &str, process: ProcessInfo) {
		let mut state = self.state.lock();
		state.alive.insert(process.pgid);
		state.foreground.insert(tty.to_string(), process);
	}

	/// The group exits when it receives `signal`.
	pub fn dies_on(&self, pgid: i32, signal: GroupSignal) {
		self.state.lock().dies_on.entry(pgid).or_default().push(signal);
	}

	/// Every `signal_group` call reports failure.
	pub fn fail_signals(&self) {
		self.state.lock().signals_fail = true;
	}

	pub fn calls(&self) -> Vec<InspectorCall> {
		self.state.lock().calls.clone()
	}

	pub fn signals(&self) -> Vec<(i32, GroupSignal)> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				InspectorCall::Signal(pgid, signal) => Some((pgid, signal)),
				_ => None,
			})
			.collect()
	}
}

#[async_trait]
impl ProcessInspector for ScriptedInspector {
	async fn foreground_process(&self, tty: &str) -> terminator_runtime::Result<Option<ProcessInfo>> {
		let mut state = self.state.lock();
		state.calls.push(InspectorCall::Foreground(tty.to_string()));
		Ok(state.foreground.get(tty).cloned())
	}

	fn signal_group(&self, pgid: i32, signal: GroupSignal) -> bool {
		let mut state = self.state.lock();
		state.calls.push(InspectorCall::Signal(pgid, signal));
		if state.signals_fail || !state.alive.contains(&pgid) {
			return false;
		}
		if state.dies_on.get(&pgid).is_some_and(|s| s.contains(&signal)) {
			state.alive.remove(&pgid);
			state.foreground.retain(|_, p| p.pgid != pgid);
		}
		true
	}

	async fn is_group_alive(&self, pgid: i32) -> bool {
		let mut state = self.state.lock();
		state.calls.push(InspectorCall::Alive(pgid));
		state.alive.contains(&pgid)
	}
}
