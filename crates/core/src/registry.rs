//! Session lookup and creation.
//!
//! The registry holds no state of its own: every call lists the terminal's
//! tabs, parses their titles, and asks the inspector which ones are busy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use terminator_protocol::{SessionHandle, SessionId, WindowGrouping};
use terminator_runtime::ProcessInspector;
use tracing::{debug, info};

use crate::backend::{TabInfo, TerminalBackend};
use crate::command;
use crate::error::{Error, Result};
use crate::title::{self, ParsedTitle};

/// Normalized identity a caller asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
	tag: String,
	project: Option<ProjectRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProjectRef {
	path: PathBuf,
	hash: String,
}

impl SessionKey {
	/// Sanitizes `tag` and canonicalizes `project`.
	pub fn new(tag: &str, project: Option<&Path>) -> Result<Self> {
		let tag = title::sanitize_tag(tag)?;
		let project = match project {
			Some(path) => {
				let path = title::canonical_project(path)?;
				let hash = title::project_hash(&path);
				Some(ProjectRef { path, hash })
			}
			None => None,
		};
		Ok(Self { tag, project })
	}

	pub fn tag(&self) -> &str {
		&self.tag
	}

	pub fn project_path(&self) -> Option<&Path> {
		self.project.as_ref().map(|p| p.path.as_path())
	}

	pub fn project_hash(&self) -> Option<&str> {
		self.project.as_ref().map(|p| p.hash.as_str())
	}

	/// Title a new session for this key gets.
	pub fn title(&self) -> String {
		title::format_title(&self.tag, self.project.as_ref().map(|p| (p.path.as_path(), p.hash.as_str())))
	}

	/// File-system friendly name used for the advisory lock.
	pub fn lock_name(&self) -> String {
		lock_name(&self.tag, self.project_hash())
	}

	fn matches(&self, parsed: &ParsedTitle) -> bool {
		parsed.tag == self.tag
			&& match self.project_hash() {
				Some(hash) => parsed.project_hash.as_deref() == Some(hash),
				None => true,
			}
	}
}

/// A resolved session and whether this call created it.
#[derive(Debug, Clone)]
pub struct Resolved {
	pub handle: SessionHandle,
	pub created: bool,
}

pub struct SessionRegistry {
	backend: Arc<dyn TerminalBackend>,
	inspector: Arc<dyn ProcessInspector>,
	grouping: WindowGrouping,
}

impl SessionRegistry {
	pub fn new(backend: Arc<dyn TerminalBackend>, inspector: Arc<dyn ProcessInspector>, grouping: WindowGrouping) -> Self {
		Self {
			backend,
			inspector,
			grouping,
		}
	}

	/// Sessions answering to `key`, in backend enumeration order.
	pub async fn find(&self, key: &SessionKey) -> Result<Vec<SessionHandle>> {
		let tabs = self.backend.list_sessions().await?;
		let mut found = Vec::new();
		for (tab, parsed) in parsed_tabs(tabs) {
			if key.matches(&parsed) {
				found.push(self.lift(tab, parsed, key.project_path()).await);
			}
		}
		Ok(found)
	}

	/// Every session this engine created, optionally narrowed to one tag.
	pub async fn list(&self, tag: Option<&str>) -> Result<Vec<SessionHandle>> {
		let wanted = tag.map(title::sanitize_tag).transpose()?;
		let tabs = self.backend.list_sessions().await?;
		let mut sessions = Vec::new();
		for (tab, parsed) in parsed_tabs(tabs) {
			if wanted.as_deref().is_none_or(|t| t == parsed.tag) {
				sessions.push(self.lift(tab, parsed, None).await);
			}
		}
		Ok(sessions)
	}

	/// First matching session, or [`Error::SessionNotFound`].
	pub async fn require(&self, key: &SessionKey) -> Result<SessionHandle> {
		self.find(key).await?.into_iter().next().ok_or_else(|| Error::SessionNotFound {
			tag: key.tag().to_string(),
			project: key.project_path().map(Path::to_path_buf),
		})
	}

	/// Reuses an idle session, then a busy one, and creates a session only
	/// when nothing matches. `activate` applies to the creation calls.
	pub async fn resolve(&self, key: &SessionKey, activate: bool) -> Result<Resolved> {
		let mut found = self.find(key).await?;
		if !found.is_empty() {
			let idx = found.iter().position(|s| !s.is_busy).unwrap_or(0);
			let handle = found.swap_remove(idx);
			debug!(target = "terminator.registry", tag = key.tag(), id = %handle.id, busy = handle.is_busy, "reusing session");
			return Ok(Resolved { handle, created: false });
		}

		let handle = self.create(key, activate).await?;
		Ok(Resolved { handle, created: true })
	}

	/// Recomputes `handle.is_busy` from the process table.
	pub async fn refresh_busy(&self, handle: &mut SessionHandle) {
		handle.is_busy = self.is_busy(handle.tty.as_deref()).await;
	}

	async fn create(&self, key: &SessionKey, activate: bool) -> Result<SessionHandle> {
		let tabs = self.backend.list_sessions().await?;
		let window = match choose_window(self.grouping, &tabs, key.project_hash()) {
			Some(window) => window,
			None => self.backend.create_window(activate).await?,
		};

		let title = key.title();
		let created = self.backend.create_tab(&window, &title, activate).await?;
		if created.tab.trim().is_empty() {
			return Err(Error::Internal(format!("terminal created a tab in window {window} without an identifier")));
		}

		if let Some(project) = key.project_path() {
			self.backend
				.submit_command(&window, &created.tab, &command::change_directory(project), false)
				.await?;
		}

		info!(
			target = "terminator.registry",
			tag = key.tag(),
			window = %window,
			tab = %created.tab,
			grouping = %self.grouping,
			"created session"
		);

		Ok(SessionHandle {
			id: SessionId::new(window, created.tab),
			tag: key.tag().to_string(),
			project_path: key.project_path().map(Path::to_path_buf),
			project_hash: key.project_hash().map(str::to_string),
			tty: created.tty,
			title: created.title,
			is_busy: false,
		})
	}

	async fn lift(&self, tab: TabInfo, parsed: ParsedTitle, project: Option<&Path>) -> SessionHandle {
		let is_busy = self.is_busy(tab.tty.as_deref()).await;
		SessionHandle {
			id: SessionId::new(tab.window, tab.tab),
			tag: parsed.tag,
			project_path: project.filter(|_| parsed.project_hash.is_some()).map(Path::to_path_buf),
			project_hash: parsed.project_hash,
			tty: tab.tty,
			title: tab.title,
			is_busy,
		}
	}

	async fn is_busy(&self, tty: Option<&str>) -> bool {
		let Some(tty) = tty else {
			return false;
		};
		match self.inspector.foreground_process(tty).await {
			Ok(process) => process.is_some(),
			Err(err) => {
				debug!(target = "terminator.registry", tty, error = %err, "busy check failed; treating as idle");
				false
			}
		}
	}
}

/// Lock name guarding an existing session, derived from its title.
pub fn session_lock_name(handle: &SessionHandle) -> String {
	lock_name(&handle.tag, handle.project_hash.as_deref())
}

fn lock_name(tag: &str, project_hash: Option<&str>) -> String {
	format!("{tag}-{}", project_hash.unwrap_or("global"))
}

fn parsed_tabs(tabs: Vec<TabInfo>) -> impl Iterator<Item = (TabInfo, ParsedTitle)> {
	tabs.into_iter().filter_map(|tab| {
		let parsed = title::parse_title(&tab.title)?;
		Some((tab, parsed))
	})
}

/// Window a new session should open in, or `None` for a new window.
pub fn choose_window(grouping: WindowGrouping, tabs: &[TabInfo], project_hash: Option<&str>) -> Option<String> {
	match grouping {
		WindowGrouping::Off => None,
		WindowGrouping::Smart => tabs.first().map(|t| t.window.clone()),
		WindowGrouping::Project => {
			let hash = project_hash?;
			tabs.iter()
				.find(|t| {
					title::parse_title(&t.title).is_some_and(|p| p.project_hash.as_deref() == Some(hash))
				})
				.map(|t| t.window.clone())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tab(window: &str, title: &str) -> TabInfo {
		TabInfo {
			window: window.into(),
			tab: "1".into(),
			tty: None,
			title: title.into(),
		}
	}

	#[test]
	fn off_always_opens_a_window() {
		let tabs = vec![tab("1", "build [tm:-]")];
		assert_eq!(choose_window(WindowGrouping::Off, &tabs, None), None);
	}

	#[test]
	fn smart_uses_the_first_window() {
		let tabs = vec![tab("7", "vim"), tab("9", "build [tm:-]")];
		assert_eq!(choose_window(WindowGrouping::Smart, &tabs, None).as_deref(), Some("7"));
		assert_eq!(choose_window(WindowGrouping::Smart, &[], None), None);
	}

	#[test]
	fn project_grouping_follows_the_hash() {
		let tabs = vec![
			tab("3", "tests @ web [tm:aaaaaaaaaaaa]"),
			tab("4", "tests @ api [tm:bbbbbbbbbbbb]"),
		];
		assert_eq!(
			choose_window(WindowGrouping::Project, &tabs, Some("bbbbbbbbbbbb")).as_deref(),
			Some("4")
		);
		assert_eq!(choose_window(WindowGrouping::Project, &tabs, Some("cccccccccccc")), None);
		assert_eq!(choose_window(WindowGrouping::Project, &tabs, None), None);
	}

	#[test]
	fn key_matching_scopes_by_project_only_when_given() {
		let global = SessionKey::new("build", None).unwrap();
		let parsed = ParsedTitle {
			tag: "build".into(),
			project_hash: Some("aaaaaaaaaaaa".into()),
		};
		assert!(global.matches(&parsed));

		let scoped = SessionKey {
			tag: "build".into(),
			project: Some(ProjectRef {
				path: PathBuf::from("/p"),
				hash: "bbbbbbbbbbbb".into(),
			}),
		};
		assert!(!scoped.matches(&parsed));
		assert_eq!(scoped.lock_name(), "build-bbbbbbbbbbbb");
		assert_eq!(global.lock_name(), "build-global");
	}

	#[test]
	fn existing_sessions_lock_under_their_title_hash() {
		let mut handle = SessionHandle {
			id: SessionId::new("1", "2"),
			tag: "build".into(),
			project_path: None,
			project_hash: Some("bbbbbbbbbbbb".into()),
			tty: None,
			title: "build @ p [tm:bbbbbbbbbbbb]".into(),
			is_busy: false,
		};
		assert_eq!(session_lock_name(&handle), "build-bbbbbbbbbbbb");
		handle.project_hash = None;
		assert_eq!(session_lock_name(&handle), "build-global");
	}
}
