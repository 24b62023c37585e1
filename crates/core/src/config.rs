//! Engine configuration.
//!
//! Layers, lowest priority first: built-in defaults, the JSON config file
//! (`$XDG_CONFIG_HOME/terminator/config.json`), `TERMINATOR_*` environment
//! variables, then per-invocation overrides. Every layer is a
//! [`ConfigLayer`] of optional values applied on top of the previous one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use terminator_protocol::WindowGrouping;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Terminal application driven by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalApp {
	#[default]
	Terminal,
	#[serde(rename = "iterm")]
	ITerm,
}

impl TerminalApp {
	/// Guesses the application from `TERM_PROGRAM`.
	pub fn from_term_program(value: Option<&str>) -> Self {
		match value {
			Some("iTerm.app") => Self::ITerm,
			_ => Self::Terminal,
		}
	}
}

impl FromStr for TerminalApp {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"terminal" | "terminal.app" | "apple_terminal" => Ok(Self::Terminal),
			"iterm" | "iterm2" | "iterm.app" => Ok(Self::ITerm),
			other => Err(format!("unknown terminal application: {other}")),
		}
	}
}

impl fmt::Display for TerminalApp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Terminal => write!(f, "terminal"),
			Self::ITerm => write!(f, "iterm"),
		}
	}
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Output lines returned when a request does not ask for a count.
	pub default_lines: usize,
	pub foreground_timeout: Duration,
	/// Length of the initial snapshot taken after a background submit.
	pub background_timeout: Duration,
	/// Single wait between SIGINT and the busy reconfirmation.
	pub sigint_wait: Duration,
	pub window_grouping: WindowGrouping,
	/// Proceed into a session that stays busy after an interrupt.
	pub reuse_busy: bool,
	pub pre_kill_script: Option<String>,
	pub hook_timeout: Duration,
	pub log_dir: PathBuf,
	pub app: TerminalApp,
	pub poll_interval: Duration,
	/// Time between SIGTERM and SIGKILL.
	pub kill_grace: Duration,
	pub lock_timeout: Duration,
	/// Bound on each `osascript` call.
	pub script_timeout: Duration,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			default_lines: 100,
			foreground_timeout: Duration::from_secs(60),
			background_timeout: Duration::from_secs(2),
			sigint_wait: Duration::from_secs(2),
			window_grouping: WindowGrouping::Smart,
			reuse_busy: false,
			pre_kill_script: None,
			hook_timeout: Duration::from_secs(10),
			log_dir: std::env::temp_dir().join("terminator-logs"),
			app: TerminalApp::Terminal,
			poll_interval: Duration::from_millis(150),
			kill_grace: Duration::from_secs(2),
			lock_timeout: Duration::from_secs(10),
			script_timeout: Duration::from_secs(15),
		}
	}
}

impl EngineConfig {
	/// Resolves every layer using the process environment.
	///
	/// `config_file` replaces the default file location; a missing file is
	/// only an error when it was given explicitly.
	pub fn load(config_file: Option<&Path>, overrides: &ConfigLayer) -> Result<Self> {
		let lookup = |key: &str| std::env::var(key).ok();
		let mut config = Self {
			app: TerminalApp::from_term_program(lookup("TERM_PROGRAM").as_deref()),
			..Self::default()
		};

		match config_file {
			Some(path) => config.apply(&ConfigLayer::from_file(path)?),
			None => {
				if let Some(path) = default_config_path().filter(|p| p.exists()) {
					config.apply(&ConfigLayer::from_file(&path)?);
				}
			}
		}

		config.apply(&ConfigLayer::from_env_with(lookup));
		config.apply(overrides);
		debug!(target = "terminator.config", app = %config.app, grouping = %config.window_grouping, "configuration resolved");
		Ok(config)
	}

	/// Overwrites every field `layer` sets.
	pub fn apply(&mut self, layer: &ConfigLayer) {
		if let Some(v) = layer.default_lines {
			self.default_lines = v;
		}
		if let Some(v) = layer.foreground_timeout_secs {
			self.foreground_timeout = Duration::from_secs(v);
		}
		if let Some(v) = layer.background_timeout_secs {
			self.background_timeout = Duration::from_secs(v);
		}
		if let Some(v) = layer.sigint_wait_secs {
			self.sigint_wait = Duration::from_secs(v);
		}
		if let Some(v) = layer.window_grouping {
			self.window_grouping = v;
		}
		if let Some(v) = layer.reuse_busy {
			self.reuse_busy = v;
		}
		if let Some(ref v) = layer.pre_kill_script {
			self.pre_kill_script = Some(v.clone()).filter(|s| !s.trim().is_empty());
		}
		if let Some(v) = layer.hook_timeout_secs {
			self.hook_timeout = Duration::from_secs(v);
		}
		if let Some(ref v) = layer.log_dir {
			self.log_dir = v.clone();
		}
		if let Some(v) = layer.app {
			self.app = v;
		}
		if let Some(v) = layer.poll_interval_ms {
			self.poll_interval = Duration::from_millis(v.max(1));
		}
		if let Some(v) = layer.kill_grace_secs {
			self.kill_grace = Duration::from_secs(v);
		}
		if let Some(v) = layer.lock_timeout_secs {
			self.lock_timeout = Duration::from_secs(v);
		}
		if let Some(v) = layer.script_timeout_secs {
			self.script_timeout = Duration::from_secs(v.max(1));
		}
	}

	/// Directory holding the advisory session locks.
	pub fn lock_dir(&self) -> PathBuf {
		self.log_dir.join("locks")
	}

	/// JSON view used by the `info` action.
	pub fn snapshot(&self) -> serde_json::Value {
		json!({
			"app": self.app,
			"windowGrouping": self.window_grouping,
			"defaultLines": self.default_lines,
			"foregroundTimeoutSecs": self.foreground_timeout.as_secs(),
			"backgroundTimeoutSecs": self.background_timeout.as_secs(),
			"sigintWaitSecs": self.sigint_wait.as_secs(),
			"reuseBusy": self.reuse_busy,
			"preKillScript": self.pre_kill_script,
			"hookTimeoutSecs": self.hook_timeout.as_secs(),
			"logDir": self.log_dir,
			"pollIntervalMs": self.poll_interval.as_millis() as u64,
			"killGraceSecs": self.kill_grace.as_secs(),
			"lockTimeoutSecs": self.lock_timeout.as_secs(),
			"scriptTimeoutSecs": self.script_timeout.as_secs(),
		})
	}
}

/// One layer of optional settings.
///
/// This is also the on-disk shape of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigLayer {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default_lines: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub foreground_timeout_secs: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub background_timeout_secs: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sigint_wait_secs: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub window_grouping: Option<WindowGrouping>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reuse_busy: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pre_kill_script: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hook_timeout_secs: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub log_dir: Option<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub app: Option<TerminalApp>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub poll_interval_ms: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub kill_grace_secs: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lock_timeout_secs: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub script_timeout_secs: Option<u64>,
}

/// Per-invocation overrides share the layer shape.
pub type ConfigOverrides = ConfigLayer;

impl ConfigLayer {
	pub fn from_file(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
		serde_json::from_str(&content).map_err(|e| Error::Config(format!("invalid {}: {e}", path.display())))
	}

	/// Reads `TERMINATOR_*` variables through `lookup`. Unparseable values are
	/// skipped with a warning.
	pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
		Self {
			default_lines: env_value(&lookup, "TERMINATOR_DEFAULT_LINES"),
			foreground_timeout_secs: env_value(&lookup, "TERMINATOR_FOREGROUND_TIMEOUT"),
			background_timeout_secs: env_value(&lookup, "TERMINATOR_BACKGROUND_TIMEOUT"),
			sigint_wait_secs: env_value(&lookup, "TERMINATOR_SIGINT_WAIT"),
			window_grouping: env_value(&lookup, "TERMINATOR_WINDOW_GROUPING"),
			reuse_busy: env_flag(&lookup, "TERMINATOR_REUSE_BUSY"),
			pre_kill_script: lookup("TERMINATOR_PRE_KILL_SCRIPT"),
			hook_timeout_secs: env_value(&lookup, "TERMINATOR_HOOK_TIMEOUT"),
			log_dir: lookup("TERMINATOR_LOG_DIR").filter(|v| !v.is_empty()).map(PathBuf::from),
			app: env_value(&lookup, "TERMINATOR_APP"),
			poll_interval_ms: env_value(&lookup, "TERMINATOR_POLL_INTERVAL_MS"),
			kill_grace_secs: env_value(&lookup, "TERMINATOR_KILL_GRACE"),
			lock_timeout_secs: env_value(&lookup, "TERMINATOR_LOCK_TIMEOUT"),
			script_timeout_secs: env_value(&lookup, "TERMINATOR_SCRIPT_TIMEOUT"),
		}
	}
}

/// `$XDG_CONFIG_HOME/terminator/config.json`, falling back to `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.filter(|p| p.is_absolute())
		.or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
	Some(config_home.join("terminator").join("config.json"))
}

fn env_value<T, F>(lookup: &F, key: &str) -> Option<T>
where
	T: FromStr,
	T::Err: fmt::Display,
	F: Fn(&str) -> Option<String>,
{
	let raw = lookup(key)?;
	let raw = raw.trim();
	if raw.is_empty() {
		return None;
	}
	match raw.parse() {
		Ok(value) => Some(value),
		Err(err) => {
			warn!(target = "terminator.config", key, value = raw, error = %err, "ignoring invalid environment value");
			None
		}
	}
}

fn env_flag<F>(lookup: &F, key: &str) -> Option<bool>
where
	F: Fn(&str) -> Option<String>,
{
	let raw = lookup(key)?;
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		"" => None,
		other => {
			warn!(target = "terminator.config", key, value = other, "ignoring invalid boolean");
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		move |key: &str| map.get(key).cloned()
	}

	#[test]
	fn env_layer_parses_known_values() {
		let layer = ConfigLayer::from_env_with(env(&[
			("TERMINATOR_DEFAULT_LINES", "40"),
			("TERMINATOR_WINDOW_GROUPING", "by-project"),
			("TERMINATOR_REUSE_BUSY", "yes"),
			("TERMINATOR_APP", "iTerm2"),
			("TERMINATOR_POLL_INTERVAL_MS", "75"),
		]));
		assert_eq!(layer.default_lines, Some(40));
		assert_eq!(layer.window_grouping, Some(WindowGrouping::Project));
		assert_eq!(layer.reuse_busy, Some(true));
		assert_eq!(layer.app, Some(TerminalApp::ITerm));
		assert_eq!(layer.poll_interval_ms, Some(75));
	}

	#[test]
	fn invalid_env_values_are_ignored() {
		let layer = ConfigLayer::from_env_with(env(&[
			("TERMINATOR_FOREGROUND_TIMEOUT", "soon"),
			("TERMINATOR_REUSE_BUSY", "maybe"),
			("TERMINATOR_WINDOW_GROUPING", "tiles"),
		]));
		assert_eq!(layer, ConfigLayer::default());
	}

	#[test]
	fn later_layers_win() {
		let mut config = EngineConfig::default();
		config.apply(&ConfigLayer {
			default_lines: Some(10),
			sigint_wait_secs: Some(5),
			..Default::default()
		});
		config.apply(&ConfigLayer {
			default_lines: Some(20),
			..Default::default()
		});
		assert_eq!(config.default_lines, 20);
		assert_eq!(config.sigint_wait, Duration::from_secs(5));
		assert_eq!(config.foreground_timeout, Duration::from_secs(60));
	}

	#[test]
	fn blank_pre_kill_script_clears_the_hook() {
		let mut config = EngineConfig {
			pre_kill_script: Some("notify".into()),
			..EngineConfig::default()
		};
		config.apply(&ConfigLayer {
			pre_kill_script: Some("  ".into()),
			..Default::default()
		});
		assert_eq!(config.pre_kill_script, None);
	}

	#[test]
	fn file_layer_reads_camel_case_json() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		std::fs::write(&path, r#"{"windowGrouping":"off","killGraceSecs":7,"app":"iterm"}"#).unwrap();

		let layer = ConfigLayer::from_file(&path).unwrap();
		assert_eq!(layer.window_grouping, Some(WindowGrouping::Off));
		assert_eq!(layer.kill_grace_secs, Some(7));
		assert_eq!(layer.app, Some(TerminalApp::ITerm));

		std::fs::write(&path, "{not json").unwrap();
		assert!(matches!(ConfigLayer::from_file(&path), Err(Error::Config(_))));
	}

	#[test]
	fn term_program_picks_the_app() {
		assert_eq!(TerminalApp::from_term_program(Some("iTerm.app")), TerminalApp::ITerm);
		assert_eq!(TerminalApp::from_term_program(Some("Apple_Terminal")), TerminalApp::Terminal);
		assert_eq!(TerminalApp::from_term_program(None), TerminalApp::Terminal);
	}
}
