#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use terminator::{ConfigOverrides, FocusMode, TerminalApp, WindowGrouping};

use crate::output::OutputFormat;
use crate::styles::cli_styles;

/// Root CLI for terminator.
#[derive(Parser, Debug)]
#[command(name = "terminator")]
#[command(about = "Run commands in tagged terminal sessions and collect their output")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: toon (default), json, ndjson, or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "toon")]
	pub format: OutputFormat,

	#[command(flatten)]
	pub global: GlobalArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// Engine settings that apply to every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
	/// Config file (default: $XDG_CONFIG_HOME/terminator/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Terminal application to drive (terminal, iterm)
	#[arg(long, global = true, value_name = "APP")]
	pub app: Option<TerminalApp>,

	/// Where new sessions open (project, smart, off)
	#[arg(long, global = true, value_name = "POLICY")]
	pub grouping: Option<WindowGrouping>,

	/// Directory for command logs
	#[arg(long, global = true, value_name = "DIR")]
	pub log_dir: Option<PathBuf>,
}

impl GlobalArgs {
	/// Flag layer applied on top of file and environment settings.
	pub fn overrides(&self) -> ConfigOverrides {
		ConfigOverrides {
			app: self.app,
			window_grouping: self.grouping,
			log_dir: self.log_dir.clone(),
			..ConfigOverrides::default()
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a command in a session, creating the session if needed.
	Execute(ExecuteArgs),
	/// Print a session's scrollback.
	Read(ReadArgs),
	/// List sessions.
	List(ListArgs),
	/// Bring a session's tab to the front.
	Focus(TargetArgs),
	/// Interrupt the session's foreground process.
	Kill(KillArgs),
	/// Show the effective configuration.
	Info,
}

/// Session selector shared by most subcommands.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
	/// Session tag
	#[arg(short, long)]
	pub tag: String,

	/// Project directory the session belongs to
	#[arg(short, long, value_name = "DIR")]
	pub project: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExecuteArgs {
	#[command(flatten)]
	pub target: TargetArgs,

	/// Command to run; omit to only prepare the session
	#[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
	pub command: Vec<String>,

	/// Start the command detached and return its first output
	#[arg(short, long)]
	pub background: bool,

	/// Seconds to wait for a foreground command
	#[arg(long, value_name = "SECS")]
	pub timeout: Option<u64>,

	/// Maximum number of output lines (0 = all)
	#[arg(short = 'n', long, value_name = "N")]
	pub lines: Option<usize>,

	/// Whether to bring the terminal forward (force, never, default)
	#[arg(long, value_name = "MODE", default_value = "default")]
	pub focus: FocusMode,
}

impl ExecuteArgs {
	/// Command words joined back into one shell line.
	pub fn command_line(&self) -> Option<String> {
		let line = self.command.join(" ");
		(!line.trim().is_empty()).then_some(line)
	}
}

#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
	#[command(flatten)]
	pub target: TargetArgs,

	/// Maximum number of lines (0 = all)
	#[arg(short = 'n', long, value_name = "N")]
	pub lines: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
	/// Only sessions with this tag
	#[arg(short, long)]
	pub tag: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct KillArgs {
	#[command(flatten)]
	pub target: TargetArgs,

	/// Whether the keystroke fallback may bring the terminal forward
	#[arg(long, value_name = "MODE", default_value = "default")]
	pub focus: FocusMode,
}
