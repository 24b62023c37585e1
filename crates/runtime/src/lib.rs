//! OS plumbing for terminator.
//!
//! - **Process inspection**: finding the foreground process of a TTY and
//!   signaling its process group ([`process`])
//! - **AppleScript**: running `osascript` with a bounded wait ([`osascript`])
//! - **Hooks**: running the user's pre-kill script ([`hooks`])
//!
//! Nothing in this crate knows about tags, titles, or terminal backends; the
//! core crate layers session semantics on top.

pub mod error;
pub mod hooks;
pub mod osascript;
pub mod process;

pub use error::{Error, Result};
pub use hooks::{HookContext, run_pre_kill_hook};
pub use osascript::ScriptRunner;
pub use process::{GroupSignal, ProcessInspector, SystemInspector, Termination};
