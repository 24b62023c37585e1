//! terminator: tagged terminal sessions for automated clients.
//!
//! A caller names a session by tag (optionally scoped to a project
//! directory). The engine finds or creates a matching tab in the user's
//! terminal application, frees it from a busy foreground process when
//! needed, submits commands, and captures their output through a log file
//! and a completion marker.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher ──► SessionRegistry ──► TerminalBackend (Terminal.app, iTerm2)
//!     │                 │
//!     │                 └──────────► ProcessInspector (busy flags)
//!     ├── BusyMachine ─────────────► ProcessInspector (SIGINT, reconfirm)
//!     └── capture ─────────────────► log file + completion marker
//! ```
//!
//! The terminal application is the only durable state: session identity
//! lives in tab titles and every call rebuilds its view from the live tab
//! list.

pub mod backend;
pub mod busy;
pub mod capture;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lock;
pub mod logs;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod title;

pub use backend::{BackendError, CreatedTab, TabInfo, TerminalBackend, create_backend};
pub use config::{ConfigLayer, ConfigOverrides, EngineConfig, TerminalApp};
pub use dispatcher::{Dispatcher, EngineInfo};
pub use error::{Error, ErrorKind, Result};
pub use registry::{SessionKey, SessionRegistry};
pub use terminator_protocol::*;
pub use terminator_runtime::{GroupSignal, ProcessInspector, SystemInspector, Termination};
