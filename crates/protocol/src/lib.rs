//! Data types for the terminator session engine.
//!
//! These are the shapes that cross the boundary between the engine and its
//! callers: session handles, execute requests and their outcomes, and the
//! process snapshots produced by the inspector.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: no behavior beyond parsing, display and serialization
//! - **Stateless**: nothing here is persisted across invocations; the
//!   terminal application owns the durable state

pub mod outcome;
pub mod process;
pub mod request;
pub mod session;

pub use outcome::*;
pub use process::*;
pub use request::*;
pub use session::*;
