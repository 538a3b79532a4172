#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `platform` isolates every platform-specific call the forced-deletion
//! engine makes: attribute manipulation, ownership takeover, discovery and
//! termination of processes holding a path open, registration with the OS's
//! deletion-at-restart facility, and the elevated-shell removal fallback.
//! All unsafe code in the workspace lives here.
//!
//! # Design
//!
//! - Every operation is per-path and carries no shared state, so callers
//!   need no additional locking.
//! - Operations are fallible external calls returning [`PlatformError`];
//!   the engine decides which failures are fatal and which are advisory.
//! - Best-effort queries ([`find_locking_processes`],
//!   [`has_protective_attributes`]) degrade to "nothing found" on platforms
//!   that cannot answer them, never to an error.
//!
//! # Errors
//!
//! [`PlatformError`] wraps the underlying [`std::io::Error`] where one
//! exists and exposes the raw OS code via [`PlatformError::os_code`] so the
//! engine can classify failures into its own taxonomy.

mod attrs;
mod elevated;
mod error;
mod ownership;
mod process;
mod reboot;
#[cfg(windows)]
mod win;

pub use attrs::{clear_protective_attributes, has_protective_attributes};
pub use elevated::elevated_remove;
pub use error::PlatformError;
pub use ownership::take_ownership;
pub use process::{find_locking_processes, terminate};
pub use reboot::defer_until_reboot;
