#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Logging primitives for the robotctl binaries.
//!
//! Layout: `init.rs` (subscriber installation), `context.rs` (per-invocation span).
//! Logs always go to stderr so stdout stays reserved for command output.

pub mod context;
pub mod init;

pub use context::invocation_span;
pub use init::{DEBUG_LOG_LEVEL, DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
