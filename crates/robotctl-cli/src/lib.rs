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
#![allow(clippy::redundant_pub_crate)]

//! Operator CLI for the Robot webservice.
//!
//! Layout:
//! - `cli.rs`: process entrypoint wiring real dependencies into the dispatcher
//! - `registry.rs`: declarative command and parameter metadata
//! - `dispatch.rs`: argument parsing, credential gating, and exit-code mapping
//! - `rescue.rs`: rescue-mode state machine
//! - `shell.rs` / `prompt.rs`: interactive collaborators (ssh, password entry)
//! - `commands/`: command handlers grouped by concern
//! - `client.rs`: error taxonomy, client factory, and handler context
//! - `output.rs`: line sink and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod dispatch;
pub(crate) mod output;
pub(crate) mod prompt;
pub(crate) mod registry;
pub(crate) mod rescue;
pub(crate) mod shell;
#[cfg(test)]
pub(crate) mod testing;

pub use cli::run;
