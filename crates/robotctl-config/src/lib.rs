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

//! File-backed `section.key = value` store for operator settings and credentials.
//!
//! Layout: `model.rs` (dotted keys and credentials), `store.rs` (`ConfigStore`
//! parsing, mutation, and atomic persistence), `error.rs` (`ConfigError`).
//!
//! The store is loaded fresh on every invocation. No file locking is performed;
//! two processes writing the same file concurrently may lose one update.

pub mod error;
pub mod model;
pub mod store;

pub use error::{ConfigError, ConfigResult};
pub use model::{ConfigKey, Credentials, LOGIN_SECTION, PASSWORD_KEY, USERNAME_KEY};
pub use store::ConfigStore;
