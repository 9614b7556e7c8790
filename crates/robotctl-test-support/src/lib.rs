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

//! Shared test helpers used across the workspace.
//! Layout: fixtures.rs (sample resources), mocks.rs (recording fake Robot client).

pub mod fixtures;
pub mod mocks;

pub use fixtures::{sample_server, sample_vswitch};
pub use mocks::{FakeRobot, RobotCall};
