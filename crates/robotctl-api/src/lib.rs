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

//! Capability surface and HTTP client for the Robot webservice.
//!
//! Layout: `client.rs` (the `RobotClient` trait), `model.rs` (resource types),
//! `error.rs` (transport/domain error taxonomy), `http.rs` (`HttpRobotClient`).

pub mod client;
pub mod error;
pub mod http;
pub mod model;

pub use client::RobotClient;
pub use error::{RobotError, RobotResult};
pub use http::{DEFAULT_BASE_URL, HttpRobotClient, HttpRobotClientOptions};
pub use model::{
    AdminAccount, FailoverIp, RebootMethod, RescueCredentials, ReverseDns, Server, ServerId,
    Vswitch, VswitchServer,
};
