//! Capability trait implemented by Robot API clients.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::error::RobotResult;
use crate::model::{
    AdminAccount, FailoverIp, RebootMethod, RescueCredentials, ReverseDns, Server, ServerId,
    Vswitch,
};

/// Operations the command layer may perform against the hosting provider.
///
/// Every call is issued once; implementations must not retry on their own.
#[async_trait]
pub trait RobotClient: Send + Sync {
    /// Resolve the server owning `address`.
    async fn find_server(&self, address: IpAddr) -> RobotResult<Server>;
    /// Enumerate all servers of the account.
    async fn list_servers(&self) -> RobotResult<Vec<Server>>;
    /// Trigger a reset of the given flavour.
    async fn reboot_server(&self, id: ServerId, method: RebootMethod) -> RobotResult<()>;
    /// Rename a server.
    async fn set_server_name(&self, id: ServerId, name: &str) -> RobotResult<Server>;
    /// Read the PTR record for `ip`.
    async fn get_reverse_dns(&self, ip: IpAddr) -> RobotResult<ReverseDns>;
    /// Create or replace the PTR record for `ip`.
    async fn set_reverse_dns(&self, ip: IpAddr, ptr: &str) -> RobotResult<ReverseDns>;
    /// Remove the PTR record for `ip`.
    async fn delete_reverse_dns(&self, ip: IpAddr) -> RobotResult<()>;
    /// Enumerate failover addresses.
    async fn list_failover_ips(&self) -> RobotResult<Vec<FailoverIp>>;
    /// Route a failover address to another server.
    async fn set_failover_destination(
        &self,
        ip: IpAddr,
        destination: IpAddr,
    ) -> RobotResult<FailoverIp>;
    /// Enumerate vswitches including their attached servers.
    async fn list_vswitches(&self) -> RobotResult<Vec<Vswitch>>;
    /// Create the admin account, optionally with a chosen password.
    async fn create_admin_account(
        &self,
        id: ServerId,
        password: Option<&str>,
    ) -> RobotResult<AdminAccount>;
    /// Remove the admin account.
    async fn delete_admin_account(&self, id: ServerId) -> RobotResult<()>;
    /// Read the admin account state.
    async fn get_admin_account(&self, id: ServerId) -> RobotResult<AdminAccount>;
    /// Arm the rescue system for the next boot.
    async fn activate_rescue(
        &self,
        id: ServerId,
        authorized_keys: &[String],
    ) -> RobotResult<RescueCredentials>;
    /// Report whether the server has come up in the rescue system.
    async fn poll_rescue_ready(&self, id: ServerId) -> RobotResult<bool>;
}
