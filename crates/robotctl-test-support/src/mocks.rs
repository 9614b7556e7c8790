//! In-memory [`RobotClient`] that records every call.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use robotctl_api::{
    AdminAccount, FailoverIp, RebootMethod, RescueCredentials, ReverseDns, RobotClient,
    RobotError, RobotResult, Server, ServerId, Vswitch,
};

/// One recorded call against [`FakeRobot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotCall {
    /// `find_server`
    FindServer(IpAddr),
    /// `list_servers`
    ListServers,
    /// `reboot_server`
    Reboot(ServerId, RebootMethod),
    /// `set_server_name`
    SetServerName(ServerId, String),
    /// `get_reverse_dns`
    GetReverseDns(IpAddr),
    /// `set_reverse_dns`
    SetReverseDns(IpAddr, String),
    /// `delete_reverse_dns`
    DeleteReverseDns(IpAddr),
    /// `list_failover_ips`
    ListFailoverIps,
    /// `set_failover_destination`
    SetFailoverDestination(IpAddr, IpAddr),
    /// `list_vswitches`
    ListVswitches,
    /// `create_admin_account`
    CreateAdminAccount(ServerId, Option<String>),
    /// `delete_admin_account`
    DeleteAdminAccount(ServerId),
    /// `get_admin_account`
    GetAdminAccount(ServerId),
    /// `activate_rescue`
    ActivateRescue(ServerId, Vec<String>),
    /// `poll_rescue_ready`
    PollRescueReady(ServerId),
}

#[derive(Default)]
struct FakeState {
    servers: Vec<Server>,
    reverse_dns: BTreeMap<IpAddr, String>,
    failover: Vec<FailoverIp>,
    vswitches: Vec<Vswitch>,
    admins: BTreeMap<ServerId, String>,
    rescue_ready_after: Option<usize>,
    reject_keys: bool,
    unavailable: bool,
    polls: usize,
    activations: usize,
    rescue_armed: bool,
    booted_rescue: bool,
}

/// Scriptable stand-in for the Robot webservice.
///
/// Rescue boots follow the webservice: `activate_rescue` arms a one-shot boot
/// entry and the next reset consumes it. A reset without an armed entry boots
/// the installed system, which never reports rescue readiness. Readiness
/// defaults to "never"; use [`FakeRobot::with_rescue_ready_after`] to make the
/// Nth poll succeed once the server runs the rescue system.
#[derive(Default)]
pub struct FakeRobot {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<RobotCall>>,
}

impl FakeRobot {
    /// Empty account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server to the account.
    #[must_use]
    pub fn with_server(self, server: Server) -> Self {
        self.state().servers.push(server);
        self
    }

    /// Seed a PTR record.
    #[must_use]
    pub fn with_reverse_dns(self, ip: IpAddr, ptr: &str) -> Self {
        self.state().reverse_dns.insert(ip, ptr.to_string());
        self
    }

    /// Seed a failover address.
    #[must_use]
    pub fn with_failover(self, failover: FailoverIp) -> Self {
        self.state().failover.push(failover);
        self
    }

    /// Seed a vswitch.
    #[must_use]
    pub fn with_vswitch(self, vswitch: Vswitch) -> Self {
        self.state().vswitches.push(vswitch);
        self
    }

    /// Seed an existing admin account login.
    #[must_use]
    pub fn with_admin(self, id: ServerId, login: &str) -> Self {
        self.state().admins.insert(id, login.to_string());
        self
    }

    /// Report readiness from the `polls`-th poll onwards (1-based), as long as
    /// the last reset booted into the rescue system.
    #[must_use]
    pub fn with_rescue_ready_after(self, polls: usize) -> Self {
        self.state().rescue_ready_after = Some(polls);
        self
    }

    /// Reject any rescue activation that carries authorized keys.
    #[must_use]
    pub fn with_rejected_keys(self) -> Self {
        self.state().reject_keys = true;
        self
    }

    /// Fail every poll with a transport-class error.
    #[must_use]
    pub fn with_unavailable_polls(self) -> Self {
        self.state().unavailable = true;
        self
    }

    /// Every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RobotCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded reboot requests, in order.
    #[must_use]
    pub fn reboots(&self) -> Vec<(ServerId, RebootMethod)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RobotCall::Reboot(id, method) => Some((id, method)),
                _ => None,
            })
            .collect()
    }

    /// Number of readiness polls served.
    #[must_use]
    pub fn polls(&self) -> usize {
        self.state().polls
    }

    /// `true` when the last reset booted the rescue system.
    #[must_use]
    pub fn booted_rescue(&self) -> bool {
        self.state().booted_rescue
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: RobotCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn server(&self, id: ServerId) -> RobotResult<Server> {
        self.state()
            .servers
            .iter()
            .find(|server| server.server_number == id)
            .cloned()
            .ok_or_else(|| {
                RobotError::not_found("SERVER_NOT_FOUND", format!("server {id} not found"))
            })
    }
}

#[async_trait]
impl RobotClient for FakeRobot {
    async fn find_server(&self, address: IpAddr) -> RobotResult<Server> {
        self.record(RobotCall::FindServer(address));
        let wanted = address.to_string();
        self.state()
            .servers
            .iter()
            .find(|server| {
                server.server_ip.as_deref() == Some(wanted.as_str()) || server.ip.contains(&wanted)
            })
            .cloned()
            .ok_or_else(|| {
                RobotError::not_found("IP_NOT_FOUND", format!("IP {address} not found"))
            })
    }

    async fn list_servers(&self) -> RobotResult<Vec<Server>> {
        self.record(RobotCall::ListServers);
        Ok(self.state().servers.clone())
    }

    async fn reboot_server(&self, id: ServerId, method: RebootMethod) -> RobotResult<()> {
        self.record(RobotCall::Reboot(id, method));
        self.server(id)?;
        let mut state = self.state();
        let armed = std::mem::take(&mut state.rescue_armed);
        state.booted_rescue = armed;
        Ok(())
    }

    async fn set_server_name(&self, id: ServerId, name: &str) -> RobotResult<Server> {
        self.record(RobotCall::SetServerName(id, name.to_string()));
        let mut state = self.state();
        let server = state
            .servers
            .iter_mut()
            .find(|server| server.server_number == id)
            .ok_or_else(|| {
                RobotError::not_found("SERVER_NOT_FOUND", format!("server {id} not found"))
            })?;
        server.server_name = name.to_string();
        Ok(server.clone())
    }

    async fn get_reverse_dns(&self, ip: IpAddr) -> RobotResult<ReverseDns> {
        self.record(RobotCall::GetReverseDns(ip));
        self.state()
            .reverse_dns
            .get(&ip)
            .map(|ptr| ReverseDns {
                ip: ip.to_string(),
                ptr: ptr.clone(),
            })
            .ok_or_else(|| {
                RobotError::not_found("RDNS_NOT_FOUND", format!("no PTR record for {ip}"))
            })
    }

    async fn set_reverse_dns(&self, ip: IpAddr, ptr: &str) -> RobotResult<ReverseDns> {
        self.record(RobotCall::SetReverseDns(ip, ptr.to_string()));
        self.state().reverse_dns.insert(ip, ptr.to_string());
        Ok(ReverseDns {
            ip: ip.to_string(),
            ptr: ptr.to_string(),
        })
    }

    async fn delete_reverse_dns(&self, ip: IpAddr) -> RobotResult<()> {
        self.record(RobotCall::DeleteReverseDns(ip));
        self.state()
            .reverse_dns
            .remove(&ip)
            .map(|_| ())
            .ok_or_else(|| {
                RobotError::not_found("RDNS_NOT_FOUND", format!("no PTR record for {ip}"))
            })
    }

    async fn list_failover_ips(&self) -> RobotResult<Vec<FailoverIp>> {
        self.record(RobotCall::ListFailoverIps);
        Ok(self.state().failover.clone())
    }

    async fn set_failover_destination(
        &self,
        ip: IpAddr,
        destination: IpAddr,
    ) -> RobotResult<FailoverIp> {
        self.record(RobotCall::SetFailoverDestination(ip, destination));
        let wanted = ip.to_string();
        let mut state = self.state();
        let entry = state
            .failover
            .iter_mut()
            .find(|entry| entry.ip == wanted)
            .ok_or_else(|| {
                RobotError::not_found("FAILOVER_NOT_FOUND", format!("failover IP {ip} not found"))
            })?;
        entry.active_server_ip = Some(destination.to_string());
        Ok(entry.clone())
    }

    async fn list_vswitches(&self) -> RobotResult<Vec<Vswitch>> {
        self.record(RobotCall::ListVswitches);
        Ok(self.state().vswitches.clone())
    }

    async fn create_admin_account(
        &self,
        id: ServerId,
        password: Option<&str>,
    ) -> RobotResult<AdminAccount> {
        self.record(RobotCall::CreateAdminAccount(id, password.map(str::to_string)));
        let server = self.server(id)?;
        let login = format!("#ws+{id}");
        self.state().admins.insert(id, login.clone());
        Ok(AdminAccount {
            server_ip: server.server_ip,
            server_number: id,
            login: Some(login),
            active: true,
            password: Some(password.unwrap_or("generated-password").to_string()),
        })
    }

    async fn delete_admin_account(&self, id: ServerId) -> RobotResult<()> {
        self.record(RobotCall::DeleteAdminAccount(id));
        self.state()
            .admins
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| {
                RobotError::not_found("ADMIN_NOT_FOUND", format!("no admin account for {id}"))
            })
    }

    async fn get_admin_account(&self, id: ServerId) -> RobotResult<AdminAccount> {
        self.record(RobotCall::GetAdminAccount(id));
        let server = self.server(id)?;
        let login = self.state().admins.get(&id).cloned();
        Ok(AdminAccount {
            server_ip: server.server_ip,
            server_number: id,
            active: login.is_some(),
            login,
            password: None,
        })
    }

    async fn activate_rescue(
        &self,
        id: ServerId,
        authorized_keys: &[String],
    ) -> RobotResult<RescueCredentials> {
        self.record(RobotCall::ActivateRescue(id, authorized_keys.to_vec()));
        if self.state().reject_keys && !authorized_keys.is_empty() {
            return Err(RobotError::InvalidInput {
                code: "INVALID_INPUT".to_string(),
                message: "invalid input".to_string(),
                invalid: vec!["authorized_key".to_string()],
            });
        }
        let server = self.server(id)?;
        let mut state = self.state();
        state.activations += 1;
        state.rescue_armed = true;
        let password = match state.activations {
            1 => format!("rescue-{id}"),
            n => format!("rescue-{id}-{n}"),
        };
        Ok(RescueCredentials {
            server_ip: server.server_ip,
            server_number: id,
            os: Some("linux".to_string()),
            active: true,
            password: Some(password),
        })
    }

    async fn poll_rescue_ready(&self, id: ServerId) -> RobotResult<bool> {
        self.record(RobotCall::PollRescueReady(id));
        let mut state = self.state();
        state.polls += 1;
        if state.unavailable {
            return Err(RobotError::Unavailable {
                status: 503,
                message: "maintenance".to_string(),
            });
        }
        let polls = state.polls;
        Ok(state.booted_rescue
            && state
                .rescue_ready_after
                .is_some_and(|threshold| polls >= threshold))
    }
}
