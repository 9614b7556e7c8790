//! Resource types exchanged with the Robot webservice.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Robot-assigned server number.
pub type ServerId = u32;

/// Dedicated server as reported by `GET /server`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Robot server number.
    pub server_number: ServerId,
    /// Main IPv4 address, absent for IPv6-only servers.
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Main IPv6 network.
    #[serde(default)]
    pub server_ipv6_net: Option<String>,
    /// Operator-assigned name.
    #[serde(default)]
    pub server_name: String,
    /// Product designation.
    #[serde(default)]
    pub product: String,
    /// Datacenter identifier.
    #[serde(default)]
    pub dc: String,
    /// Lifecycle status (`ready`, `in process`).
    #[serde(default)]
    pub status: String,
    /// Whether the server has been cancelled.
    #[serde(default)]
    pub cancelled: bool,
    /// Additional single IP addresses routed to the server.
    #[serde(default)]
    pub ip: Vec<String>,
}

impl Server {
    /// Main address for display and SSH, falling back to the IPv6 network.
    #[must_use]
    pub fn address(&self) -> &str {
        self.server_ip
            .as_deref()
            .or(self.server_ipv6_net.as_deref())
            .unwrap_or("-")
    }
}

/// Reset flavour understood by `POST /reset/{server}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebootMethod {
    /// ACPI power button signal.
    Soft,
    /// Hardware reset.
    #[default]
    Hard,
    /// Manual power cycle by a datacenter technician.
    Manual,
}

impl RebootMethod {
    /// Names accepted on the command line.
    pub const NAMES: [&'static str; 3] = ["soft", "hard", "manual"];

    /// Value of the `type` form field.
    #[must_use]
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::Soft => "sw",
            Self::Hard => "hw",
            Self::Manual => "man",
        }
    }

    /// Operator-facing name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
            Self::Manual => "manual",
        }
    }
}

impl Display for RebootMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RebootMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "soft" => Ok(Self::Soft),
            "hard" => Ok(Self::Hard),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown reboot method '{other}'")),
        }
    }
}

/// Reverse DNS entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseDns {
    /// Address the record belongs to.
    pub ip: String,
    /// PTR target.
    pub ptr: String,
}

/// Failover address and its current routing target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverIp {
    /// Failover address.
    pub ip: String,
    /// Netmask of the failover block.
    #[serde(default)]
    pub netmask: String,
    /// Main IP of the server owning the failover address.
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Number of the owning server.
    pub server_number: ServerId,
    /// Main IP of the server currently receiving the traffic.
    #[serde(default)]
    pub active_server_ip: Option<String>,
}

/// Server attached to a vswitch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VswitchServer {
    /// Main IP of the attached server.
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Number of the attached server.
    pub server_number: ServerId,
    /// Attachment status (`ready`, `in process`, `failed`).
    #[serde(default)]
    pub status: String,
}

/// Provider-side virtual switch (VLAN).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vswitch {
    /// Vswitch identifier.
    pub id: u64,
    /// Operator-assigned name.
    #[serde(default)]
    pub name: String,
    /// VLAN tag.
    pub vlan: u16,
    /// Whether the vswitch has been cancelled.
    #[serde(default)]
    pub cancelled: bool,
    /// Attached servers; only present on detail responses.
    #[serde(default)]
    pub server: Vec<VswitchServer>,
}

/// Separate administrative login for a server's Robot panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    /// Main IP of the server.
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Server number.
    pub server_number: ServerId,
    /// Login name of the admin account.
    #[serde(default)]
    pub login: Option<String>,
    /// Whether an admin account exists.
    #[serde(default)]
    pub active: bool,
    /// Password; only returned on creation.
    #[serde(default)]
    pub password: Option<String>,
}

/// Rescue boot configuration returned on activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescueCredentials {
    /// Main IP of the server.
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Server number.
    pub server_number: ServerId,
    /// Rescue operating system.
    #[serde(default)]
    pub os: Option<String>,
    /// Whether the rescue boot is still pending.
    #[serde(default)]
    pub active: bool,
    /// One-time root password for the rescue system.
    #[serde(default)]
    pub password: Option<String>,
}

impl RescueCredentials {
    /// Login name inside the rescue system.
    pub const LOGIN: &'static str = "root";
}
