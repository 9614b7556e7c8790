//! Sample Robot resources.

use robotctl_api::{Server, ServerId, Vswitch, VswitchServer};

/// Ready, uncancelled server with the given main IP.
#[must_use]
pub fn sample_server(number: ServerId, ip: &str, name: &str) -> Server {
    Server {
        server_number: number,
        server_ip: Some(ip.to_string()),
        server_ipv6_net: None,
        server_name: name.to_string(),
        product: "EX44".to_string(),
        dc: "FSN1-DC14".to_string(),
        status: "ready".to_string(),
        cancelled: false,
        ip: vec![ip.to_string()],
    }
}

/// Vswitch with every given server attached and ready.
#[must_use]
pub fn sample_vswitch(id: u64, vlan: u16, servers: &[&Server]) -> Vswitch {
    Vswitch {
        id,
        name: format!("vlan-{vlan}"),
        vlan,
        cancelled: false,
        server: servers
            .iter()
            .map(|server| VswitchServer {
                server_ip: server.server_ip.clone(),
                server_number: server.server_number,
                status: "ready".to_string(),
            })
            .collect(),
    }
}
