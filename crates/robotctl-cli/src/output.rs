//! Line-oriented output sink and formatting helpers for CLI commands.

use std::fmt::Display;
use std::io::Write;

use anyhow::anyhow;
use robotctl_api::{AdminAccount, FailoverIp, RescueCredentials, Server, Vswitch};

use crate::client::{CliError, CliResult};

/// Writes one line per call to the invocation's standard output.
pub(crate) struct LineSink<'a> {
    inner: &'a mut dyn Write,
}

impl<'a> LineSink<'a> {
    pub(crate) fn new(inner: &'a mut dyn Write) -> Self {
        Self { inner }
    }

    pub(crate) fn line(&mut self, text: impl Display) -> CliResult<()> {
        writeln!(self.inner, "{text}")
            .and_then(|()| self.inner.flush())
            .map_err(|err| CliError::domain(anyhow!("failed to write output: {err}")))
    }
}

const UNNAMED: &str = "<unnamed>";
const UNKNOWN: &str = "-";

#[must_use]
pub(crate) fn server_line(server: &Server) -> String {
    let name = if server.server_name.is_empty() {
        UNNAMED
    } else {
        server.server_name.as_str()
    };
    format!(
        "{:<15} {:>7} {:<24} {:<10} {}",
        server.address(),
        server.server_number,
        name,
        server.product,
        server.dc
    )
}

#[must_use]
pub(crate) fn server_detail(server: &Server) -> Vec<String> {
    let mut lines = vec![
        format!("server: {} ({})", server.address(), server.server_number),
        format!("name: {}", display_or(&server.server_name, UNNAMED)),
        format!("product: {}", server.product),
        format!("datacenter: {}", server.dc),
        format!("status: {}", server.status),
        format!("cancelled: {}", server.cancelled),
    ];
    if let Some(net) = &server.server_ipv6_net {
        lines.push(format!("ipv6: {net}"));
    }
    if server.ip.len() > 1 {
        lines.push(format!("addresses: {}", server.ip.join(", ")));
    }
    lines
}

#[must_use]
pub(crate) fn failover_line(failover: &FailoverIp) -> String {
    format!(
        "{:<15} -> {:<15} (owner {} / {})",
        failover.ip,
        failover.active_server_ip.as_deref().unwrap_or(UNKNOWN),
        failover.server_ip.as_deref().unwrap_or(UNKNOWN),
        failover.server_number
    )
}

#[must_use]
pub(crate) fn vswitch_lines(vswitch: &Vswitch) -> Vec<String> {
    let mut lines = vec![format!(
        "vlan {:>4}  id {:<8} {}{}",
        vswitch.vlan,
        vswitch.id,
        vswitch.name,
        if vswitch.cancelled { " (cancelled)" } else { "" }
    )];
    for member in &vswitch.server {
        lines.push(format!(
            "  {:<15} {:>7} {}",
            member.server_ip.as_deref().unwrap_or(UNKNOWN),
            member.server_number,
            member.status
        ));
    }
    lines
}

#[must_use]
pub(crate) fn admin_lines(account: &AdminAccount) -> Vec<String> {
    let mut lines = vec![
        format!(
            "server: {} ({})",
            account.server_ip.as_deref().unwrap_or(UNKNOWN),
            account.server_number
        ),
        format!("active: {}", account.active),
    ];
    if let Some(login) = &account.login {
        lines.push(format!("login: {login}"));
    }
    if let Some(password) = &account.password {
        lines.push(format!("password: {password}"));
    }
    lines
}

#[must_use]
pub(crate) fn rescue_lines(address: &str, credentials: &RescueCredentials) -> Vec<String> {
    vec![
        format!("host: {address}"),
        format!("login: {}", RescueCredentials::LOGIN),
        format!(
            "password: {}",
            credentials.password.as_deref().unwrap_or("<key authentication only>")
        ),
    ]
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robotctl_test_support::{sample_server, sample_vswitch};

    #[test]
    fn line_sink_appends_newlines() -> CliResult<()> {
        let mut buffer = Vec::new();
        {
            let mut sink = LineSink::new(&mut buffer);
            sink.line("first")?;
            sink.line(format_args!("{}-{}", "second", 2))?;
        }
        assert_eq!(String::from_utf8_lossy(&buffer), "first\nsecond-2\n");
        Ok(())
    }

    #[test]
    fn server_line_falls_back_for_unnamed_servers() {
        let line = server_line(&sample_server(7, "1.2.3.4", ""));
        assert!(line.starts_with("1.2.3.4"));
        assert!(line.contains(UNNAMED));
        assert!(line.contains("EX44"));
    }

    #[test]
    fn vswitch_lines_list_members_below_header() {
        let web = sample_server(7, "1.2.3.4", "web");
        let lines = vswitch_lines(&sample_vswitch(11, 4001, &[&web]));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("4001"));
        assert!(lines[1].trim_start().starts_with("1.2.3.4"));
    }
}
