use std::net::IpAddr;

use robotctl_api::{RebootMethod, RobotClient, Server};
use tracing::{info, warn};

use crate::client::{CliError, CliResult, CommandContext};
use crate::output::{server_detail, server_line};
use crate::registry::ParsedArgs;

/// Server owning `address`; a missing server is an error.
pub(crate) async fn lookup(robot: &dyn RobotClient, address: IpAddr) -> CliResult<Server> {
    robot
        .find_server(address)
        .await
        .map_err(|err| CliError::robot(err, format!("looking up {address}")))
}

/// Server owning `address`, or `None` with a warning when the account has none.
async fn resolve(robot: &dyn RobotClient, address: IpAddr) -> CliResult<Option<Server>> {
    match robot.find_server(address).await {
        Ok(server) => Ok(Some(server)),
        Err(err) if err.is_not_found() => {
            warn!(%address, "no server with this address; skipping");
            Ok(None)
        }
        Err(err) => Err(CliError::robot(err, format!("looking up {address}"))),
    }
}

pub(crate) async fn handle_list(ctx: &mut CommandContext<'_>) -> CliResult<()> {
    let robot = ctx.robot()?;
    let servers = robot
        .list_servers()
        .await
        .map_err(|err| CliError::robot(err, "listing servers"))?;
    for server in &servers {
        ctx.out.line(server_line(server))?;
    }
    Ok(())
}

pub(crate) async fn handle_show(ctx: &mut CommandContext<'_>, args: &ParsedArgs) -> CliResult<()> {
    let addresses: Vec<IpAddr> = args.parse_all("ip")?;
    let robot = ctx.robot()?;
    let mut first = true;
    for address in addresses {
        let Some(server) = resolve(robot.as_ref(), address).await? else {
            continue;
        };
        if !first {
            ctx.out.line("")?;
        }
        first = false;
        for line in server_detail(&server) {
            ctx.out.line(line)?;
        }
    }
    Ok(())
}

pub(crate) async fn handle_reboot(
    ctx: &mut CommandContext<'_>,
    args: &ParsedArgs,
) -> CliResult<()> {
    let method: RebootMethod = args.parse("method")?;
    let addresses: Vec<IpAddr> = args.parse_all("ip")?;
    let robot = ctx.robot()?;
    for address in addresses {
        let Some(server) = resolve(robot.as_ref(), address).await? else {
            continue;
        };
        robot
            .reboot_server(server.server_number, method)
            .await
            .map_err(|err| CliError::robot(err, format!("rebooting {address}")))?;
        info!(%address, server = server.server_number, %method, "reset requested");
        ctx.out.line(format!(
            "Rebooting {} ({}) with a {method} reset",
            server.address(),
            server.server_number
        ))?;
    }
    Ok(())
}

pub(crate) async fn handle_setname(
    ctx: &mut CommandContext<'_>,
    args: &ParsedArgs,
) -> CliResult<()> {
    let address: IpAddr = args.parse("ip")?;
    let name = args.required("name")?.trim();
    if name.is_empty() {
        return Err(CliError::usage("server name cannot be empty"));
    }
    let robot = ctx.robot()?;
    let server = lookup(robot.as_ref(), address).await?;
    let renamed = robot
        .set_server_name(server.server_number, name)
        .await
        .map_err(|err| CliError::robot(err, format!("renaming {address}")))?;
    ctx.out.line(format!(
        "{}: {} -> {}",
        renamed.address(),
        server.server_name,
        renamed.server_name
    ))
}

#[cfg(test)]
mod tests {
    use crate::testing::Harness;
    use anyhow::Result;
    use robotctl_api::RebootMethod;
    use robotctl_test_support::{FakeRobot, RobotCall, sample_server};

    fn account() -> FakeRobot {
        FakeRobot::new()
            .with_server(sample_server(7, "1.2.3.4", "web"))
            .with_server(sample_server(8, "5.6.7.8", "db"))
    }

    #[tokio::test]
    async fn list_prints_one_line_per_server() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["list"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        let lines: Vec<_> = outcome.stdout.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1.2.3.4"));
        assert!(lines[1].contains("db"));
        Ok(())
    }

    #[tokio::test]
    async fn reboot_defaults_to_hard_and_skips_unknown_targets() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness
            .run(&["reboot", "1.2.3.4", "9.9.9.9", "5.6.7.8"])
            .await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert_eq!(
            harness.robot.reboots(),
            vec![(7, RebootMethod::Hard), (8, RebootMethod::Hard)]
        );
        assert_eq!(outcome.stdout.lines().count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn reboot_honours_the_requested_method() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["reboot", "--method", "soft", "5.6.7.8"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert_eq!(harness.robot.reboots(), vec![(8, RebootMethod::Soft)]);
        assert!(outcome.stdout.contains("soft"));
        Ok(())
    }

    #[tokio::test]
    async fn show_prints_details_for_known_addresses() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["show", "9.9.9.9", "5.6.7.8"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert!(outcome.stdout.starts_with("server: 5.6.7.8 (8)"));
        assert!(outcome.stdout.contains("name: db"));
        Ok(())
    }

    #[tokio::test]
    async fn setname_renames_the_owning_server() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["setname", "1.2.3.4", "frontend"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert_eq!(outcome.stdout.trim(), "1.2.3.4: web -> frontend");
        assert!(
            harness
                .robot
                .calls()
                .contains(&RobotCall::SetServerName(7, "frontend".to_string()))
        );
        Ok(())
    }
}
