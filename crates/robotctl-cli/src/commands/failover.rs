use std::net::IpAddr;

use anyhow::anyhow;

use crate::client::{CliError, CliResult, CommandContext};
use crate::output::failover_line;
use crate::registry::ParsedArgs;

pub(crate) async fn handle_failover(
    ctx: &mut CommandContext<'_>,
    args: &ParsedArgs,
) -> CliResult<()> {
    let ip: Option<IpAddr> = args.parse_optional("ip")?;
    let destination: Option<IpAddr> = args.parse_optional("destination")?;
    let robot = ctx.robot()?;

    if let (Some(ip), Some(destination)) = (ip, destination) {
        let routed = robot
            .set_failover_destination(ip, destination)
            .await
            .map_err(|err| CliError::robot(err, format!("routing {ip} to {destination}")))?;
        return ctx.out.line(failover_line(&routed));
    }

    let entries = robot
        .list_failover_ips()
        .await
        .map_err(|err| CliError::robot(err, "listing failover IPs"))?;
    match ip {
        Some(ip) => {
            let wanted = ip.to_string();
            let entry = entries
                .iter()
                .find(|entry| entry.ip == wanted)
                .ok_or_else(|| {
                    CliError::domain(anyhow!("{ip} is not a failover IP of this account"))
                })?;
            ctx.out.line(failover_line(entry))
        }
        None => {
            for entry in &entries {
                ctx.out.line(failover_line(entry))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use crate::testing::Harness;
    use anyhow::Result;
    use robotctl_api::FailoverIp;
    use robotctl_test_support::{FakeRobot, RobotCall};

    fn failover(ip: &str, active: &str) -> FailoverIp {
        FailoverIp {
            ip: ip.to_string(),
            netmask: "255.255.255.255".to_string(),
            server_ip: Some("1.2.3.4".to_string()),
            server_number: 7,
            active_server_ip: Some(active.to_string()),
        }
    }

    fn account() -> FakeRobot {
        FakeRobot::new()
            .with_failover(failover("10.0.0.1", "1.2.3.4"))
            .with_failover(failover("10.0.0.2", "5.6.7.8"))
    }

    #[tokio::test]
    async fn lists_every_failover_ip() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["failover"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert_eq!(outcome.stdout.lines().count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn shows_a_single_failover_ip() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["failover", "10.0.0.2"]).await;
        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert!(outcome.stdout.contains("5.6.7.8"));

        let missing = harness.run(&["failover", "10.0.0.9"]).await;
        assert_eq!(missing.code, 1);
        Ok(())
    }

    #[tokio::test]
    async fn routes_to_a_new_destination() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["failover", "10.0.0.1", "5.6.7.8"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert!(outcome.stdout.contains("-> 5.6.7.8"));
        assert_eq!(
            harness.robot.calls(),
            vec![RobotCall::SetFailoverDestination(
                IpAddr::from([10, 0, 0, 1]),
                IpAddr::from([5, 6, 7, 8]),
            )]
        );
        Ok(())
    }
}
