use std::net::IpAddr;
use std::time::Duration;

use anyhow::anyhow;
use robotctl_api::{RebootMethod, RescueCredentials, RobotClient, Server};
use tracing::{debug, info, warn};

use crate::client::{CliError, CliResult, CommandContext};
use crate::commands::servers::lookup;
use crate::output::rescue_lines;
use crate::registry::ParsedArgs;
use crate::rescue::{RescueOrchestrator, RescueOutcome, RescueRequest};
use crate::shell::ShellLauncher;

pub(crate) async fn handle_rescue(
    ctx: &mut CommandContext<'_>,
    args: &ParsedArgs,
) -> CliResult<()> {
    let address: IpAddr = args.parse("ip")?;
    let patience = Duration::from_secs(args.parse("patience")?);
    let manual = args.flag("manual");
    let interactive = !args.flag("noshell");

    let robot = ctx.robot()?;
    let server = lookup(robot.as_ref(), address).await?;
    let request = RescueRequest {
        server,
        patience,
        manual,
        authorized_keys: args.values("authorized-key").to_vec(),
    };

    let mut orchestrator = RescueOrchestrator::new(robot.as_ref(), ctx.rescue_policy);
    let outcome = orchestrator.activate(&request).await;
    debug!(state = ?orchestrator.state(), "rescue sequence finished");

    // The server record may only carry an IPv6 network; connect to the
    // address the operator named.
    let host = address.to_string();
    match outcome? {
        RescueOutcome::ManualFallback(credentials) => {
            for line in rescue_lines(&host, &credentials) {
                ctx.out.line(line)?;
            }
            ctx.out.line(format!(
                "{host} did not confirm the rescue system within {}s; check the console before connecting",
                patience.as_secs()
            ))
        }
        RescueOutcome::Ready(credentials) => {
            for line in rescue_lines(&host, &credentials) {
                ctx.out.line(line)?;
            }
            if interactive {
                shell_then_reset(robot.as_ref(), ctx.shell, &host, &request.server, &credentials)
                    .await
            } else {
                Ok(())
            }
        }
    }
}

/// Open the rescue shell, then reset the server into its installed system no
/// matter how the session ended.
async fn shell_then_reset(
    robot: &dyn RobotClient,
    shell: &dyn ShellLauncher,
    host: &str,
    server: &Server,
    credentials: &RescueCredentials,
) -> CliResult<()> {
    let session = tokio::select! {
        result = shell.open(host, credentials) => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            Err(CliError::domain(anyhow!("rescue shell on {host} interrupted")))
        }
    };

    info!(host, "resetting back into the installed system");
    let reset = robot
        .reboot_server(server.server_number, RebootMethod::Hard)
        .await
        .map_err(|err| CliError::robot(err, format!("resetting {host} out of the rescue system")));

    match (session, reset) {
        (Ok(()), reset) => reset,
        (Err(session), Ok(())) => Err(session),
        (Err(session), Err(reset)) => {
            warn!(error = %reset, "reset after the rescue shell failed");
            Err(session)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Harness, ShellSession};
    use anyhow::Result;
    use robotctl_api::RebootMethod;
    use robotctl_test_support::{FakeRobot, RobotCall, sample_server};

    fn account() -> FakeRobot {
        FakeRobot::new().with_server(sample_server(7, "1.2.3.4", "web"))
    }

    #[tokio::test]
    async fn noshell_prints_credentials_after_one_reset() -> Result<()> {
        let harness = Harness::new(account().with_rescue_ready_after(1))?;
        harness.write_credentials()?;

        let outcome = harness
            .run(&["rescue", "--noshell", "-p", "1", "1.2.3.4"])
            .await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert!(outcome.stdout.contains("login: root"));
        assert!(outcome.stdout.contains("password: rescue-7"));
        assert_eq!(harness.robot.reboots(), vec![(7, RebootMethod::Hard)]);
        assert_eq!(harness.shells_opened(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn interactive_session_ends_with_a_reset() -> Result<()> {
        let harness = Harness::new(account().with_rescue_ready_after(1))?;
        harness.write_credentials()?;

        let outcome = harness.run(&["rescue", "1.2.3.4"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert_eq!(
            harness.shell_sessions(),
            vec![ShellSession {
                host: "1.2.3.4".to_string(),
                password: Some("rescue-7".to_string()),
            }]
        );
        assert_eq!(harness.robot.reboots().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn shell_connects_to_the_requested_ipv6_address() -> Result<()> {
        let mut server = sample_server(9, "2a01:4f8:111:4221::2", "v6");
        server.server_ip = None;
        server.server_ipv6_net = Some("2a01:4f8:111:4221::".to_string());
        let harness = Harness::new(
            FakeRobot::new()
                .with_server(server)
                .with_rescue_ready_after(1),
        )?;
        harness.write_credentials()?;

        let outcome = harness.run(&["rescue", "2a01:4f8:111:4221::2"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert!(outcome.stdout.contains("host: 2a01:4f8:111:4221::2"));
        let sessions = harness.shell_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].host, "2a01:4f8:111:4221::2");
        assert_eq!(sessions[0].password.as_deref(), Some("rescue-9"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_shell_still_resets_and_reports_the_error() -> Result<()> {
        let harness = Harness::with_failing_shell(account().with_rescue_ready_after(1))?;
        harness.write_credentials()?;

        let outcome = harness.run(&["rescue", "1.2.3.4"]).await;

        assert_eq!(outcome.code, 1);
        assert!(outcome.stderr.contains("ssh session"));
        assert_eq!(harness.shells_opened(), 1);
        assert_eq!(
            harness.robot.reboots(),
            vec![(7, RebootMethod::Hard), (7, RebootMethod::Hard)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn timeout_after_two_resets_opens_no_shell() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["rescue", "-p", "0", "1.2.3.4"]).await;

        assert_eq!(outcome.code, 1);
        assert_eq!(harness.robot.reboots().len(), 2);
        assert_eq!(harness.shells_opened(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn manual_fallback_skips_shell_and_cleanup() -> Result<()> {
        let harness = Harness::new(account())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["rescue", "--manual", "-p", "0", "1.2.3.4"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert!(outcome.stdout.contains("did not confirm"));
        assert_eq!(harness.robot.reboots().len(), 1);
        assert_eq!(harness.shells_opened(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn authorized_keys_are_forwarded_and_unknown_ones_exit_three() -> Result<()> {
        let harness = Harness::new(account().with_rejected_keys())?;
        harness.write_credentials()?;

        let outcome = harness
            .run(&["rescue", "-k", "aa:bb", "-k", "cc:dd", "1.2.3.4"])
            .await;

        assert_eq!(outcome.code, 3);
        assert!(harness.robot.calls().contains(&RobotCall::ActivateRescue(
            7,
            vec!["aa:bb".to_string(), "cc:dd".to_string()]
        )));
        assert!(harness.robot.reboots().is_empty());
        Ok(())
    }
}
