use crate::client::{CliError, CliResult, CommandContext};
use crate::output::vswitch_lines;

pub(crate) async fn handle_vlan(ctx: &mut CommandContext<'_>) -> CliResult<()> {
    let robot = ctx.robot()?;
    let vswitches = robot
        .list_vswitches()
        .await
        .map_err(|err| CliError::robot(err, "listing vswitches"))?;
    for vswitch in &vswitches {
        for line in vswitch_lines(vswitch) {
            ctx.out.line(line)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testing::Harness;
    use anyhow::Result;
    use robotctl_test_support::{FakeRobot, sample_server, sample_vswitch};

    #[tokio::test]
    async fn lists_vswitches_with_members() -> Result<()> {
        let web = sample_server(7, "1.2.3.4", "web");
        let db = sample_server(8, "5.6.7.8", "db");
        let harness = Harness::new(
            FakeRobot::new()
                .with_vswitch(sample_vswitch(11, 4000, &[&web, &db]))
                .with_vswitch(sample_vswitch(12, 4001, &[])),
        )?;
        harness.write_credentials()?;

        let outcome = harness.run(&["vlan"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        let lines: Vec<_> = outcome.stdout.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("4000"));
        assert!(lines[2].contains("5.6.7.8"));
        assert!(lines[3].contains("4001"));
        Ok(())
    }
}
