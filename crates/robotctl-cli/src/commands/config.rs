use anyhow::anyhow;
use robotctl_config::{ConfigKey, LOGIN_SECTION, PASSWORD_KEY, USERNAME_KEY};
use tracing::info;

use crate::client::{CliError, CliResult, CommandContext};
use crate::registry::ParsedArgs;

const MASKED: &str = "********";

pub(crate) fn handle_config(ctx: &mut CommandContext<'_>, args: &ParsedArgs) -> CliResult<()> {
    let unset = args.flag("unset");
    let key = args
        .optional("key")
        .map(str::parse::<ConfigKey>)
        .transpose()?;
    let value = args.optional("value");

    match (key, value) {
        (None, _) if unset => Err(CliError::usage("--unset needs a <section>.<key>")),
        (None, _) => {
            for section in ctx.store.sections() {
                for (key, value) in ctx.store.items(section) {
                    let shown = if section == LOGIN_SECTION && key == PASSWORD_KEY {
                        MASKED
                    } else {
                        value
                    };
                    ctx.out.line(format!("{section}.{key} = {shown}"))?;
                }
            }
            Ok(())
        }
        (Some(_), Some(_)) if unset => Err(CliError::usage("--unset does not take a value")),
        (Some(key), None) if unset => {
            if ctx.store.unset(&key.section, &key.key).is_none() {
                return ctx.out.line(format!("{key} was not set"));
            }
            ctx.store.persist(&ctx.config_path)?;
            ctx.out.line(format!("{key} removed"))
        }
        (Some(key), Some(value)) => {
            ctx.store.set(&key.section, &key.key, value)?;
            ctx.store.persist(&ctx.config_path)?;
            info!(%key, path = %ctx.config_path.display(), "setting stored");
            ctx.out.line(format!("{key} updated"))
        }
        (Some(key), None) => {
            let value = ctx
                .store
                .get(&key.section, &key.key)
                .ok_or_else(|| CliError::domain(anyhow!("{key} is not set")))?;
            ctx.out.line(value)
        }
    }
}

pub(crate) fn handle_login(ctx: &mut CommandContext<'_>, args: &ParsedArgs) -> CliResult<()> {
    let username = args.required("username")?.trim();
    if username.is_empty() {
        return Err(CliError::usage("user name cannot be empty"));
    }
    let password = ctx
        .prompt
        .password(&format!("Robot password for {username}: "))?;
    if password.is_empty() {
        return Err(CliError::configuration("empty password; nothing stored"));
    }

    ctx.store.set(LOGIN_SECTION, USERNAME_KEY, username)?;
    ctx.store.set(LOGIN_SECTION, PASSWORD_KEY, &password)?;
    ctx.store.persist(&ctx.config_path)?;
    info!(username, path = %ctx.config_path.display(), "credentials stored");
    let path = ctx.config_path.display().to_string();
    ctx.out
        .line(format!("Stored Robot credentials for {username} in {path}"))
}

#[cfg(test)]
mod tests {
    use crate::testing::{Harness, PROMPTED_PASSWORD};
    use anyhow::Result;
    use robotctl_config::{LOGIN_SECTION, PASSWORD_KEY, USERNAME_KEY};
    use robotctl_test_support::FakeRobot;

    #[tokio::test]
    async fn login_stores_prompted_credentials() -> Result<()> {
        let harness = Harness::new(FakeRobot::new())?;

        let outcome = harness.run(&["login", "robot-user"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        let stored = harness.stored()?;
        assert_eq!(stored.get(LOGIN_SECTION, USERNAME_KEY), Some("robot-user"));
        assert_eq!(stored.get(LOGIN_SECTION, PASSWORD_KEY), Some(PROMPTED_PASSWORD));
        assert_eq!(harness.connects(), 0);

        let listed = harness.run(&["list"]).await;
        assert_eq!(listed.code, 0, "{}", listed.stderr);
        assert_eq!(harness.connects(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn config_lists_settings_with_the_password_masked() -> Result<()> {
        let harness = Harness::new(FakeRobot::new())?;
        harness.write_credentials()?;

        let outcome = harness.run(&["config"]).await;

        assert_eq!(outcome.code, 0, "{}", outcome.stderr);
        assert!(outcome.stdout.contains("login.username = robot"));
        assert!(outcome.stdout.contains("login.password = ********"));
        assert!(!outcome.stdout.contains("secret"));
        Ok(())
    }

    #[tokio::test]
    async fn unset_removes_keys_and_reports_absent_ones() -> Result<()> {
        let harness = Harness::new(FakeRobot::new())?;
        harness.write_credentials()?;

        let removed = harness.run(&["config", "--unset", "login.password"]).await;
        assert_eq!(removed.code, 0, "{}", removed.stderr);
        assert_eq!(harness.stored()?.get(LOGIN_SECTION, PASSWORD_KEY), None);

        let absent = harness.run(&["config", "-u", "login.password"]).await;
        assert_eq!(absent.code, 0);
        assert!(absent.stdout.contains("was not set"));

        let gated = harness.run(&["list"]).await;
        assert_eq!(gated.code, 3);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_keys_are_configuration_errors() -> Result<()> {
        let harness = Harness::new(FakeRobot::new())?;

        let outcome = harness.run(&["config", "nodot", "value"]).await;

        assert_eq!(outcome.code, 3);
        assert!(outcome.stderr.contains("nodot"));
        Ok(())
    }

    #[tokio::test]
    async fn reading_an_unset_key_fails() -> Result<()> {
        let harness = Harness::new(FakeRobot::new())?;

        let outcome = harness.run(&["config", "log.format"]).await;

        assert_eq!(outcome.code, 1);
        assert!(outcome.stderr.contains("log.format is not set"));
        Ok(())
    }
}
