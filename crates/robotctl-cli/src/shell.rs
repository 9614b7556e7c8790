//! Interactive shell sessions on servers booted into rescue mode.

use anyhow::anyhow;
use async_trait::async_trait;
use robotctl_api::RescueCredentials;
use tokio::process::Command;
use tracing::debug;

use crate::client::{CliError, CliResult};

/// Opens an interactive session and returns once the operator leaves it.
#[async_trait]
pub(crate) trait ShellLauncher: Send + Sync {
    async fn open(&self, host: &str, credentials: &RescueCredentials) -> CliResult<()>;
}

/// Runs `ssh` with the terminal's stdio inherited.
///
/// Rescue systems get a fresh host key on every boot, so host key checking is
/// disabled and nothing is written to `known_hosts`. When the webservice issued
/// a root password, `ssh` runs under `sshpass -e` with the password in
/// `SSHPASS`; otherwise the session relies on the authorized keys.
#[derive(Debug, Clone)]
pub(crate) struct SshShell {
    program: String,
    password_helper: String,
}

impl Default for SshShell {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            password_helper: "sshpass".to_string(),
        }
    }
}

impl SshShell {
    const PASSWORD_ENV: &'static str = "SSHPASS";

    fn arguments(host: &str) -> [&str; 7] {
        [
            "-o",
            "StrictHostKeyChecking=no",
            "-o",
            "UserKnownHostsFile=/dev/null",
            "-l",
            RescueCredentials::LOGIN,
            host,
        ]
    }

    fn command(&self, host: &str, credentials: &RescueCredentials) -> Command {
        let password = credentials
            .password
            .as_deref()
            .filter(|password| !password.is_empty());
        let mut command = match password {
            Some(password) => {
                let mut command = Command::new(&self.password_helper);
                command
                    .arg("-e")
                    .arg(&self.program)
                    .env(Self::PASSWORD_ENV, password);
                command
            }
            None => Command::new(&self.program),
        };
        command.args(Self::arguments(host)).kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ShellLauncher for SshShell {
    async fn open(&self, host: &str, credentials: &RescueCredentials) -> CliResult<()> {
        let mut command = self.command(host, credentials);
        let launcher = command.as_std().get_program().to_string_lossy().into_owned();
        debug!(program = %launcher, host, "opening rescue shell");
        let status = command
            .status()
            .await
            .map_err(|err| CliError::domain(anyhow!("failed to launch {launcher}: {err}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(CliError::domain(anyhow!(
                "{} session to {host} ended with {status}",
                self.program
            )))
        }
    }
}
