//! Interactive password entry.

use anyhow::anyhow;

use crate::client::{CliError, CliResult};

/// Reads a secret from the operator without echoing it.
pub(crate) trait PasswordPrompt: Send + Sync {
    fn password(&self, message: &str) -> CliResult<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn password(&self, message: &str) -> CliResult<String> {
        rpassword::prompt_password(message)
            .map_err(|err| CliError::domain(anyhow!("failed to read password: {err}")))
    }
}
