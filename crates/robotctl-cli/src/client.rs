//! Shared error taxonomy, client construction, and handler context for the CLI.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use robotctl_api::{HttpRobotClient, HttpRobotClientOptions, RobotClient, RobotError};
use robotctl_config::{ConfigError, ConfigStore, Credentials};
use url::Url;

use crate::output::LineSink;
use crate::prompt::PasswordPrompt;
use crate::rescue::RescuePolicy;
use crate::shell::ShellLauncher;

/// CLI-level error type; the variant decides the process exit code.
#[derive(Debug)]
pub(crate) enum CliError {
    /// Malformed command line. Carries the full rendered message.
    Usage(String),
    /// Missing or unusable local configuration.
    Configuration(String),
    /// The Robot webservice could not be reached or answered unusably.
    Transport(anyhow::Error),
    /// The webservice refused the request or the operation failed.
    Domain(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn domain(error: impl Into<anyhow::Error>) -> Self {
        Self::Domain(error.into())
    }

    /// Classify a Robot failure and attach what the CLI was doing at the time.
    pub(crate) fn robot(error: RobotError, context: impl Display) -> Self {
        let transport = error.is_transport();
        let error = anyhow::Error::new(error).context(context.to_string());
        if transport {
            Self::Transport(error)
        } else {
            Self::Domain(error)
        }
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Configuration(_) => 3,
            Self::Transport(_) | Self::Domain(_) => 1,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Usage(message) | Self::Configuration(message) => message.clone(),
            Self::Transport(error) | Self::Domain(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

/// Connection parameters resolved from global flags and the environment.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionSettings {
    pub(crate) api_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) trace_id: String,
}

/// Builds authenticated Robot clients for commands that need one.
pub(crate) trait ClientFactory: Send + Sync {
    fn connect(
        &self,
        credentials: &Credentials,
        settings: &ConnectionSettings,
    ) -> CliResult<Arc<dyn RobotClient>>;
}

/// Production factory backed by [`HttpRobotClient`].
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn connect(
        &self,
        credentials: &Credentials,
        settings: &ConnectionSettings,
    ) -> CliResult<Arc<dyn RobotClient>> {
        let options = HttpRobotClientOptions {
            timeout: settings.timeout,
            request_id: Some(settings.trace_id.clone()),
        };
        let client = HttpRobotClient::new(
            settings.api_url.clone(),
            credentials.username.clone(),
            credentials.password.clone(),
            &options,
        )
        .map_err(|err| CliError::robot(err, "failed to build Robot client"))?;
        Ok(Arc::new(client))
    }
}

/// Everything a command handler may touch.
pub(crate) struct CommandContext<'a> {
    pub(crate) client: Option<Arc<dyn RobotClient>>,
    pub(crate) store: ConfigStore,
    pub(crate) config_path: PathBuf,
    pub(crate) out: LineSink<'a>,
    pub(crate) shell: &'a dyn ShellLauncher,
    pub(crate) prompt: &'a dyn PasswordPrompt,
    pub(crate) rescue_policy: RescuePolicy,
}

impl CommandContext<'_> {
    /// Authenticated client; only absent for commands registered without one.
    pub(crate) fn robot(&self) -> CliResult<Arc<dyn RobotClient>> {
        self.client
            .clone()
            .ok_or_else(|| CliError::domain(anyhow!("command requires an authenticated client")))
    }
}
