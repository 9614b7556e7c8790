//! Argument parsing, credential gating, and exit-code mapping.
//!
//! Parsing is complete before anything touches the network: every parameter
//! has been checked against its declared arity, accepted values, and value
//! kind by the time a handler runs. Commands registered as needing an
//! authenticated client never start without credentials in the config store.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::ArgMatches;
use clap::error::ErrorKind;
use robotctl_config::{ConfigError, ConfigStore};
use robotctl_telemetry::invocation_span;
use tracing::{Instrument, debug};
use url::Url;
use uuid::Uuid;

use crate::client::{
    ClientFactory, CliError, CliResult, CommandContext, ConnectionSettings,
};
use crate::commands;
use crate::output::LineSink;
use crate::prompt::PasswordPrompt;
use crate::registry::{
    ARG_API_URL, ARG_CONFIG, ARG_DEBUG, ARG_TIMEOUT, Command, CommandRegistry, PROGRAM,
    ParsedArgs,
};
use crate::rescue::RescuePolicy;
use crate::shell::ShellLauncher;

pub(crate) const EXIT_SUCCESS: i32 = 0;
pub(crate) const EXIT_NO_COMMAND: i32 = 1;

/// Configuration file looked up in the home directory when `--config` is absent.
pub(crate) const CONFIG_FILE_NAME: &str = ".robotrc";

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub(crate) struct GlobalOptions {
    pub(crate) config_path: PathBuf,
    pub(crate) config_is_default: bool,
    pub(crate) debug: bool,
    pub(crate) connection: ConnectionSettings,
}

impl GlobalOptions {
    fn from_matches(matches: &ArgMatches) -> CliResult<Self> {
        let (config_path, config_is_default) = match matches.get_one::<String>(ARG_CONFIG) {
            Some(path) => (PathBuf::from(path), false),
            None => (default_config_path()?, true),
        };
        let api_url = matches
            .get_one::<Url>(ARG_API_URL)
            .cloned()
            .ok_or_else(|| CliError::usage("missing --api-url"))?;
        let timeout = matches
            .get_one::<u64>(ARG_TIMEOUT)
            .copied()
            .ok_or_else(|| CliError::usage("missing --timeout"))?;

        Ok(Self {
            config_path,
            config_is_default,
            debug: matches.get_flag(ARG_DEBUG),
            connection: ConnectionSettings {
                api_url,
                timeout: Duration::from_secs(timeout),
                trace_id: Uuid::new_v4().to_string(),
            },
        })
    }

    /// `--config <path>` as it must be repeated in remediation hints.
    fn config_flag(&self) -> String {
        if self.config_is_default {
            String::new()
        } else {
            format!(" --config {}", self.config_path.display())
        }
    }
}

fn default_config_path() -> CliResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .ok_or_else(|| {
            CliError::configuration("cannot determine the home directory; pass --config <PATH>")
        })
}

/// A fully validated command line, ready to execute.
#[derive(Debug)]
pub(crate) struct Invocation<'r> {
    pub(crate) globals: GlobalOptions,
    pub(crate) command: &'r Command,
    pub(crate) args: ParsedArgs,
}

/// Result of parsing a command line.
#[derive(Debug)]
pub(crate) enum Parsed<'r> {
    Run(Invocation<'r>),
    /// `--help` or `--version`; print and exit successfully.
    Help(String),
    NoCommand,
}

pub(crate) struct Dispatcher {
    registry: CommandRegistry,
    clients: Box<dyn ClientFactory>,
    shell: Box<dyn ShellLauncher>,
    prompt: Box<dyn PasswordPrompt>,
    rescue_policy: RescuePolicy,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: CommandRegistry,
        clients: Box<dyn ClientFactory>,
        shell: Box<dyn ShellLauncher>,
        prompt: Box<dyn PasswordPrompt>,
    ) -> Self {
        Self {
            registry,
            clients,
            shell,
            prompt,
            rescue_policy: RescuePolicy::default(),
        }
    }

    #[must_use]
    pub(crate) fn with_rescue_policy(mut self, rescue_policy: RescuePolicy) -> Self {
        self.rescue_policy = rescue_policy;
        self
    }

    pub(crate) fn parse<I, T>(&self, argv: I) -> CliResult<Parsed<'_>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.registry.clap_command().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) => {
                let rendered = err.render().to_string();
                return match err.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                        Ok(Parsed::Help(rendered))
                    }
                    _ => Err(CliError::usage(
                        rendered
                            .strip_prefix("error: ")
                            .unwrap_or(&rendered)
                            .trim_end(),
                    )),
                };
            }
        };

        let Some((name, sub_matches)) = matches.subcommand() else {
            return Ok(Parsed::NoCommand);
        };
        let command = self
            .registry
            .lookup(name)
            .ok_or_else(|| CliError::usage(format!("no such command '{name}'")))?;
        let globals = GlobalOptions::from_matches(&matches)?;
        let args = ParsedArgs::from_matches(command, sub_matches);

        Ok(Parsed::Run(Invocation {
            globals,
            command,
            args,
        }))
    }

    /// Load configuration, gate on credentials, and run the handler.
    ///
    /// `on_ready` runs once the config store is loaded, before any command work.
    pub(crate) async fn execute<F>(
        &self,
        invocation: Invocation<'_>,
        out: &mut dyn Write,
        on_ready: F,
    ) -> CliResult<()>
    where
        F: FnOnce(&GlobalOptions, &ConfigStore),
    {
        let Invocation {
            globals,
            command,
            args,
        } = invocation;
        let store = ConfigStore::load(&globals.config_path)?;
        on_ready(&globals, &store);

        let span = invocation_span(command.name, &globals.connection.trace_id);
        async move {
            let client = if command.requires_authenticated_client {
                let credentials = store
                    .credentials()
                    .map_err(|err| missing_credentials(&err, &globals))?;
                Some(self.clients.connect(&credentials, &globals.connection)?)
            } else {
                None
            };
            debug!(
                authenticated = client.is_some(),
                config = %globals.config_path.display(),
                "dispatching command"
            );

            let mut ctx = CommandContext {
                client,
                store,
                config_path: globals.config_path.clone(),
                out: LineSink::new(out),
                shell: self.shell.as_ref(),
                prompt: self.prompt.as_ref(),
                rescue_policy: self.rescue_policy,
            };
            commands::execute(command.kind, &mut ctx, &args).await
        }
        .instrument(span)
        .await
    }

    /// Parse and execute `argv`, reporting failures on `err`. Returns the exit code.
    pub(crate) async fn run<I, T, F>(
        &self,
        argv: I,
        out: &mut dyn Write,
        err: &mut dyn Write,
        on_ready: F,
    ) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        F: FnOnce(&GlobalOptions, &ConfigStore),
    {
        let result = match self.parse(argv) {
            Ok(Parsed::Help(text)) => {
                let _ = write!(out, "{text}");
                return EXIT_SUCCESS;
            }
            Ok(Parsed::NoCommand) => {
                let _ = write!(err, "{}", self.registry.listing());
                return EXIT_NO_COMMAND;
            }
            Ok(Parsed::Run(invocation)) => self.execute(invocation, out, on_ready).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(()) => EXIT_SUCCESS,
            Err(error) => report(&error, err),
        }
    }
}

fn missing_credentials(error: &ConfigError, globals: &GlobalOptions) -> CliError {
    let flag = globals.config_flag();
    CliError::configuration(
        [
            format!("{error} in {}", globals.config_path.display()),
            "store them with:".to_string(),
            format!("  {PROGRAM}{flag} login <USERNAME>"),
            "or:".to_string(),
            format!("  {PROGRAM}{flag} config login.username <USERNAME>"),
            format!("  {PROGRAM}{flag} config login.password <PASSWORD>"),
        ]
        .join("\n"),
    )
}

fn report(error: &CliError, err: &mut dyn Write) -> i32 {
    let exit_code = error.exit_code();
    let message = error.display_message();
    debug!(exit_code, error = %message, "command failed");
    let _ = writeln!(err, "error: {message}");
    if matches!(error, CliError::Usage(_)) && !message.contains("--help") {
        let _ = writeln!(err, "\nFor more information, try '--help'.");
    }
    exit_code
}
