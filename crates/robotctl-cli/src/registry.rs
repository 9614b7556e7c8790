//! Declarative command metadata and its translation into a clap parser.
//!
//! Every command is described once as data: name, help text, parameters, and
//! whether it needs an authenticated Robot client. The dispatcher derives the
//! argument parser, the command listing, and the credential gate from it.

use std::collections::HashMap;
use std::fmt::{Display, Write as _};
use std::net::IpAddr;
use std::str::FromStr;

use clap::builder::{PossibleValuesParser, ValueParser};
use clap::{Arg, ArgAction, ArgMatches, ColorChoice};
use robotctl_api::{DEFAULT_BASE_URL, RebootMethod};
use url::Url;

use crate::client::{CliError, CliResult};

pub(crate) const PROGRAM: &str = "robotctl";

pub(crate) const ARG_CONFIG: &str = "config";
pub(crate) const ARG_DEBUG: &str = "debug";
pub(crate) const ARG_API_URL: &str = "api-url";
pub(crate) const ARG_TIMEOUT: &str = "timeout";

pub(crate) const ENV_CONFIG: &str = "ROBOTCTL_CONFIG";
pub(crate) const ENV_API_URL: &str = "ROBOTCTL_API_URL";
pub(crate) const ENV_TIMEOUT: &str = "ROBOTCTL_HTTP_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_PATIENCE_SECS: &str = "300";

/// Admin sub-actions accepted by `admin --action`.
pub(crate) const ADMIN_ACTIONS: [&str; 3] = ["show", "create", "delete"];

/// How many values a parameter takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    One,
    Optional,
    OneOrMore,
    ZeroOrMore,
}

impl Arity {
    const fn required(self) -> bool {
        matches!(self, Self::One | Self::OneOrMore)
    }

    const fn repeats(self) -> bool {
        matches!(self, Self::OneOrMore | Self::ZeroOrMore)
    }
}

/// How a parameter appears on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamStyle {
    Positional,
    Option { short: Option<char> },
    Switch { short: Option<char> },
}

/// Shape every value must have before a handler sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueKind {
    Text,
    Ip,
    Seconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParameterSpec {
    pub(crate) name: &'static str,
    pub(crate) style: ParamStyle,
    pub(crate) arity: Arity,
    pub(crate) default: Option<&'static str>,
    pub(crate) accepted: &'static [&'static str],
    pub(crate) kind: ValueKind,
    pub(crate) help: &'static str,
}

impl ParameterSpec {
    pub(crate) const fn positional(name: &'static str, arity: Arity, help: &'static str) -> Self {
        Self {
            name,
            style: ParamStyle::Positional,
            arity,
            default: None,
            accepted: &[],
            kind: ValueKind::Text,
            help,
        }
    }

    pub(crate) const fn option(
        name: &'static str,
        short: Option<char>,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            style: ParamStyle::Option { short },
            arity: Arity::Optional,
            default: None,
            accepted: &[],
            kind: ValueKind::Text,
            help,
        }
    }

    pub(crate) const fn switch(
        name: &'static str,
        short: Option<char>,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            style: ParamStyle::Switch { short },
            arity: Arity::Optional,
            default: None,
            accepted: &[],
            kind: ValueKind::Text,
            help,
        }
    }

    pub(crate) const fn of_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub(crate) const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub(crate) const fn accepting(mut self, accepted: &'static [&'static str]) -> Self {
        self.accepted = accepted;
        self
    }

    pub(crate) const fn repeated(mut self) -> Self {
        self.arity = Arity::ZeroOrMore;
        self
    }

    fn to_arg(&self) -> Arg {
        let arg = Arg::new(self.name).help(self.help);
        let arg = match self.style {
            ParamStyle::Switch { short } => {
                let arg = arg.long(self.name).action(ArgAction::SetTrue);
                return match short {
                    Some(short) => arg.short(short),
                    None => arg,
                };
            }
            ParamStyle::Positional => {
                let arg = arg.required(self.arity.required() && self.default.is_none());
                if self.arity.repeats() {
                    arg.num_args(1..).action(ArgAction::Append)
                } else {
                    arg.action(ArgAction::Set)
                }
            }
            ParamStyle::Option { short } => {
                let arg = arg
                    .long(self.name)
                    .required(self.arity.required() && self.default.is_none())
                    .action(if self.arity.repeats() {
                        ArgAction::Append
                    } else {
                        ArgAction::Set
                    });
                match short {
                    Some(short) => arg.short(short),
                    None => arg,
                }
            }
        };
        let arg = match self.default {
            Some(default) => arg.default_value(default),
            None => arg,
        };
        if self.accepted.is_empty() {
            arg.value_parser(match self.kind {
                ValueKind::Text => ValueParser::string(),
                ValueKind::Ip => ValueParser::new(parse_ip),
                ValueKind::Seconds => ValueParser::new(parse_seconds),
            })
        } else {
            arg.value_parser(PossibleValuesParser::new(self.accepted.iter().copied()))
        }
    }
}

fn parse_ip(value: &str) -> Result<String, String> {
    value
        .parse::<IpAddr>()
        .map(|_| value.to_string())
        .map_err(|err| format!("'{value}' is not an IP address: {err}"))
}

fn parse_seconds(value: &str) -> Result<String, String> {
    value
        .parse::<u64>()
        .map(|_| value.to_string())
        .map_err(|err| format!("'{value}' is not a whole number of seconds: {err}"))
}

fn parse_url(value: &str) -> Result<Url, String> {
    value
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{value}': {err}"))
}

/// Handler selector for a registered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    List,
    Show,
    Reboot,
    Rescue,
    SetName,
    ReverseDns,
    Failover,
    Vlan,
    Admin,
    Login,
    Config,
}

#[derive(Debug, Clone)]
pub(crate) struct Command {
    pub(crate) name: &'static str,
    pub(crate) summary: &'static str,
    pub(crate) description: &'static str,
    pub(crate) params: Vec<ParameterSpec>,
    pub(crate) requires_authenticated_client: bool,
    pub(crate) kind: CommandKind,
}

impl Command {
    fn to_clap(&self) -> clap::Command {
        self.params.iter().fold(
            clap::Command::new(self.name)
                .about(self.summary)
                .long_about(self.description),
            |command, param| command.arg(param.to_arg()),
        )
    }
}

/// Name-indexed set of commands, kept in registration order for listings.
#[derive(Debug, Default)]
pub(crate) struct CommandRegistry {
    commands: Vec<Command>,
    index: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a command.
    ///
    /// # Panics
    ///
    /// Panics when a command with the same name is already registered.
    pub(crate) fn register(&mut self, command: Command) {
        assert!(
            !self.index.contains_key(command.name),
            "command '{}' registered twice",
            command.name
        );
        self.index.insert(command.name, self.commands.len());
        self.commands.push(command);
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&Command> {
        self.index
            .get(name)
            .and_then(|&position| self.commands.get(position))
    }

    pub(crate) fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Usage line plus one summary line per command.
    pub(crate) fn listing(&self) -> String {
        let width = self
            .commands()
            .map(|command| command.name.len())
            .max()
            .unwrap_or(0);
        let mut text = format!(
            "usage: {PROGRAM} [--config <PATH>] [--debug] <command> [<args>...]\n\ncommands:\n"
        );
        for command in self.commands() {
            let _ = writeln!(text, "  {:<width$}  {}", command.name, command.summary);
        }
        let _ = writeln!(
            text,
            "\nRun '{PROGRAM} <command> --help' for details on a command."
        );
        text
    }

    /// Full argument parser: global flags plus one subcommand per entry.
    pub(crate) fn clap_command(&self) -> clap::Command {
        let root = clap::Command::new(PROGRAM)
            .version(env!("CARGO_PKG_VERSION"))
            .about("Operate dedicated servers through the Robot webservice")
            .color(ColorChoice::Never)
            .arg(
                Arg::new(ARG_CONFIG)
                    .long("config")
                    .global(true)
                    .env(ENV_CONFIG)
                    .help("Configuration file (defaults to ~/.robotrc)"),
            )
            .arg(
                Arg::new(ARG_DEBUG)
                    .long("debug")
                    .global(true)
                    .action(ArgAction::SetTrue)
                    .help("Emit debug logs on stderr"),
            )
            .arg(
                Arg::new(ARG_API_URL)
                    .long("api-url")
                    .global(true)
                    .env(ENV_API_URL)
                    .default_value(DEFAULT_BASE_URL)
                    .value_parser(ValueParser::new(parse_url))
                    .help("Robot webservice base URL"),
            )
            .arg(
                Arg::new(ARG_TIMEOUT)
                    .long("timeout")
                    .global(true)
                    .env(ENV_TIMEOUT)
                    .default_value(DEFAULT_TIMEOUT_SECS)
                    .value_parser(clap::value_parser!(u64).range(1..))
                    .help("HTTP timeout in seconds"),
            );
        self.commands
            .iter()
            .fold(root, |root, command| root.subcommand(command.to_clap()))
    }

    /// Registry holding every operator command.
    pub(crate) fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Command {
            name: "list",
            summary: "List all servers of the account",
            description: "List every server of the account with its main IP, number, name, product, and datacenter.",
            params: Vec::new(),
            requires_authenticated_client: true,
            kind: CommandKind::List,
        });
        registry.register(Command {
            name: "show",
            summary: "Show details of servers",
            description: "Show details of each server owning one of the given IP addresses. Unknown addresses are skipped with a warning.",
            params: vec![
                ParameterSpec::positional("ip", Arity::OneOrMore, "IP address of a server")
                    .of_kind(ValueKind::Ip),
            ],
            requires_authenticated_client: true,
            kind: CommandKind::Show,
        });
        registry.register(Command {
            name: "reboot",
            summary: "Reboot servers",
            description: "Reset each server owning one of the given IP addresses. Unknown addresses are skipped with a warning.",
            params: vec![
                ParameterSpec::option("method", Some('m'), "Reset method")
                    .accepting(&RebootMethod::NAMES)
                    .with_default("hard"),
                ParameterSpec::positional("ip", Arity::OneOrMore, "IP address of a server")
                    .of_kind(ValueKind::Ip),
            ],
            requires_authenticated_client: true,
            kind: CommandKind::Reboot,
        });
        registry.register(Command {
            name: "rescue",
            summary: "Boot a server into the rescue system",
            description: "Activate the Linux rescue system, hard-reset the server, and wait for it to come up. By default an ssh session is opened and the server is reset back into its installed system once the session ends.",
            params: vec![
                ParameterSpec::option(
                    "patience",
                    Some('p'),
                    "Seconds to wait for the rescue system after each reset",
                )
                .of_kind(ValueKind::Seconds)
                .with_default(DEFAULT_PATIENCE_SECS),
                ParameterSpec::switch(
                    "manual",
                    None,
                    "Do not retry the reset; leave a stuck server to the operator",
                ),
                ParameterSpec::switch(
                    "noshell",
                    None,
                    "Print the rescue credentials instead of opening a shell",
                ),
                ParameterSpec::option(
                    "authorized-key",
                    Some('k'),
                    "Fingerprint of a stored SSH key to install (repeatable)",
                )
                .repeated(),
                ParameterSpec::positional("ip", Arity::One, "IP address of the server")
                    .of_kind(ValueKind::Ip),
            ],
            requires_authenticated_client: true,
            kind: CommandKind::Rescue,
        });
        registry.register(Command {
            name: "setname",
            summary: "Change the name of a server",
            description: "Set the display name of the server owning the given IP address.",
            params: vec![
                ParameterSpec::positional("ip", Arity::One, "IP address of the server")
                    .of_kind(ValueKind::Ip),
                ParameterSpec::positional("name", Arity::One, "New server name"),
            ],
            requires_authenticated_client: true,
            kind: CommandKind::SetName,
        });
        registry.register(Command {
            name: "rdns",
            summary: "Show or change reverse DNS records",
            description: "Without a PTR value, show the record of the IP address. With one, set it. With --delete, remove it.",
            params: vec![
                ParameterSpec::switch("delete", Some('d'), "Remove the PTR record"),
                ParameterSpec::positional("ip", Arity::One, "IP address").of_kind(ValueKind::Ip),
                ParameterSpec::positional("ptr", Arity::Optional, "New PTR value"),
            ],
            requires_authenticated_client: true,
            kind: CommandKind::ReverseDns,
        });
        registry.register(Command {
            name: "failover",
            summary: "List or re-route failover IP addresses",
            description: "Without arguments, list every failover IP. With an IP, show where it is routed. With an IP and a destination, route it to the server owning the destination address.",
            params: vec![
                ParameterSpec::positional("ip", Arity::Optional, "Failover IP address")
                    .of_kind(ValueKind::Ip),
                ParameterSpec::positional(
                    "destination",
                    Arity::Optional,
                    "Main IP of the new destination server",
                )
                .of_kind(ValueKind::Ip),
            ],
            requires_authenticated_client: true,
            kind: CommandKind::Failover,
        });
        registry.register(Command {
            name: "vlan",
            summary: "List vswitches and their servers",
            description: "List every vswitch of the account with its VLAN ID and the servers attached to it.",
            params: Vec::new(),
            requires_authenticated_client: true,
            kind: CommandKind::Vlan,
        });
        registry.register(Command {
            name: "admin",
            summary: "Manage the Robot admin account of a server",
            description: "Show, create, or delete the separate admin login that only has access to the given server.",
            params: vec![
                ParameterSpec::option("action", Some('a'), "What to do with the admin account")
                    .accepting(&ADMIN_ACTIONS)
                    .with_default("show"),
                ParameterSpec::option(
                    "password",
                    None,
                    "Password for a created account (generated when omitted)",
                ),
                ParameterSpec::positional("ip", Arity::One, "IP address of the server")
                    .of_kind(ValueKind::Ip),
            ],
            requires_authenticated_client: true,
            kind: CommandKind::Admin,
        });
        registry.register(Command {
            name: "login",
            summary: "Store Robot credentials",
            description: "Prompt for the Robot webservice password of the given user and store both in the configuration file.",
            params: vec![ParameterSpec::positional(
                "username",
                Arity::One,
                "Robot webservice user",
            )],
            requires_authenticated_client: false,
            kind: CommandKind::Login,
        });
        registry.register(Command {
            name: "config",
            summary: "Show or edit the configuration file",
            description: "Without arguments, print every setting. With a section.key, print its value. With a value, store it. With --unset, remove the key.",
            params: vec![
                ParameterSpec::switch("unset", Some('u'), "Remove the key"),
                ParameterSpec::positional("key", Arity::Optional, "Setting as <section>.<key>"),
                ParameterSpec::positional("value", Arity::Optional, "New value"),
            ],
            requires_authenticated_client: false,
            kind: CommandKind::Config,
        });
        registry
    }
}

/// Validated parameter values of one invocation, keyed by parameter name.
#[derive(Debug, Default, Clone)]
pub(crate) struct ParsedArgs {
    values: HashMap<&'static str, Vec<String>>,
    switches: HashMap<&'static str, bool>,
}

impl ParsedArgs {
    pub(crate) fn from_matches(command: &Command, matches: &ArgMatches) -> Self {
        let mut parsed = Self::default();
        for param in &command.params {
            if matches!(param.style, ParamStyle::Switch { .. }) {
                parsed
                    .switches
                    .insert(param.name, matches.get_flag(param.name));
            } else if let Some(values) = matches.get_many::<String>(param.name) {
                parsed.values.insert(param.name, values.cloned().collect());
            }
        }
        parsed
    }

    pub(crate) fn flag(&self, name: &str) -> bool {
        self.switches.get(name).copied().unwrap_or(false)
    }

    pub(crate) fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn optional(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    pub(crate) fn required(&self, name: &str) -> CliResult<&str> {
        self.optional(name)
            .ok_or_else(|| CliError::usage(format!("missing required argument <{name}>")))
    }

    pub(crate) fn parse<T>(&self, name: &str) -> CliResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        parse_value(name, self.required(name)?)
    }

    pub(crate) fn parse_optional<T>(&self, name: &str) -> CliResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(name)
            .map(|raw| parse_value(name, raw))
            .transpose()
    }

    pub(crate) fn parse_all<T>(&self, name: &str) -> CliResult<Vec<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.values(name)
            .iter()
            .map(|raw| parse_value(name, raw))
            .collect()
    }
}

fn parse_value<T>(name: &str, raw: &str) -> CliResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|err| CliError::usage(format!("invalid value '{raw}' for <{name}>: {err}")))
}
