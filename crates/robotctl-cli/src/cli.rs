//! Process entrypoint: wires real collaborators into the dispatcher.

use std::env;
use std::io;

use robotctl_config::ConfigStore;
use robotctl_telemetry::{
    DEBUG_LOG_LEVEL, DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging,
};

use crate::client::HttpClientFactory;
use crate::dispatch::{Dispatcher, GlobalOptions};
use crate::prompt::TerminalPrompt;
use crate::registry::CommandRegistry;
use crate::shell::SshShell;

const LOG_SECTION: &str = "log";

/// Parse the process arguments, run the selected command, and return the exit code.
pub async fn run() -> i32 {
    let dispatcher = Dispatcher::new(
        CommandRegistry::builtin(),
        Box::new(HttpClientFactory),
        Box::new(SshShell::default()),
        Box::new(TerminalPrompt),
    );
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    dispatcher
        .run(env::args_os(), &mut stdout, &mut stderr, install_logging)
        .await
}

/// `--debug` wins over `log.level`; `RUST_LOG` wins over both.
fn install_logging(globals: &GlobalOptions, store: &ConfigStore) {
    let level = if globals.debug {
        DEBUG_LOG_LEVEL
    } else {
        store.get(LOG_SECTION, "level").unwrap_or(DEFAULT_LOG_LEVEL)
    };
    let format = store
        .get(LOG_SECTION, "format")
        .and_then(LogFormat::from_name)
        .unwrap_or(LogFormat::Pretty);

    if let Err(err) = init_logging(&LoggingConfig { level, format }) {
        eprintln!("warning: {err}");
    }
}

