//! In-crate harness driving the dispatcher against a [`FakeRobot`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use robotctl_api::{RescueCredentials, RobotClient};
use robotctl_config::{ConfigStore, Credentials, LOGIN_SECTION, PASSWORD_KEY, USERNAME_KEY};
use robotctl_test_support::FakeRobot;
use tempfile::TempDir;

use crate::client::{ClientFactory, CliError, CliResult, ConnectionSettings};
use crate::dispatch::Dispatcher;
use crate::prompt::PasswordPrompt;
use crate::registry::CommandRegistry;
use crate::rescue::RescuePolicy;
use crate::shell::ShellLauncher;

pub(crate) const PROMPTED_PASSWORD: &str = "s3cret";

struct SharedRobot {
    robot: Arc<FakeRobot>,
    connects: Arc<AtomicUsize>,
}

impl ClientFactory for SharedRobot {
    fn connect(
        &self,
        _credentials: &Credentials,
        _settings: &ConnectionSettings,
    ) -> CliResult<Arc<dyn RobotClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let client: Arc<dyn RobotClient> = self.robot.clone();
        Ok(client)
    }
}

/// Host and root password handed to one shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShellSession {
    pub(crate) host: String,
    pub(crate) password: Option<String>,
}

struct RecordingShell {
    sessions: Arc<Mutex<Vec<ShellSession>>>,
    fail: bool,
}

#[async_trait]
impl ShellLauncher for RecordingShell {
    async fn open(&self, host: &str, credentials: &RescueCredentials) -> CliResult<()> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ShellSession {
                host: host.to_string(),
                password: credentials.password.clone(),
            });
        if self.fail {
            Err(CliError::domain(anyhow!("ssh session to {host} ended with exit status: 255")))
        } else {
            Ok(())
        }
    }
}

struct FixedPrompt;

impl PasswordPrompt for FixedPrompt {
    fn password(&self, _message: &str) -> CliResult<String> {
        Ok(PROMPTED_PASSWORD.to_string())
    }
}

/// Captured result of one dispatcher run.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) code: i32,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

pub(crate) struct Harness {
    pub(crate) robot: Arc<FakeRobot>,
    pub(crate) dispatcher: Dispatcher,
    connects: Arc<AtomicUsize>,
    shells: Arc<Mutex<Vec<ShellSession>>>,
    config_dir: TempDir,
}

impl Harness {
    pub(crate) fn new(robot: FakeRobot) -> Result<Self> {
        Self::build(robot, false)
    }

    /// Harness whose interactive shell exits with an error.
    pub(crate) fn with_failing_shell(robot: FakeRobot) -> Result<Self> {
        Self::build(robot, true)
    }

    fn build(robot: FakeRobot, fail_shell: bool) -> Result<Self> {
        let robot = Arc::new(robot);
        let connects = Arc::new(AtomicUsize::new(0));
        let shells = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(
            CommandRegistry::builtin(),
            Box::new(SharedRobot {
                robot: robot.clone(),
                connects: connects.clone(),
            }),
            Box::new(RecordingShell {
                sessions: shells.clone(),
                fail: fail_shell,
            }),
            Box::new(FixedPrompt),
        )
        .with_rescue_policy(RescuePolicy {
            poll_interval: Duration::from_millis(1),
        });

        Ok(Self {
            robot,
            dispatcher,
            connects,
            shells,
            config_dir: tempfile::tempdir()?,
        })
    }

    pub(crate) fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("robotrc")
    }

    pub(crate) fn write_credentials(&self) -> Result<()> {
        let mut store = ConfigStore::load(&self.config_path())?;
        store.set(LOGIN_SECTION, USERNAME_KEY, "robot")?;
        store.set(LOGIN_SECTION, PASSWORD_KEY, "secret")?;
        store.persist(&self.config_path())?;
        Ok(())
    }

    pub(crate) fn stored(&self) -> Result<ConfigStore> {
        Ok(ConfigStore::load(&self.config_path())?)
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn shells_opened(&self) -> usize {
        self.shell_sessions().len()
    }

    pub(crate) fn shell_sessions(&self) -> Vec<ShellSession> {
        self.shells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `robotctl --config <tempfile> <args...>`.
    pub(crate) async fn run(&self, args: &[&str]) -> Outcome {
        let config = self.config_path().display().to_string();
        let mut argv = vec!["robotctl", "--config", config.as_str()];
        argv.extend_from_slice(args);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = self
            .dispatcher
            .run(argv, &mut stdout, &mut stderr, |_, _| {})
            .await;
        Outcome {
            code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }
    }
}
