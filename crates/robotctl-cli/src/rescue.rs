//! Rescue-mode state machine.
//!
//! ```text
//! Idle -> RebootRequested (activate, reset) -> WaitingForRescueSignal(1) -> RescueConfirmed
//!                                 |                    -> ManualFallback   (manual mode)
//!                                 +-> RetryReboot (activate again, reset) -> WaitingForRescueSignal(2)
//!                                                      -> RescueConfirmed | Failed
//! ```
//!
//! The rescue boot entry is one-shot: the reset that follows an activation
//! consumes it. A retry therefore activates rescue again before resetting, and
//! the credentials from that second activation replace the first ones.
//!
//! Each waiting window lasts at most the operator's patience; the server is
//! reset at most twice. Transport failures while polling count as "not ready
//! yet"; failures while activating or resetting end the sequence immediately.

use std::time::Duration;

use anyhow::anyhow;
use robotctl_api::{RebootMethod, RescueCredentials, RobotClient, RobotError, Server, ServerId};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::client::{CliError, CliResult};

/// Pause between readiness polls.
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const MAX_RESETS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RescuePolicy {
    pub(crate) poll_interval: Duration,
}

impl Default for RescuePolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RescueState {
    Idle,
    RebootRequested,
    WaitingForRescueSignal { attempt: u8 },
    RetryReboot,
    RescueConfirmed,
    ManualFallback,
    Failed,
}

/// One rescue request against a resolved server.
#[derive(Debug, Clone)]
pub(crate) struct RescueRequest {
    pub(crate) server: Server,
    pub(crate) patience: Duration,
    pub(crate) manual: bool,
    pub(crate) authorized_keys: Vec<String>,
}

#[derive(Debug)]
pub(crate) enum RescueOutcome {
    /// The rescue system is up and reachable.
    Ready(RescueCredentials),
    /// Manual mode gave up after the first window; the server may still be booting.
    ManualFallback(RescueCredentials),
}

pub(crate) struct RescueOrchestrator<'a> {
    client: &'a dyn RobotClient,
    policy: RescuePolicy,
    state: RescueState,
}

impl<'a> RescueOrchestrator<'a> {
    pub(crate) fn new(client: &'a dyn RobotClient, policy: RescuePolicy) -> Self {
        Self {
            client,
            policy,
            state: RescueState::Idle,
        }
    }

    pub(crate) const fn state(&self) -> RescueState {
        self.state
    }

    pub(crate) async fn activate(&mut self, request: &RescueRequest) -> CliResult<RescueOutcome> {
        let id = request.server.server_number;
        let address = request.server.address().to_string();

        self.transition(RescueState::RebootRequested);
        let mut credentials = self.arm(request, &address).await?;
        info!(server = %address, "rescue system activated; resetting");
        self.reset(id, &address).await?;

        for attempt in 1..=MAX_RESETS {
            self.transition(RescueState::WaitingForRescueSignal { attempt });
            if self.wait_for_signal(id, request.patience).await? {
                self.transition(RescueState::RescueConfirmed);
                return Ok(RescueOutcome::Ready(credentials));
            }
            if request.manual {
                self.transition(RescueState::ManualFallback);
                return Ok(RescueOutcome::ManualFallback(credentials));
            }
            if attempt < MAX_RESETS {
                warn!(
                    server = %address,
                    patience_secs = request.patience.as_secs(),
                    "rescue system not up yet; activating again and resetting"
                );
                self.transition(RescueState::RetryReboot);
                credentials = self.arm(request, &address).await?;
                self.reset(id, &address).await?;
            }
        }

        self.transition(RescueState::Failed);
        Err(CliError::domain(anyhow!(
            "{address} did not come up in the rescue system after {MAX_RESETS} resets ({}s each)",
            request.patience.as_secs()
        )))
    }

    /// Arm the one-shot rescue boot entry and return its credentials.
    async fn arm(
        &mut self,
        request: &RescueRequest,
        address: &str,
    ) -> CliResult<RescueCredentials> {
        match self
            .client
            .activate_rescue(request.server.server_number, &request.authorized_keys)
            .await
        {
            Ok(credentials) => Ok(credentials),
            Err(err) => {
                self.transition(RescueState::Failed);
                Err(activation_error(err, request, address))
            }
        }
    }

    async fn reset(&mut self, id: ServerId, address: &str) -> CliResult<()> {
        if let Err(err) = self.client.reboot_server(id, RebootMethod::Hard).await {
            self.transition(RescueState::Failed);
            return Err(CliError::robot(err, format!("resetting {address}")));
        }
        Ok(())
    }

    async fn wait_for_signal(&mut self, id: ServerId, patience: Duration) -> CliResult<bool> {
        let deadline = Instant::now() + patience;
        loop {
            match self.client.poll_rescue_ready(id).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) if err.is_transport() => {
                    debug!(error = %err, "readiness poll failed; treating as not ready");
                }
                Err(err) => {
                    self.transition(RescueState::Failed);
                    return Err(CliError::robot(err, "polling rescue status"));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            sleep(self.policy.poll_interval.min(deadline - now)).await;
        }
    }

    fn transition(&mut self, next: RescueState) {
        debug!(from = ?self.state, to = ?next, "rescue state change");
        self.state = next;
    }
}

fn activation_error(error: RobotError, request: &RescueRequest, address: &str) -> CliError {
    if !request.authorized_keys.is_empty() && error.is_unknown_key() {
        CliError::configuration(format!(
            "the Robot webservice does not know the SSH key fingerprint(s) {}: {error}",
            request.authorized_keys.join(", ")
        ))
    } else {
        CliError::robot(error, format!("activating the rescue system on {address}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robotctl_test_support::{FakeRobot, RobotCall, sample_server};

    const FAST: RescuePolicy = RescuePolicy {
        poll_interval: Duration::from_millis(1),
    };

    fn request(patience: Duration, manual: bool) -> RescueRequest {
        RescueRequest {
            server: sample_server(7, "1.2.3.4", "web"),
            patience,
            manual,
            authorized_keys: Vec::new(),
        }
    }

    #[tokio::test]
    async fn confirms_rescue_after_one_reset() -> CliResult<()> {
        let robot = FakeRobot::new()
            .with_server(sample_server(7, "1.2.3.4", "web"))
            .with_rescue_ready_after(3);
        let mut orchestrator = RescueOrchestrator::new(&robot, FAST);

        let outcome = orchestrator
            .activate(&request(Duration::from_secs(5), false))
            .await?;

        let RescueOutcome::Ready(credentials) = outcome else {
            panic!("expected a confirmed rescue system");
        };
        assert_eq!(credentials.password.as_deref(), Some("rescue-7"));
        assert_eq!(orchestrator.state(), RescueState::RescueConfirmed);
        assert_eq!(robot.reboots(), vec![(7, RebootMethod::Hard)]);
        assert_eq!(robot.polls(), 3);

        let calls = robot.calls();
        assert_eq!(calls[0], RobotCall::ActivateRescue(7, Vec::new()));
        assert_eq!(calls[1], RobotCall::Reboot(7, RebootMethod::Hard));
        Ok(())
    }

    #[tokio::test]
    async fn resets_exactly_twice_before_failing() {
        let robot = FakeRobot::new().with_server(sample_server(7, "1.2.3.4", "web"));
        let mut orchestrator = RescueOrchestrator::new(&robot, FAST);

        let err = orchestrator
            .activate(&request(Duration::ZERO, false))
            .await
            .expect_err("rescue should time out");

        assert!(matches!(err, CliError::Domain(_)));
        assert!(err.display_message().contains("2 resets"));
        assert_eq!(orchestrator.state(), RescueState::Failed);
        assert_eq!(robot.reboots().len(), 2);
    }

    #[tokio::test]
    async fn second_window_can_still_succeed() -> CliResult<()> {
        let robot = FakeRobot::new()
            .with_server(sample_server(7, "1.2.3.4", "web"))
            .with_rescue_ready_after(2);
        let mut orchestrator = RescueOrchestrator::new(&robot, FAST);

        let outcome = orchestrator.activate(&request(Duration::ZERO, false)).await?;

        let RescueOutcome::Ready(credentials) = outcome else {
            panic!("expected a confirmed rescue system");
        };
        assert_eq!(credentials.password.as_deref(), Some("rescue-7-2"));
        assert!(robot.booted_rescue());
        assert_eq!(robot.reboots().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn retry_rearms_rescue_before_the_second_reset() -> CliResult<()> {
        // First window too short for the rescue system to come up; the
        // second reset must not boot the installed system.
        let robot = FakeRobot::new()
            .with_server(sample_server(7, "1.2.3.4", "web"))
            .with_rescue_ready_after(2);
        let mut orchestrator = RescueOrchestrator::new(&robot, FAST);

        let outcome = orchestrator.activate(&request(Duration::ZERO, false)).await?;

        assert!(matches!(outcome, RescueOutcome::Ready(_)));
        assert!(robot.booted_rescue(), "confirmed while running the installed system");
        let sequence: Vec<_> = robot
            .calls()
            .into_iter()
            .filter(|call| !matches!(call, RobotCall::PollRescueReady(_)))
            .collect();
        assert_eq!(
            sequence,
            vec![
                RobotCall::ActivateRescue(7, Vec::new()),
                RobotCall::Reboot(7, RebootMethod::Hard),
                RobotCall::ActivateRescue(7, Vec::new()),
                RobotCall::Reboot(7, RebootMethod::Hard),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn manual_mode_falls_back_without_a_second_reset() -> CliResult<()> {
        let robot = FakeRobot::new().with_server(sample_server(7, "1.2.3.4", "web"));
        let mut orchestrator = RescueOrchestrator::new(&robot, FAST);

        let outcome = orchestrator.activate(&request(Duration::ZERO, true)).await?;

        assert!(matches!(outcome, RescueOutcome::ManualFallback(_)));
        assert_eq!(orchestrator.state(), RescueState::ManualFallback);
        assert_eq!(robot.reboots().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn polling_outages_count_as_not_ready() {
        let robot = FakeRobot::new()
            .with_server(sample_server(7, "1.2.3.4", "web"))
            .with_unavailable_polls();
        let mut orchestrator = RescueOrchestrator::new(&robot, FAST);

        let err = orchestrator
            .activate(&request(Duration::from_millis(20), false))
            .await
            .expect_err("rescue should time out");

        assert!(matches!(err, CliError::Domain(_)));
        assert_eq!(robot.reboots().len(), 2);
        assert!(robot.polls() >= 2);
    }

    #[tokio::test]
    async fn unknown_key_is_a_configuration_error() {
        let robot = FakeRobot::new()
            .with_server(sample_server(7, "1.2.3.4", "web"))
            .with_rejected_keys();
        let mut orchestrator = RescueOrchestrator::new(&robot, FAST);
        let mut with_key = request(Duration::ZERO, false);
        with_key.authorized_keys = vec!["aa:bb".to_string()];

        let err = orchestrator
            .activate(&with_key)
            .await
            .expect_err("activation should be refused");

        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("aa:bb"));
        assert!(robot.reboots().is_empty());
    }

    #[tokio::test]
    async fn activation_failure_stops_before_any_reset() {
        let robot = FakeRobot::new();
        let mut orchestrator = RescueOrchestrator::new(&robot, FAST);

        let err = orchestrator
            .activate(&request(Duration::ZERO, false))
            .await
            .expect_err("unknown server");

        assert_eq!(err.exit_code(), 1);
        assert_eq!(orchestrator.state(), RescueState::Failed);
        assert!(robot.reboots().is_empty());
    }
}
