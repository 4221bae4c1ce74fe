//! Connection session state and the reconnect policy that drives it.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::SupervisorError;

/// Lifecycle states of one logical transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque pointer to credentials managed by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHandle(PathBuf);

impl CredentialHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &std::path::Path {
        &self.0
    }
}

/// Reconnection rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Upper bound on a single delay. `None` keeps the pure exponential curve.
    pub max_backoff: Option<Duration>,
    /// Close code that means the remote revoked our credentials.
    pub auth_failure_code: u16,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(5_000),
            max_backoff: None,
            auth_failure_code: 401,
        }
    }
}

impl ReconnectPolicy {
    /// `initial_backoff * 2^attempt`, saturating, then capped if a cap is set.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = 1u32
            .checked_shl(attempt)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .unwrap_or(Duration::MAX);
        match self.max_backoff {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

/// What the supervisor should do after a connection closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseDecision {
    Reconnect { attempt: u32, delay: Duration },
    Fail(SupervisorError),
}

/// One logical connection to the transport
#[derive(Debug, Clone)]
pub struct Session {
    state: ConnectionState,
    attempts: u32,
    credentials: CredentialHandle,
}

impl Session {
    pub fn new(credentials: CredentialHandle) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            credentials,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn credentials(&self) -> &CredentialHandle {
        &self.credentials
    }

    /// DISCONNECTED or RECONNECTING → CONNECTING
    pub fn begin_connect(&mut self) {
        self.transition(ConnectionState::Connecting);
    }

    /// Open event received. Clears the attempt counter.
    pub fn on_open(&mut self) {
        self.transition(ConnectionState::Connected);
        self.attempts = 0;
    }

    /// Close event (or failed connect) received; decide between reconnect and give up.
    ///
    /// The delay is computed from the attempt count before it is bumped, so the
    /// first reconnect waits exactly `initial_backoff`.
    pub fn on_close(&mut self, code: Option<u16>, policy: &ReconnectPolicy) -> CloseDecision {
        self.transition(ConnectionState::Closing);

        if let Some(code) = code.filter(|c| *c == policy.auth_failure_code) {
            self.transition(ConnectionState::Failed);
            return CloseDecision::Fail(SupervisorError::AuthRejected { code });
        }

        if self.attempts >= policy.max_attempts {
            self.transition(ConnectionState::Failed);
            return CloseDecision::Fail(SupervisorError::RetriesExhausted {
                attempts: self.attempts,
            });
        }

        let delay = policy.delay_for(self.attempts);
        self.attempts += 1;
        self.transition(ConnectionState::Reconnecting);
        CloseDecision::Reconnect {
            attempt: self.attempts,
            delay,
        }
    }

    fn transition(&mut self, to: ConnectionState) {
        tracing::info!(from = %self.state, to = %to, attempts = self.attempts, "session state change");
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(CredentialHandle::new("auth"))
    }

    #[test]
    fn delay_doubles_from_initial_backoff() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (0..5).map(|a| policy.delay_for(a).as_millis()).collect();
        assert_eq!(delays, vec![5_000, 10_000, 20_000, 40_000, 80_000]);
    }

    #[test]
    fn delay_saturates_and_respects_cap() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(64), Duration::MAX);

        let capped = ReconnectPolicy {
            max_backoff: Some(Duration::from_secs(30)),
            ..ReconnectPolicy::default()
        };
        assert_eq!(capped.delay_for(3), Duration::from_secs(30));
        assert_eq!(capped.delay_for(1), Duration::from_secs(10));
    }

    #[test]
    fn sixth_consecutive_close_fails() {
        let policy = ReconnectPolicy::default();
        let mut session = session();
        let mut delays = Vec::new();

        for _ in 0..5 {
            session.begin_connect();
            match session.on_close(None, &policy) {
                CloseDecision::Reconnect { delay, .. } => delays.push(delay.as_millis()),
                other => panic!("expected reconnect, got {other:?}"),
            }
            assert_eq!(session.state(), ConnectionState::Reconnecting);
        }
        assert_eq!(delays, vec![5_000, 10_000, 20_000, 40_000, 80_000]);

        session.begin_connect();
        assert_eq!(
            session.on_close(None, &policy),
            CloseDecision::Fail(SupervisorError::RetriesExhausted { attempts: 5 })
        );
        assert_eq!(session.state(), ConnectionState::Failed);
    }

    #[test]
    fn auth_failure_never_reconnects() {
        let policy = ReconnectPolicy::default();
        let mut session = session();
        session.begin_connect();
        session.on_open();
        assert_eq!(
            session.on_close(Some(401), &policy),
            CloseDecision::Fail(SupervisorError::AuthRejected { code: 401 })
        );
        assert_eq!(session.state(), ConnectionState::Failed);
    }

    #[test]
    fn open_resets_attempts() {
        let policy = ReconnectPolicy::default();
        let mut session = session();
        session.begin_connect();
        session.on_close(Some(500), &policy);
        session.begin_connect();
        session.on_close(None, &policy);
        assert_eq!(session.attempts(), 2);

        session.begin_connect();
        session.on_open();
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.state(), ConnectionState::Connected);

        match session.on_close(Some(428), &policy) {
            CloseDecision::Reconnect { attempt, delay } => {
                assert_eq!(attempt, 1);
                assert_eq!(delay, Duration::from_millis(5_000));
            }
            other => panic!("expected reconnect, got {other:?}"),
        }
    }
}
