/*!
 * Session establishment, liveness checks and reconnection
 *
 * `ConnectionManager` owns everything needed to open a session against the
 * archive host. Every remote operation in the pipeline goes through
 * [`ConnectionManager::with_session`], which probes the session first,
 * replaces it if the peer has gone away, and retries transient failures
 * under a caller-supplied policy.
 */

use std::thread;

use harvest_core_resilience::{RetryError, RetryPolicy};
use tracing::{debug, info, warn};

use crate::error::{HarvestError, Result};
use crate::remote::{Connector, RemoteSession, ROOT};

pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    host: String,
    policy: RetryPolicy,
}

impl ConnectionManager {
    /// `policy` bounds every (re)connect
    pub fn new(connector: Box<dyn Connector>, host: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            connector,
            host: host.into(),
            policy,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Open a fresh session positioned at the root.
    ///
    /// Fails with `RetriesExhausted` once the connect budget is spent.
    pub fn connect(&self) -> Result<RemoteSession> {
        let operation = format!("connect to {}", self.host);
        let conn = self.policy.run(&operation, |attempt| {
            debug!(host = %self.host, attempt, "opening session");
            self.connector.open(&self.host)
        })?;
        info!(host = %self.host, "connected");
        Ok(RemoteSession::new(conn, self.host.clone()))
    }

    /// Return `session` if it answers a `NOOP`, otherwise a replacement
    /// moved to the same working path.
    pub fn ensure_alive(&self, mut session: RemoteSession) -> Result<RemoteSession> {
        if session.probe() {
            return Ok(session);
        }

        let cwd = session.cwd().to_string();
        warn!(host = %self.host, path = %cwd, "session lost, reconnecting");
        session.close();

        let mut fresh = self.connect()?;
        if cwd != ROOT {
            match self
                .policy
                .run("restore working directory", |_| fresh.change_dir(&cwd))
            {
                Ok(()) => debug!(path = %cwd, "working directory restored"),
                Err(RetryError::Permanent { error, .. }) => {
                    warn!(path = %cwd, %error, "could not restore working directory, continuing at root");
                }
                Err(exhausted) => return Err(exhausted.into()),
            }
        }
        Ok(fresh)
    }

    /// Run `op` against a live session, retrying transient failures.
    ///
    /// The outer `Result` fails only when no usable session is left (a
    /// reconnect ran out of attempts). The inner one carries the operation's
    /// own verdict: its value, its first permanent error, or
    /// `RetriesExhausted` once `policy` is spent.
    pub fn with_session<T, F>(
        &self,
        mut session: RemoteSession,
        policy: &RetryPolicy,
        operation: &str,
        mut op: F,
    ) -> Result<(RemoteSession, Result<T>)>
    where
        F: FnMut(&mut RemoteSession) -> Result<T>,
    {
        let budget = policy.attempts();
        let mut attempt = 1;

        loop {
            session = self.ensure_alive(session)?;

            match op(&mut session) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "succeeded after retry");
                    }
                    return Ok((session, Ok(value)));
                }
                Err(error) if !error.is_transient() => {
                    return Ok((session, Err(error)));
                }
                Err(error) => {
                    warn!(operation, attempt, max_attempts = budget, %error, "attempt failed");
                    if !policy.should_retry(attempt) {
                        let exhausted = HarvestError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            last: error.to_string(),
                        };
                        return Ok((session, Err(exhausted)));
                    }
                    let delay = policy.delay_after(attempt);
                    if !delay.is_zero() {
                        debug!(operation, ?delay, "waiting before retry");
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("host", &self.host)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_FATAL;
    use crate::remote::mock::MockHost;
    use std::io;
    use std::time::Duration;

    fn manager(host: &MockHost, attempts: u32) -> ConnectionManager {
        ConnectionManager::new(
            Box::new(host.connector()),
            "ftp.example.org",
            RetryPolicy::fixed(attempts, Duration::ZERO),
        )
    }

    #[test]
    fn test_connect_retries_refusals() {
        let host = MockHost::new();
        host.fail_connects(2);

        let session = manager(&host, 3).connect().unwrap();
        assert_eq!(session.cwd(), "/");
        assert_eq!(session.host(), "ftp.example.org");
        assert_eq!(host.connects(), 1);
    }

    #[test]
    fn test_connect_exhaustion_is_fatal() {
        let host = MockHost::new();
        host.fail_connects(3);

        let err = manager(&host, 3).connect().unwrap_err();
        assert!(matches!(
            err,
            HarvestError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(err.exit_code(), EXIT_FATAL);
    }

    #[test]
    fn test_live_session_is_kept() {
        let host = MockHost::new();
        let manager = manager(&host, 3);
        let session = manager.connect().unwrap();

        let session = manager.ensure_alive(session).unwrap();
        assert!(session.is_alive());
        assert_eq!(host.connects(), 1);
        assert_eq!(host.noops(), 1);
    }

    #[test]
    fn test_reconnect_restores_working_directory() {
        let host = MockHost::new();
        host.add_dir("/tsg_sa/WG1_Serv");
        let manager = manager(&host, 3);

        let mut session = manager.connect().unwrap();
        session.change_dir("/tsg_sa/WG1_Serv").unwrap();
        host.drop_connections();

        let session = manager.ensure_alive(session).unwrap();
        assert_eq!(host.connects(), 2);
        assert_eq!(session.cwd(), "/tsg_sa/WG1_Serv");
        assert!(session.is_alive());
    }

    #[test]
    fn test_reconnect_exhaustion_propagates() {
        let host = MockHost::new();
        let manager = manager(&host, 2);
        let session = manager.connect().unwrap();

        host.drop_connections();
        host.fail_connects(2);

        let err = manager.ensure_alive(session).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_with_session_retries_transient_errors() {
        let host = MockHost::new();
        let manager = manager(&host, 3);
        let session = manager.connect().unwrap();
        let policy = RetryPolicy::fixed(3, Duration::ZERO);

        let mut calls = 0;
        let (_session, result) = manager
            .with_session(session, &policy, "list", |_| {
                calls += 1;
                if calls < 3 {
                    Err(HarvestError::Io(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "timed out",
                    )))
                } else {
                    Ok(calls)
                }
            })
            .unwrap();

        assert_eq!(result.unwrap(), 3);
        // One probe per attempt
        assert_eq!(host.noops(), 3);
    }

    #[test]
    fn test_with_session_returns_permanent_error_at_once() {
        let host = MockHost::new();
        let manager = manager(&host, 3);
        let session = manager.connect().unwrap();
        let policy = RetryPolicy::fixed(3, Duration::ZERO);

        let mut calls = 0;
        let (_session, result) = manager
            .with_session(session, &policy, "write", |_| {
                calls += 1;
                Err::<(), _>(HarvestError::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "read-only",
                )))
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(HarvestError::Io(_))));
    }

    #[test]
    fn test_with_session_reports_exhaustion_inside() {
        let host = MockHost::new();
        let manager = manager(&host, 3);
        let session = manager.connect().unwrap();
        let policy = RetryPolicy::fixed(2, Duration::ZERO);

        let (session, result) = manager
            .with_session(session, &policy, "retrieve S1-001.zip", |_| {
                Err::<(), _>(HarvestError::Protocol("425 can't open data connection".into()))
            })
            .unwrap();

        match result {
            Err(HarvestError::RetriesExhausted {
                operation,
                attempts,
                ..
            }) => {
                assert_eq!(operation, "retrieve S1-001.zip");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        session.close();
    }
}
