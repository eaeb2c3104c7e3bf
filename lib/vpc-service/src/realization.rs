//! Realization polling with rollback of half-created VPCs

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vpc_api::backend::realization::aggregate;
use vpc_api::backend::{RealizationResult, RealizationState, VpcInfo};
use vpc_backend::{BackendClient, BackendError};
use vpc_core::{RetryPolicy, Retryable};

use crate::{Result, VpcError};

/// Outcome of a single poll that did not reach `Realized`
#[derive(Debug)]
enum PollError {
    Pending,
    Failed(String),
    Backend(BackendError),
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Pending => write!(f, "not realized yet"),
            PollError::Failed(msg) => write!(f, "realization error: {}", msg),
            PollError::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl Retryable for PollError {
    fn is_transient(&self) -> bool {
        matches!(self, PollError::Backend(e) if e.is_transient())
    }

    fn is_pending(&self) -> bool {
        matches!(self, PollError::Pending)
    }
}

/// RealizationChecker polls realized state until targets settle
pub struct RealizationChecker {
    client: Arc<dyn BackendClient>,
    policy: RetryPolicy,
}

impl RealizationChecker {
    pub fn new(client: Arc<dyn BackendClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Poll `path` until realized, errored, or out of attempts
    pub async fn check(&self, path: &str) -> Result<RealizationResult> {
        let mut attempts = 0;
        let outcome = self
            .policy
            .run(|attempt| {
                attempts = attempt + 1;
                let client = self.client.clone();
                let path = path.to_string();
                async move { poll_once(client.as_ref(), &path).await }
            })
            .await;

        match outcome {
            Ok(()) => {
                debug!(path, attempts, "realized");
                Ok(RealizationResult {
                    path: path.to_string(),
                    state: RealizationState::Realized,
                    attempts,
                })
            }
            Err(PollError::Failed(message)) => Err(VpcError::Realization {
                path: path.to_string(),
                message,
            }),
            Err(PollError::Pending) => Err(VpcError::RealizationTimeout {
                path: path.to_string(),
                attempts,
            }),
            Err(PollError::Backend(e)) => Err(e.into()),
        }
    }

    /// Check `targets` in order, stopping at the first failure. A terminal
    /// realization error deletes `rollback` (when given) before returning.
    pub async fn check_sequence(
        &self,
        targets: &[String],
        rollback: Option<&VpcInfo>,
    ) -> Result<Vec<RealizationResult>> {
        let mut results = Vec::with_capacity(targets.len());
        for path in targets {
            match self.check(path).await {
                Ok(result) => results.push(result),
                Err(cause @ VpcError::Realization { .. }) => {
                    warn!(path = %path, "realization failed: {}", cause);
                    return Err(match rollback {
                        Some(info) => self.rollback(info, cause).await,
                        None => cause,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }

    /// Delete the parent VPC so the next attempt starts clean. A failed
    /// delete is reported together with the original cause.
    async fn rollback(&self, info: &VpcInfo, cause: VpcError) -> VpcError {
        let path = info.path();
        match self.client.delete_vpc(info, true).await {
            Ok(()) => {
                info!(path = %path, "rolled back VPC after realization failure");
                cause
            }
            Err(rollback) => {
                error!(path = %path, "rollback failed: {}", rollback);
                VpcError::RollbackFailed {
                    path,
                    cause: Box::new(cause),
                    rollback,
                }
            }
        }
    }
}

async fn poll_once(client: &dyn BackendClient, path: &str) -> std::result::Result<(), PollError> {
    let entities = client
        .realized_entities(path)
        .await
        .map_err(PollError::Backend)?;
    match aggregate(&entities) {
        RealizationState::Realized => Ok(()),
        RealizationState::Error => {
            let message = entities
                .iter()
                .filter(|e| e.realization_state() == RealizationState::Error)
                .map(|e| e.alarm_message())
                .find(|m| !m.is_empty())
                .unwrap_or_else(|| "entity in ERROR state".to_string());
            Err(PollError::Failed(message))
        }
        RealizationState::Unknown => Err(PollError::Pending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{entities, fast_poll, unavailable};
    use mockall::predicate::eq;
    use vpc_backend::MockBackendClient;

    const VPC_PATH: &str = "/orgs/default/projects/proj/vpcs/ns1_aa";
    const LBS_PATH: &str = "/orgs/default/projects/proj/vpcs/ns1_aa/vpc-lbs/default";

    fn checker(client: MockBackendClient) -> RealizationChecker {
        RealizationChecker::new(Arc::new(client), fast_poll())
    }

    #[tokio::test]
    async fn test_check_waits_for_realized() {
        let mut client = MockBackendClient::new();
        let mut polls = 0;
        client.expect_realized_entities().times(3).returning(move |_| {
            polls += 1;
            if polls < 3 {
                Ok(entities("IN_PROGRESS"))
            } else {
                Ok(entities("REALIZED"))
            }
        });

        let result = checker(client).check(VPC_PATH).await.unwrap();
        assert_eq!(result.state, RealizationState::Realized);
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let mut client = MockBackendClient::new();
        let mut polls = 0;
        client.expect_realized_entities().times(2).returning(move |_| {
            polls += 1;
            if polls == 1 {
                Err(unavailable())
            } else {
                Ok(entities("REALIZED"))
            }
        });

        assert!(checker(client).check(VPC_PATH).await.is_ok());
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_timeout() {
        let mut client = MockBackendClient::new();
        client
            .expect_realized_entities()
            .returning(|_| Ok(entities("IN_PROGRESS")));

        let err = checker(client).check(VPC_PATH).await.unwrap_err();
        assert!(matches!(err, VpcError::RealizationTimeout { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_error_state_rolls_back_once() {
        let mut client = MockBackendClient::new();
        client
            .expect_realized_entities()
            .withf(|path| path == VPC_PATH)
            .times(1)
            .returning(|_| Ok(entities("ERROR")));
        let info = VpcInfo::parse(VPC_PATH).unwrap();
        client
            .expect_delete_vpc()
            .with(eq(info.clone()), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let err = checker(client)
            .check_sequence(&[VPC_PATH.to_string(), LBS_PATH.to_string()], Some(&info))
            .await
            .unwrap_err();
        assert!(matches!(err, VpcError::Realization { .. }));
    }

    #[tokio::test]
    async fn test_failed_rollback_is_double_fault() {
        let mut client = MockBackendClient::new();
        client
            .expect_realized_entities()
            .withf(|path| path == VPC_PATH)
            .returning(|_| Ok(entities("REALIZED")));
        client
            .expect_realized_entities()
            .withf(|path| path == LBS_PATH)
            .returning(|_| Ok(entities("ERROR")));
        client
            .expect_delete_vpc()
            .times(1)
            .returning(|_, _| Err(unavailable()));

        let info = VpcInfo::parse(VPC_PATH).unwrap();
        let err = checker(client)
            .check_sequence(&[VPC_PATH.to_string(), LBS_PATH.to_string()], Some(&info))
            .await
            .unwrap_err();
        match err {
            VpcError::RollbackFailed { path, cause, .. } => {
                assert_eq!(path, VPC_PATH);
                assert!(matches!(*cause, VpcError::Realization { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_does_not_roll_back() {
        let mut client = MockBackendClient::new();
        client
            .expect_realized_entities()
            .returning(|_| Ok(entities("IN_PROGRESS")));
        client.expect_delete_vpc().times(0);

        let info = VpcInfo::parse(VPC_PATH).unwrap();
        let err = checker(client)
            .check_sequence(&[VPC_PATH.to_string()], Some(&info))
            .await
            .unwrap_err();
        assert!(matches!(err, VpcError::RealizationTimeout { .. }));
    }
}
