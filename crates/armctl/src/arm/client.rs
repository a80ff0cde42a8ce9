//! SQL server client contract and the asynchronous deletion handle

use super::error::ArmError;
use super::types::{DeclaredResource, DeleteResponse, ServerSnapshot};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Operations the controller and sweeper need from the control plane.
///
/// Implementations own transport, authentication and retries. Errors must be
/// classified so that [`ArmError::is_not_found`] is reliable: a transport
/// failure reported as "not found" would turn an outage into a passing
/// destroy check.
#[allow(async_fn_in_trait)] // Callers await in place; nothing spawns these futures
#[cfg_attr(test, mockall::automock)]
pub trait SqlServerOperations: Send + Sync {
    /// List every SQL server visible to the account, across all regions
    async fn list(&self) -> Result<Vec<ServerSnapshot>, ArmError>;

    /// Fetch the current state of one server
    async fn get(&self, resource_group: &str, name: &str) -> Result<ServerSnapshot, ArmError>;

    /// Start deleting a server. The returned handle must be drained with
    /// [`DeletionHandle::wait`].
    fn delete(
        &self,
        resource_group: &str,
        name: &str,
        cancel: CancellationToken,
    ) -> DeletionHandle;

    /// Create the server or converge an existing one toward `server`
    async fn create_or_update(&self, server: &DeclaredResource) -> Result<ServerSnapshot, ArmError>;
}

impl<T: SqlServerOperations> SqlServerOperations for Arc<T> {
    async fn list(&self) -> Result<Vec<ServerSnapshot>, ArmError> {
        (**self).list().await
    }

    async fn get(&self, resource_group: &str, name: &str) -> Result<ServerSnapshot, ArmError> {
        (**self).get(resource_group, name).await
    }

    fn delete(
        &self,
        resource_group: &str,
        name: &str,
        cancel: CancellationToken,
    ) -> DeletionHandle {
        (**self).delete(resource_group, name, cancel)
    }

    async fn create_or_update(&self, server: &DeclaredResource) -> Result<ServerSnapshot, ArmError> {
        (**self).create_or_update(server).await
    }
}

/// In-flight asynchronous delete.
///
/// Holds the cancellation token handed to the client plus two one-shot
/// channels: the final response and the terminal error. Both are drained by
/// [`wait`](Self::wait), which consumes the handle.
#[must_use = "a deletion handle must be drained with `wait`"]
#[derive(Debug)]
pub struct DeletionHandle {
    cancel: CancellationToken,
    response: oneshot::Receiver<DeleteResponse>,
    error: oneshot::Receiver<Option<ArmError>>,
}

/// Producer side of a [`DeletionHandle`], owned by the task doing the delete
#[derive(Debug)]
pub struct DeletionSender {
    response: oneshot::Sender<DeleteResponse>,
    error: oneshot::Sender<Option<ArmError>>,
}

/// Values observed on both channels of a drained handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub response: Option<DeleteResponse>,
    pub error: Option<ArmError>,
}

impl DeletionHandle {
    /// Create a connected sender/handle pair.
    pub fn channel(cancel: CancellationToken) -> (DeletionSender, DeletionHandle) {
        let (response_tx, response_rx) = oneshot::channel();
        let (error_tx, error_rx) = oneshot::channel();
        (
            DeletionSender {
                response: response_tx,
                error: error_tx,
            },
            DeletionHandle {
                cancel,
                response: response_rx,
                error: error_rx,
            },
        )
    }

    /// Handle whose delete already finished with `result`.
    pub fn ready(result: Result<DeleteResponse, ArmError>) -> Self {
        let (tx, handle) = Self::channel(CancellationToken::new());
        tx.finish(result);
        handle
    }

    /// The token the delete was issued with.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Receive from both channels. A channel closed without a value reads as
    /// `None`.
    pub async fn wait(self) -> DeletionOutcome {
        let response = self.response.await.ok();
        let error = self.error.await.ok().flatten();
        DeletionOutcome { response, error }
    }
}

impl DeletionSender {
    /// Publish the final result on both channels.
    ///
    /// Receivers that were already dropped are ignored: the remote side
    /// effect has happened either way.
    pub fn finish(self, result: Result<DeleteResponse, ArmError>) {
        match result {
            Ok(response) => {
                let _ = self.response.send(response);
                let _ = self.error.send(None);
            }
            Err(err) => {
                if let Some(status) = status_for_error(&err) {
                    let _ = self.response.send(DeleteResponse { status });
                }
                let _ = self.error.send(Some(err));
            }
        }
    }
}

fn status_for_error(err: &ArmError) -> Option<u16> {
    match err {
        ArmError::NotFound { .. } => Some(404),
        ArmError::Throttled => Some(429),
        ArmError::Conflict { .. } => Some(409),
        ArmError::Unauthorized { .. } => Some(403),
        ArmError::Transport { status, .. } => *status,
        ArmError::Cancelled => None,
    }
}

impl DeletionOutcome {
    /// Fold both channel values into a single result.
    ///
    /// Only a 2xx response with no error is success. A 404 on either side is
    /// reported as not found, and any other status is a transport failure.
    /// Two empty channels mean the delete task vanished without reporting,
    /// which is a transport failure too.
    pub fn into_result(self) -> Result<DeleteResponse, ArmError> {
        match (self.response, self.error) {
            (Some(response), None) if response.is_success() => Ok(response),
            (_, Some(err)) if err.is_not_found() => Err(err),
            (Some(response), _) if response.is_not_found() => {
                Err(ArmError::not_found("server", "delete returned 404"))
            }
            (_, Some(err)) => Err(err),
            (Some(response), None) => Err(ArmError::Transport {
                status: Some(response.status),
                code: None,
                message: "delete finished with a non-success status".to_string(),
            }),
            (None, None) => Err(ArmError::transport(
                "delete finished without reporting a response or an error",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_drains_both_channels() {
        let outcome = DeletionHandle::ready(Ok(DeleteResponse::OK)).wait().await;
        assert_eq!(outcome.response, Some(DeleteResponse::OK));
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.into_result(), Ok(DeleteResponse::OK));
    }

    #[tokio::test]
    async fn not_found_carries_404_response() {
        let outcome = DeletionHandle::ready(Err(ArmError::not_found("server", "srv")))
            .wait()
            .await;
        assert_eq!(outcome.response, Some(DeleteResponse::NOT_FOUND));
        assert!(outcome.into_result().unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn generic_error_with_404_response_reads_as_not_found() {
        let (tx, handle) = DeletionHandle::channel(CancellationToken::new());
        let _ = tx.response.send(DeleteResponse::NOT_FOUND);
        let _ = tx.error.send(Some(ArmError::transport("unexpected status")));
        assert!(handle.wait().await.into_result().unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn transport_error_propagates() {
        let err = ArmError::Transport {
            status: Some(500),
            code: None,
            message: "boom".into(),
        };
        let outcome = DeletionHandle::ready(Err(err.clone())).wait().await;
        assert_eq!(outcome.response, Some(DeleteResponse { status: 500 }));
        assert_eq!(outcome.into_result(), Err(err));
    }

    #[tokio::test]
    async fn server_error_response_without_error_is_a_failure() {
        let (tx, handle) = DeletionHandle::channel(CancellationToken::new());
        let _ = tx.response.send(DeleteResponse { status: 500 });
        let _ = tx.error.send(None);

        let err = handle.wait().await.into_result().unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(
            err,
            ArmError::Transport {
                status: Some(500),
                code: None,
                message: "delete finished with a non-success status".into(),
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn not_found_response_without_error_reads_as_not_found() {
        let (tx, handle) = DeletionHandle::channel(CancellationToken::new());
        let _ = tx.response.send(DeleteResponse::NOT_FOUND);
        let _ = tx.error.send(None);
        assert!(handle.wait().await.into_result().unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn accepted_response_is_success() {
        let outcome = DeletionHandle::ready(Ok(DeleteResponse { status: 202 })).wait().await;
        assert_eq!(outcome.into_result(), Ok(DeleteResponse { status: 202 }));
    }

    #[tokio::test]
    async fn dropped_sender_is_a_transport_error() {
        let (tx, handle) = DeletionHandle::channel(CancellationToken::new());
        drop(tx);
        let err = handle.wait().await.into_result().unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, ArmError::Transport { .. }));
    }

    #[tokio::test]
    async fn sender_on_another_task() {
        let cancel = CancellationToken::new();
        let (tx, handle) = DeletionHandle::channel(cancel.clone());
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            tx.finish(Ok(DeleteResponse::NO_CONTENT));
        });
        assert!(!handle.cancellation_token().is_cancelled());
        assert_eq!(handle.wait().await.into_result(), Ok(DeleteResponse::NO_CONTENT));
    }
}
