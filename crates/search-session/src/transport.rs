use crate::error::TransportError;
use async_trait::async_trait;
use rpc::search::{PageRequest, PageResponse, SessionId};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// The remote search service as seen by a session.
///
/// Calls are cancelled by dropping their future; implementations must not keep doing
/// work on behalf of a dropped call that could be observed by the session.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn create(&self, query: &str) -> Result<SessionId, TransportError>;

    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse, TransportError>;
}

/// How a cancellable transport call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Success(T),
    /// The call was superseded; carries no information and is never surfaced
    Aborted,
    Failure(TransportError),
}

impl<T> From<Result<T, TransportError>> for CallOutcome<T> {
    fn from(result: Result<T, TransportError>) -> Self {
        match result {
            Ok(value) => CallOutcome::Success(value),
            Err(e) => CallOutcome::Failure(e),
        }
    }
}

/// Drive `call` until it finishes or `token` is cancelled.
///
/// Cancellation is checked first on every poll, so a call that completes in the same
/// wake-up as its cancellation still reports `Aborted`.
pub async fn run_cancellable<T, F>(token: &CancellationToken, call: F) -> CallOutcome<T>
where
    F: Future<Output = Result<T, TransportError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => CallOutcome::Aborted,
        result = call => result.into(),
    }
}
