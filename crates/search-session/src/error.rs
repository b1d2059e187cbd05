use rpc::search::SearchError;
use thiserror::Error;

/// Returned synchronously by the [`SearchSession`](crate::SearchSession) handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("search session has been shut down")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The call never produced a service answer (connection lost, deadline hit, ...)
    #[error("transport failure: {0}")]
    Rpc(String),

    /// The service answered with an error
    #[error(transparent)]
    Remote(#[from] SearchError),
}

/// Why a session ended up in `Failed`. Kept in the snapshot as `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFailure {
    #[error("could not start the search: {0}")]
    Initialization(#[source] TransportError),

    #[error("could not fetch page {page}: {source}")]
    Poll { page: u32, source: TransportError },
}
