pub mod filter;
pub mod search;

use search::{PageRequest, PageResponse, SearchError, SessionId};

#[tarpc::service]
pub trait FlightSearch {
    /// Heartbeat
    async fn ping() -> String;

    /// Start a progressive search; results are produced in the background
    async fn create_session(query: String) -> Result<SessionId, SearchError>;

    /// Get one page of the results produced so far, after applying the filters
    async fn fetch_page(req: PageRequest) -> Result<PageResponse, SearchError>;

    /// Stop the background search and free the session
    async fn close_session(session_id: SessionId) -> bool;
}
