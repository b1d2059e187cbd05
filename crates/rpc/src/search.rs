use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::filter::SearchFilters;

pub type SessionId = Uuid;

/// A single bookable itinerary produced by the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    /// Stable across polls; clients de-duplicate on it
    pub id: String,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    /// Whole currency units
    pub price: u32,
    pub stops: u8,
    /// Minutes after midnight, local time of the origin
    pub departure_minute: u16,
    pub duration_minutes: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub session_id: SessionId,
    /// 1-based
    pub page: u32,
    pub limit: u32,
    #[serde(default)]
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub results: Vec<FlightOffer>,
    /// Fraction of the search done so far, 0.0 to 1.0
    pub progress: f64,
    pub has_more: bool,
    /// Number of matching results produced so far
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SearchError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("search session {0} does not exist or has expired")]
    SessionNotFound(SessionId),

    #[error("page numbers start at 1, got {0}")]
    InvalidPage(u32),
}
