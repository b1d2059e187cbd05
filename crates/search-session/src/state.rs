use crate::error::SessionFailure;
use rpc::search::{FlightOffer, PageResponse, SearchFilters, SessionId};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum SessionStatus {
    #[default]
    Idle,
    Initializing,
    Polling,
    Complete,
    Failed,
}

/// What observers of a session get to see.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Option<SessionId>,
    pub filters: SearchFilters,
    /// 1-based page cursor
    pub page: u32,
    pub results: Vec<FlightOffer>,
    /// 0.0 to 1.0
    pub progress: f64,
    pub has_more: bool,
    /// Matching results reported by the service
    pub total: u64,
    pub status: SessionStatus,
    pub last_error: Option<SessionFailure>,
    /// A transport call is outstanding
    pub in_flight: bool,
    /// An automatic poll is scheduled
    pub poll_armed: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        SessionState::default().snapshot(false, false)
    }
}

/// Session data, mutated only by the session actor.
///
/// An epoch starts at every `initialize` and every effective filter change; within
/// an epoch `progress` never decreases and `results` only grows past page 1.
#[derive(Debug)]
pub struct SessionState {
    session_id: Option<SessionId>,
    filters: SearchFilters,
    page: u32,
    results: Vec<FlightOffer>,
    seen: HashSet<String>,
    progress: f64,
    has_more: bool,
    total: u64,
    status: SessionStatus,
    last_error: Option<SessionFailure>,
    epoch: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session_id: None,
            filters: SearchFilters::default(),
            page: 1,
            results: Vec::new(),
            seen: HashSet::new(),
            progress: 0.0,
            has_more: false,
            total: 0,
            status: SessionStatus::Idle,
            last_error: None,
            epoch: 0,
        }
    }
}

impl SessionState {
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn results(&self) -> &[FlightOffer] {
        &self.results
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Fresh search: everything goes back to its initial value, including the filters
    /// and the session id.
    pub fn begin_search(&mut self) {
        let epoch = self.epoch + 1;
        *self = SessionState {
            has_more: true,
            status: SessionStatus::Initializing,
            epoch,
            ..SessionState::default()
        };
    }

    pub fn session_created(&mut self, session_id: SessionId) {
        self.session_id = Some(session_id);
        self.status = SessionStatus::Polling;
    }

    /// New filter set on an existing session.
    pub fn begin_filter_epoch(&mut self, filters: SearchFilters) {
        self.filters = filters;
        self.page = 1;
        self.clear_results();
        self.progress = 0.0;
        self.has_more = true;
        self.total = 0;
        self.status = SessionStatus::Polling;
        self.last_error = None;
        self.epoch += 1;
    }

    /// Move the cursor to the next page, returning it.
    pub fn advance_page(&mut self) -> u32 {
        self.page += 1;
        self.page
    }

    /// Merge one successful page. Page 1 replaces the held results, later pages are
    /// appended without repeating ids already held.
    pub fn apply_page(&mut self, page: u32, response: PageResponse) {
        if page <= 1 {
            self.clear_results();
        }
        for offer in response.results {
            if self.seen.insert(offer.id.clone()) {
                self.results.push(offer);
            }
        }

        let reported = if response.progress.is_nan() {
            0.0
        } else {
            response.progress.clamp(0.0, 1.0)
        };
        self.progress = self.progress.max(reported);
        self.has_more = response.has_more;
        self.total = response.total;
        self.status = if self.progress >= 1.0 {
            SessionStatus::Complete
        } else {
            SessionStatus::Polling
        };
    }

    /// Terminal failure for the epoch. Results stay visible.
    pub fn fail(&mut self, failure: SessionFailure) {
        self.status = SessionStatus::Failed;
        self.last_error = Some(failure);
    }

    /// Hard stop. Results stay visible, an earlier failure does not.
    pub fn stop(&mut self) {
        self.status = SessionStatus::Idle;
        self.last_error = None;
    }

    pub fn snapshot(&self, in_flight: bool, poll_armed: bool) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            filters: self.filters.clone(),
            page: self.page,
            results: self.results.clone(),
            progress: self.progress,
            has_more: self.has_more,
            total: self.total,
            status: self.status,
            last_error: self.last_error.clone(),
            in_flight,
            poll_armed,
        }
    }

    fn clear_results(&mut self) {
        self.results.clear();
        self.seen.clear();
    }
}
