//! Progressive search sessions.
//!
//! Every session has a background producer that keeps appending offers until the
//! configured number of rounds is done. Pages are cut from whatever was produced so
//! far, after the request's filters are applied.

use crate::catalog::OfferGenerator;
use crate::config::SearchSettings;
use rpc::search::{FlightOffer, PageRequest, PageResponse, SearchError, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

struct SearchSession {
    query: String,
    offers: Vec<FlightOffer>,
    rounds_done: u32,
    batches: u32,
    /// Cleared once the producer finishes
    producer: Option<JoinHandle<()>>,
    last_accessed: Instant,
}

impl SearchSession {
    fn is_complete(&self) -> bool {
        self.rounds_done >= self.batches
    }

    fn progress(&self) -> f64 {
        if self.batches == 0 {
            return 1.0;
        }
        (f64::from(self.rounds_done) / f64::from(self.batches)).min(1.0)
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        if let Some(handle) = self.producer.take() {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, SearchSession>>>,
    session_timeout: Duration,
    settings: SearchSettings,
}

impl SessionManager {
    pub fn new(session_timeout: Duration, settings: SearchSettings) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_timeout,
            settings,
        }
    }

    /// Register a session and start producing its offers in the background. Must be
    /// called from within a tokio runtime.
    pub fn create_session(&self, query: &str) -> Result<SessionId, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        self.cleanup_expired_sessions();

        let session_id = Uuid::new_v4();
        self.write().insert(
            session_id,
            SearchSession {
                query: query.to_string(),
                offers: Vec::new(),
                rounds_done: 0,
                batches: self.settings.batches,
                producer: None,
                last_accessed: Instant::now(),
            },
        );

        let producer = tokio::spawn(
            self.clone()
                .produce(session_id, OfferGenerator::for_query(query)),
        );
        match self.write().get_mut(&session_id) {
            Some(session) if !session.is_complete() => session.producer = Some(producer),
            Some(_) => {}
            None => producer.abort(),
        }

        info!(%session_id, query, "search session created");
        Ok(session_id)
    }

    async fn produce(self, session_id: SessionId, mut generator: OfferGenerator) {
        let interval = self.settings.batch_interval();
        for round in 1..=self.settings.batches {
            tokio::time::sleep(interval).await;
            let batch = generator.next_batch(self.settings.batch_size);
            if !self.append_batch(session_id, batch) {
                debug!(%session_id, round, "session gone, producer stopped");
                return;
            }
        }
        info!(%session_id, "search complete");
    }

    /// Returns `false` when the session no longer exists.
    fn append_batch(&self, session_id: SessionId, batch: Vec<FlightOffer>) -> bool {
        let mut sessions = self.write();
        let Some(session) = sessions.get_mut(&session_id) else {
            return false;
        };

        session.offers.extend(batch);
        session.rounds_done += 1;
        if session.is_complete() {
            // Finished on its own, nothing left to abort
            drop(session.producer.take());
        }
        debug!(
            %session_id,
            found = session.offers.len(),
            round = session.rounds_done,
            "batch produced"
        );
        true
    }

    pub fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, SearchError> {
        if request.page == 0 {
            return Err(SearchError::InvalidPage(request.page));
        }

        let mut sessions = self.write();
        let expired = sessions
            .get(&request.session_id)
            .is_some_and(|s| s.last_accessed.elapsed() >= self.session_timeout);
        if expired {
            sessions.remove(&request.session_id);
        }
        let session = sessions
            .get_mut(&request.session_id)
            .ok_or(SearchError::SessionNotFound(request.session_id))?;
        session.last_accessed = Instant::now();

        let matching: Vec<&FlightOffer> = session
            .offers
            .iter()
            .filter(|offer| request.filters.matches(offer))
            .collect();
        let limit = request.limit as usize;
        let offset = (request.page as usize - 1).saturating_mul(limit);
        let results: Vec<FlightOffer> = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|offer| (*offer).clone())
            .collect();
        let has_more = !session.is_complete() || offset + results.len() < matching.len();

        debug!(
            session_id = %request.session_id,
            page = request.page,
            filters = %request.filters,
            returned = results.len(),
            "page served"
        );
        Ok(PageResponse {
            results,
            progress: session.progress(),
            has_more,
            total: matching.len() as u64,
        })
    }

    /// Stop the producer and forget the session. Returns whether it existed.
    pub fn close_session(&self, session_id: SessionId) -> bool {
        match self.write().remove(&session_id) {
            Some(session) => {
                info!(%session_id, query = %session.query, "search session closed");
                true
            }
            None => false,
        }
    }

    pub fn cleanup_expired_sessions(&self) {
        let timeout = self.session_timeout;
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_accessed.elapsed() < timeout);

        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "expired search sessions dropped");
        }
    }

    pub fn active_sessions_count(&self) -> usize {
        self.read().len()
    }

    /// Periodically drop expired sessions. Never returns.
    pub async fn reap_expired(self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            self.cleanup_expired_sessions();
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, SearchSession>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, SearchSession>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc::search::SearchFilters;

    const INTERVAL: Duration = Duration::from_millis(100);

    fn manager(batches: u32, batch_size: u32) -> SessionManager {
        SessionManager::new(
            Duration::from_secs(60),
            SearchSettings {
                batches,
                batch_size,
                batch_interval_ms: INTERVAL.as_millis() as u64,
            },
        )
    }

    fn request(session_id: SessionId, page: u32, limit: u32) -> PageRequest {
        PageRequest {
            session_id,
            page,
            limit,
            filters: SearchFilters::default(),
        }
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let manager = manager(3, 4);
        assert_eq!(manager.create_session("  "), Err(SearchError::EmptyQuery));
        assert_eq!(manager.active_sessions_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_arrive_in_batches() {
        let manager = manager(3, 4);
        let session_id = manager.create_session("SFO to JFK").unwrap();

        let page = manager.fetch_page(&request(session_id, 1, 10)).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.progress, 0.0);
        assert!(page.has_more);

        tokio::time::sleep(INTERVAL + INTERVAL / 2).await;
        let page = manager.fetch_page(&request(session_id, 1, 10)).unwrap();
        assert_eq!(page.results.len(), 4);
        assert_eq!(page.total, 4);
        assert!((page.progress - 1.0 / 3.0).abs() < f64::EPSILON);
        assert!(page.has_more);

        tokio::time::sleep(INTERVAL * 3).await;
        let page = manager.fetch_page(&request(session_id, 1, 10)).unwrap();
        assert_eq!(page.results.len(), 10);
        assert_eq!(page.total, 12);
        assert_eq!(page.progress, 1.0);
        assert!(page.has_more);

        let last = manager.fetch_page(&request(session_id, 2, 10)).unwrap();
        assert_eq!(last.results.len(), 2);
        assert!(!last.has_more);
        assert_eq!(last.results[0].id, "SFOJFK-00011");
    }

    #[tokio::test(start_paused = true)]
    async fn test_filters_apply_before_paging() {
        let manager = manager(4, 25);
        let session_id = manager.create_session("NYC to LAX").unwrap();
        tokio::time::sleep(INTERVAL * 5).await;

        let mut req = request(session_id, 1, 500);
        req.filters = SearchFilters::default().with_max_stops(0).with_max_price(400);
        let page = manager.fetch_page(&req).unwrap();

        assert!(!page.results.is_empty());
        assert!(page.results.iter().all(|o| o.stops == 0 && o.price <= 400));
        assert_eq!(page.total, page.results.len() as u64);
        assert!(!page.has_more);

        let everything = manager.fetch_page(&request(session_id, 1, 500)).unwrap();
        assert_eq!(everything.total, 100);
        assert!(page.total < everything.total);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_zero_is_invalid() {
        let manager = manager(1, 1);
        let session_id = manager.create_session("NYC to LAX").unwrap();
        assert_eq!(
            manager.fetch_page(&request(session_id, 0, 10)),
            Err(SearchError::InvalidPage(0))
        );
    }

    #[test]
    fn test_unknown_session() {
        let manager = manager(1, 1);
        let unknown = Uuid::new_v4();
        assert_eq!(
            manager.fetch_page(&request(unknown, 1, 10)),
            Err(SearchError::SessionNotFound(unknown))
        );
        assert!(!manager.close_session(unknown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_session_stops_producer() {
        let manager = manager(5, 2);
        let session_id = manager.create_session("NYC to LAX").unwrap();
        tokio::time::sleep(INTERVAL + INTERVAL / 2).await;

        assert!(manager.close_session(session_id));
        assert_eq!(
            manager.fetch_page(&request(session_id, 1, 10)),
            Err(SearchError::SessionNotFound(session_id))
        );
        assert!(!manager.close_session(session_id));
        assert_eq!(manager.active_sessions_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let manager = SessionManager::new(
            Duration::from_secs(1),
            SearchSettings {
                batches: 1,
                batch_size: 1,
                batch_interval_ms: 10,
            },
        );
        let stale = manager.create_session("NYC to LAX").unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            manager.fetch_page(&request(stale, 1, 10)),
            Err(SearchError::SessionNotFound(stale))
        );

        let other = manager.create_session("SFO to JFK").unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        manager.cleanup_expired_sessions();
        assert_eq!(manager.active_sessions_count(), 0);
        assert!(!manager.close_session(other));
    }
}
