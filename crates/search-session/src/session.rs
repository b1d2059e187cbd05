//! The session actor and its handle.
//!
//! Every session runs as one tokio task that owns the [`SessionState`], the
//! [`PollScheduler`] and the single active transport operation. The handle sends
//! intents over a channel; transport calls run in their own tasks and report back
//! through a second channel, tagged with the id of the operation that issued them.
//! Only the operation currently held in `active` may change state.

use crate::error::{SessionError, SessionFailure};
use crate::scheduler::{PollScheduler, Tick};
use crate::state::{SessionSnapshot, SessionState, SessionStatus};
use crate::transport::{CallOutcome, Transport, run_cancellable};
use crate::{DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL_MS};
use rpc::search::{PageRequest, PageResponse, SearchFilters, SessionId};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(test)]
mod mock;

/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub page_size: u32,
    /// Delay between an incomplete response and the next automatic poll
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug)]
enum Intent {
    Initialize(String),
    UpdateFilters(SearchFilters),
    LoadMore,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OperationId(u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

#[derive(Debug)]
enum Event {
    Created {
        op: OperationId,
        outcome: CallOutcome<SessionId>,
    },
    Fetched {
        op: OperationId,
        page: u32,
        outcome: CallOutcome<PageResponse>,
    },
    Tick(Tick),
}

struct ActiveOperation {
    id: OperationId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Handle to a running search session.
///
/// Intents are queued and applied in order by the session task; observe the effect
/// through [`snapshot`](Self::snapshot), [`subscribe`](Self::subscribe) or
/// [`wait_until`](Self::wait_until). Dropping the handle tears the session down.
pub struct SearchSession {
    intents: mpsc::UnboundedSender<Intent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

impl SearchSession {
    /// Start the session task. Must be called from within a tokio runtime.
    pub fn spawn<T: Transport>(transport: T, config: SessionConfig) -> Self {
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let actor = SessionActor {
            transport: Arc::new(transport),
            scheduler: PollScheduler::new(config.poll_interval),
            config,
            state: SessionState::default(),
            active: None,
            draining: None,
            next_op: 0,
            events_tx,
            snapshot_tx,
        };
        let task = tokio::spawn(actor.run(intents_rx, events_rx));

        Self {
            intents: intents_tx,
            snapshot: snapshot_rx,
            task,
        }
    }

    /// Start a new search, discarding the current one.
    pub fn initialize(&self, query: &str) -> Result<(), SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }
        self.send(Intent::Initialize(query.to_string()))
    }

    /// Restart polling from page 1 under `filters`. Ignored before a search has been
    /// created and when `filters` equals the current set.
    pub fn update_filters(&self, filters: SearchFilters) -> Result<(), SessionError> {
        self.send(Intent::UpdateFilters(filters))
    }

    /// Request the next page. Ignored unless the session is polling, idle on the wire
    /// and the service reported more results.
    pub fn load_more(&self) -> Result<(), SessionError> {
        self.send(Intent::LoadMore)
    }

    /// Stop all network activity and go idle, keeping the results.
    pub fn cancel(&self) -> Result<(), SessionError> {
        self.send(Intent::Cancel)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_until<F>(&self, mut predicate: F) -> Result<SessionSnapshot, SessionError>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Tear the session down and wait for its task to finish.
    pub async fn close(self) {
        let Self { intents, task, .. } = self;
        drop(intents);
        if let Err(e) = task.await {
            if e.is_panic() {
                warn!("search session task panicked: {e}");
            }
        }
    }

    fn send(&self, intent: Intent) -> Result<(), SessionError> {
        self.intents.send(intent).map_err(|_| SessionError::Closed)
    }
}

struct SessionActor<T> {
    transport: Arc<T>,
    config: SessionConfig,
    state: SessionState,
    scheduler: PollScheduler,
    active: Option<ActiveOperation>,
    /// Task of an operation cancelled without a successor; the next operation waits on it
    draining: Option<JoinHandle<()>>,
    next_op: u64,
    events_tx: mpsc::UnboundedSender<Event>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<T: Transport> SessionActor<T> {
    async fn run(
        mut self,
        mut intents: mpsc::UnboundedReceiver<Intent>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                biased;
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
            self.publish();
        }

        self.shutdown();
        debug!("search session closed");
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Initialize(query) => self.initialize(query),
            Intent::UpdateFilters(filters) => self.update_filters(filters),
            Intent::LoadMore => self.load_more(),
            Intent::Cancel => self.cancel(),
        }
    }

    fn initialize(&mut self, query: String) {
        let superseded = self.abort_active();
        self.scheduler.disarm();
        self.state.begin_search();
        info!(%query, epoch = self.state.epoch(), "starting search");

        let transport = Arc::clone(&self.transport);
        self.spawn_operation(superseded, move |op, token| async move {
            let outcome = run_cancellable(&token, transport.create(&query)).await;
            Event::Created { op, outcome }
        });
    }

    fn update_filters(&mut self, filters: SearchFilters) {
        if self.state.session_id().is_none() {
            debug!("filter change ignored: no search has been created yet");
            return;
        }
        if *self.state.filters() == filters {
            debug!(%filters, "filter change ignored: filters unchanged");
            return;
        }

        let superseded = self.abort_active();
        self.scheduler.disarm();
        info!(%filters, "filters changed, restarting from page 1");
        self.state.begin_filter_epoch(filters);
        self.start_fetch(superseded);
    }

    fn load_more(&mut self) {
        if !self.state.has_more()
            || self.state.status() != SessionStatus::Polling
            || self.active.is_some()
        {
            debug!(
                has_more = self.state.has_more(),
                status = %self.state.status(),
                in_flight = self.active.is_some(),
                "load more ignored"
            );
            return;
        }

        let page = self.state.advance_page();
        debug!(page, "loading next page");
        self.start_fetch(None);
    }

    fn cancel(&mut self) {
        if let Some(task) = self.abort_active() {
            self.draining = Some(task);
        }
        self.scheduler.disarm();
        self.state.stop();
        info!("search cancelled");
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Created { op, outcome } => {
                if !self.settle(op) {
                    return;
                }
                match outcome {
                    CallOutcome::Success(session_id) => {
                        info!(%session_id, "search session created");
                        self.state.session_created(session_id);
                        self.start_fetch(None);
                    }
                    CallOutcome::Failure(e) => {
                        warn!("failed to create search session: {e}");
                        self.scheduler.disarm();
                        self.state.fail(SessionFailure::Initialization(e));
                    }
                    CallOutcome::Aborted => {}
                }
            }
            Event::Fetched { op, page, outcome } => {
                if !self.settle(op) {
                    return;
                }
                match outcome {
                    CallOutcome::Success(response) => self.apply_response(page, response),
                    CallOutcome::Failure(e) => {
                        warn!(page, "page fetch failed: {e}");
                        self.scheduler.disarm();
                        self.state.fail(SessionFailure::Poll { page, source: e });
                    }
                    CallOutcome::Aborted => {}
                }
            }
            Event::Tick(tick) => {
                if !self.scheduler.fire(tick) {
                    return;
                }
                if self.state.status() == SessionStatus::Polling && self.active.is_none() {
                    debug!(page = self.state.page(), "automatic poll");
                    self.start_fetch(None);
                } else {
                    self.scheduler.disarm();
                }
            }
        }
    }

    fn apply_response(&mut self, page: u32, response: PageResponse) {
        debug!(
            page,
            received = response.results.len(),
            progress = response.progress,
            has_more = response.has_more,
            "page received"
        );
        self.state.apply_page(page, response);

        if self.state.status() == SessionStatus::Complete {
            info!(results = self.state.results().len(), "search complete");
            self.scheduler.disarm();
        } else {
            let events = self.events_tx.clone();
            self.scheduler.arm_interval(move |tick| {
                let _ = events.send(Event::Tick(tick));
            });
        }
    }

    /// Release the operation slot if `op` owns it. Completions of any other operation
    /// are stale and must not be applied.
    fn settle(&mut self, op: OperationId) -> bool {
        match &self.active {
            Some(active) if active.id == op => {
                self.active = None;
                true
            }
            _ => {
                debug!(%op, "discarding completion of a superseded operation");
                false
            }
        }
    }

    /// Issue a poll for the current page under the current filters.
    fn start_fetch(&mut self, superseded: Option<JoinHandle<()>>) {
        let Some(session_id) = self.state.session_id() else {
            return;
        };
        self.scheduler.disarm();

        let request = PageRequest {
            session_id,
            page: self.state.page(),
            limit: self.config.page_size,
            filters: self.state.filters().clone(),
        };
        let page = request.page;
        let transport = Arc::clone(&self.transport);
        self.spawn_operation(superseded, move |op, token| async move {
            let outcome = run_cancellable(&token, transport.fetch_page(request)).await;
            Event::Fetched { op, page, outcome }
        });
    }

    /// Run one transport operation in its own task and make it the active one.
    ///
    /// When `superseded` is given the new call waits for that task to finish first, so
    /// the transport never sees two calls from this session at once.
    fn spawn_operation<F, Fut>(&mut self, superseded: Option<JoinHandle<()>>, operation: F)
    where
        F: FnOnce(OperationId, CancellationToken) -> Fut,
        Fut: Future<Output = Event> + Send + 'static,
    {
        debug_assert!(self.active.is_none());
        let superseded = superseded.or_else(|| self.draining.take());
        self.next_op += 1;
        let id = OperationId(self.next_op);
        let token = CancellationToken::new();
        let call = operation(id, token.clone());
        let events = self.events_tx.clone();

        let task = tokio::spawn(async move {
            if let Some(previous) = superseded {
                let _ = previous.await;
            }
            let event = call.await;
            let _ = events.send(event);
        });

        self.active = Some(ActiveOperation { id, token, task });
    }

    /// Cancel the active operation, handing back its task so a successor can wait on it.
    fn abort_active(&mut self) -> Option<JoinHandle<()>> {
        self.active.take().map(|active| {
            debug!(op = %active.id, "cancelling in-flight operation");
            active.token.cancel();
            active.task
        })
    }

    fn publish(&self) {
        let next = self
            .state
            .snapshot(self.active.is_some(), self.scheduler.is_armed());
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn shutdown(&mut self) {
        drop(self.abort_active());
        self.scheduler.disarm();
    }
}

impl<T> Drop for SessionActor<T> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
        }
    }
}
