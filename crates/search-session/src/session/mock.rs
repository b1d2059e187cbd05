//! Scripted transport for session tests: every call is handed to the test, which
//! answers it (or not) through a oneshot channel.

use crate::error::TransportError;
use crate::transport::Transport;
use async_trait::async_trait;
use rpc::search::{PageRequest, PageResponse, SessionId};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub struct Pending<Req, Resp> {
    pub request: Req,
    reply: oneshot::Sender<Result<Resp, TransportError>>,
}

impl<Req, Resp> Pending<Req, Resp> {
    /// Returns `false` when the caller already gave up on the call.
    pub fn respond(self, result: Result<Resp, TransportError>) -> bool {
        self.reply.send(result).is_ok()
    }

    pub fn ok(self, value: Resp) -> bool {
        self.respond(Ok(value))
    }

    pub fn fail(self, error: TransportError) -> bool {
        self.respond(Err(error))
    }
}

#[derive(Debug)]
pub enum PendingCall {
    Create(Pending<String, SessionId>),
    Fetch(Pending<PageRequest, PageResponse>),
}

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

struct InFlightGuard(Arc<Counters>);

impl InFlightGuard {
    fn enter(counters: &Arc<Counters>) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(counters))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockTransport {
    calls: mpsc::UnboundedSender<PendingCall>,
    counters: Arc<Counters>,
}

/// The test's side of a [`MockTransport`].
pub struct Remote {
    calls: mpsc::UnboundedReceiver<PendingCall>,
    counters: Arc<Counters>,
}

impl MockTransport {
    pub fn new() -> (Self, Remote) {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        (
            Self {
                calls: tx,
                counters: Arc::clone(&counters),
            },
            Remote {
                calls: rx,
                counters,
            },
        )
    }

    async fn call<Req, Resp>(
        &self,
        request: Req,
        wrap: fn(Pending<Req, Resp>) -> PendingCall,
    ) -> Result<Resp, TransportError> {
        let _guard = InFlightGuard::enter(&self.counters);
        let (reply, rx) = oneshot::channel();
        self.calls
            .send(wrap(Pending { request, reply }))
            .map_err(|_| TransportError::Rpc("remote is gone".into()))?;
        rx.await
            .map_err(|_| TransportError::Rpc("remote dropped the call".into()))?
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create(&self, query: &str) -> Result<SessionId, TransportError> {
        self.call(query.to_string(), PendingCall::Create).await
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse, TransportError> {
        self.call(request, PendingCall::Fetch).await
    }
}

impl Remote {
    pub async fn next_call(&mut self) -> PendingCall {
        self.calls.recv().await.expect("session dropped the transport")
    }

    pub async fn next_create(&mut self) -> Pending<String, SessionId> {
        match self.next_call().await {
            PendingCall::Create(pending) => pending,
            other => panic!("expected a create call, got {other:?}"),
        }
    }

    pub async fn next_fetch(&mut self) -> Pending<PageRequest, PageResponse> {
        match self.next_call().await {
            PendingCall::Fetch(pending) => pending,
            other => panic!("expected a fetch call, got {other:?}"),
        }
    }

    pub fn try_next_call(&mut self) -> Option<PendingCall> {
        self.calls.try_recv().ok()
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}
