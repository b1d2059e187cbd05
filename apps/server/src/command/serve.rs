use super::Command;
use crate::config::Config;
use crate::error::{Result, WrapErr};
use crate::session::SessionManager;
use futures::{future, prelude::*};
use std::fs;
use std::time::Duration;
use tracing::{debug, info};

use rpc::{
    FlightSearch,
    search::{PageRequest, PageResponse, SearchError, SessionId},
};
use tarpc::{
    context::Context,
    server::{self, Channel},
    tokio_serde::formats::Bincode,
};

/// Upper bound on how often expired sessions are swept.
const REAP_INTERVAL: Duration = Duration::from_secs(60);

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

#[derive(Clone)]
struct Server {
    sessions: SessionManager,
}

impl FlightSearch for Server {
    async fn ping(self, _c: Context) -> String {
        "Pong".to_string()
    }

    async fn create_session(self, _c: Context, query: String) -> std::result::Result<SessionId, SearchError> {
        self.sessions.create_session(&query)
    }

    async fn fetch_page(self, _c: Context, req: PageRequest) -> std::result::Result<PageResponse, SearchError> {
        self.sessions.fetch_page(&req)
    }

    async fn close_session(self, _c: Context, session_id: SessionId) -> bool {
        self.sessions.close_session(session_id)
    }
}

pub struct ServeCommand {
    config: Config,
}

impl ServeCommand {
    pub fn new(cfg: Config) -> Self {
        Self { config: cfg }
    }
}

#[async_trait::async_trait]
impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let unix_socket_path = self.config.socket_path();

        if let Some(parent) = unix_socket_path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Could not create runtime directory {parent:?}"))?;
        }

        if unix_socket_path.exists() {
            debug!(?unix_socket_path, "removing stale socket");
            fs::remove_file(&unix_socket_path)?;
        }

        let sessions = SessionManager::new(self.config.session_timeout(), self.config.search.clone());
        let reap_every = self.config.session_timeout().clamp(Duration::from_secs(1), REAP_INTERVAL);
        tokio::spawn(sessions.clone().reap_expired(reap_every));

        info!(
            batches = self.config.search.batches,
            batch_size = self.config.search.batch_size,
            batch_interval_ms = self.config.search.batch_interval_ms,
            "listening on {unix_socket_path:?}"
        );

        let mut listener = tarpc::serde_transport::unix::listen(&unix_socket_path, Bincode::default)
            .await
            .wrap_err_with(|| format!("Could not bind {unix_socket_path:?}"))?;
        listener.config_mut().max_frame_length(usize::MAX);

        let server = Server { sessions };

        listener
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            .map(|channel| {
                let server = server.clone();
                channel.execute(server.serve()).for_each(spawn)
            })
            .buffer_unordered(10)
            .for_each(|_| async {})
            .await;

        Ok(())
    }
}
