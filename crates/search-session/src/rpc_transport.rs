use crate::error::TransportError;
use crate::transport::Transport;
use async_trait::async_trait;
use rpc::FlightSearchClient;
use rpc::search::{PageRequest, PageResponse, SessionId};
use std::io;
use std::path::Path;
use tarpc::{client, context, tokio_serde::formats::Bincode};
use tracing::info;

/// [`Transport`] backed by the flight search service over its unix socket.
#[derive(Clone)]
pub struct RpcTransport {
    client: FlightSearchClient,
}

impl RpcTransport {
    pub async fn connect(socket_path: &Path) -> io::Result<Self> {
        let mut transport = tarpc::serde_transport::unix::connect(socket_path, Bincode::default);
        transport.config_mut().max_frame_length(usize::MAX);
        let transport = transport.await?;

        let client = FlightSearchClient::new(client::Config::default(), transport).spawn();
        info!(?socket_path, "connected to flight search service");
        Ok(Self { client })
    }

    pub async fn ping(&self) -> Result<String, TransportError> {
        self.client
            .ping(context::current())
            .await
            .map_err(|e| TransportError::Rpc(e.to_string()))
    }

    /// Returns whether the service still knew the session.
    pub async fn close_session(&self, session_id: SessionId) -> Result<bool, TransportError> {
        self.client
            .close_session(context::current(), session_id)
            .await
            .map_err(|e| TransportError::Rpc(e.to_string()))
    }
}

#[async_trait]
impl Transport for RpcTransport {
    async fn create(&self, query: &str) -> Result<SessionId, TransportError> {
        let session_id = self
            .client
            .create_session(context::current(), query.to_string())
            .await
            .map_err(|e| TransportError::Rpc(e.to_string()))??;
        Ok(session_id)
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse, TransportError> {
        let response = self
            .client
            .fetch_page(context::current(), request)
            .await
            .map_err(|e| TransportError::Rpc(e.to_string()))??;
        Ok(response)
    }
}
