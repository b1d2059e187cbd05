//! Client side of a progressively computed search.
//!
//! The remote service keeps producing results after the search starts, so the client
//! polls for pages. [`SearchSession`] owns one search: it starts it, polls it on a fixed
//! interval until the service reports completion, appends pages on request and restarts
//! from page 1 whenever the filters change. At most one transport call is outstanding
//! per session and a superseded call can never touch the session state.

pub mod error;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod transport;

// tarpc adapter (optional)
#[cfg(feature = "rpc-transport")]
pub mod rpc_transport;

pub use error::{SessionError, SessionFailure, TransportError};
pub use scheduler::{PollScheduler, SchedulerState, Tick};
pub use session::{SearchSession, SessionConfig};
pub use state::{SessionSnapshot, SessionStatus};
pub use transport::{CallOutcome, Transport, run_cancellable};

pub use rpc::search::{FlightOffer, PageRequest, PageResponse, SearchFilters, SessionId};

#[cfg(feature = "rpc-transport")]
pub use rpc_transport::RpcTransport;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
