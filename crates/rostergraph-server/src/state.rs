//! Shared handler state.

use tokio_util::sync::CancellationToken;

use rostergraph_core::RosterService;

#[derive(Clone)]
pub struct AppState {
    pub service: RosterService,
    /// Cancelled on server shutdown
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: RosterService, shutdown: CancellationToken) -> Self {
        Self { service, shutdown }
    }
}
