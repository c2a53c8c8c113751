use std::sync::Arc;

use skyfare_booking::{CancellationManager, ReservationManager};
use skyfare_core::repository::{CustomerDirectory, FlightCatalog, HistoryRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn FlightCatalog>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub history: Arc<dyn HistoryRepository>,
    pub reservations: Arc<ReservationManager>,
    pub cancellations: Arc<CancellationManager>,
    pub auth: AuthConfig,
}
