use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use skyfare_api::{app, state::AuthConfig, AppState};
use skyfare_booking::{CancellationManager, HttpMailer, ReservationManager};
use skyfare_store::{
    DbClient, PostgresBookingStore, PostgresCatalog, PostgresCustomers, PostgresHistory,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyfare_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = skyfare_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Skyfare API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let booking_store = Arc::new(PostgresBookingStore::new(db.pool.clone()));
    let mailer = Arc::new(
        HttpMailer::new(
            config.mailer.endpoint.clone(),
            config.mailer.from_address.clone(),
            config.mailer.from_name.clone(),
            Duration::from_secs(config.mailer.timeout_seconds),
        )
        .expect("Failed to build mail relay client"),
    );

    let app_state = AppState {
        catalog: Arc::new(PostgresCatalog::new(db.pool.clone())),
        customers: Arc::new(PostgresCustomers::new(db.pool.clone())),
        history: Arc::new(PostgresHistory::new(db.pool.clone())),
        reservations: Arc::new(ReservationManager::new(booking_store.clone(), mailer)),
        cancellations: Arc::new(CancellationManager::new(booking_store)),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
