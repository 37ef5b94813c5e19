use std::net::SocketAddr;
use std::sync::Arc;

use cine_api::{app, AppState};
use cine_booking::{BookingService, RoomHub, SeatLockManager};
use cine_store::{
    app_config::Config, CatalogRepository, CustomerRepository, DbClient, RedisClient,
    ReservationRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cine_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting cine API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let redis = RedisClient::new(&config.redis.url).expect("Failed to connect to Redis");

    let catalog = Arc::new(CatalogRepository::new(
        db.pool.clone(),
        redis.clone(),
        config.business_rules.seat_cache_seconds,
        config.business_rules.showing_cache_seconds,
    ));
    let reservations = Arc::new(ReservationRepository::new(db.pool.clone()));
    let customers = Arc::new(CustomerRepository::new(db.pool.clone()));

    let hub = Arc::new(RoomHub::new());
    let locks = SeatLockManager::new(
        Arc::new(redis),
        config.business_rules.seat_lock_seconds,
    );
    let booking = Arc::new(BookingService::new(
        catalog.clone(),
        catalog.clone(),
        customers.clone(),
        reservations.clone(),
        locks,
        hub.clone(),
    ));

    let state = AppState {
        catalog,
        reservations,
        customers,
        booking,
        hub,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app(state))
        .await
        .expect("Server error");
}
