use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use virusdecode::config::Config;
use virusdecode::services::reaper;
use virusdecode::state::AppState;
use virusdecode::{app, db, samples};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "virusdecode=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::load();

  let pool = db::init_db(&config.database_path).expect("Failed to initialize database");

  {
    let conn = db::try_lock(&pool).expect("Database lock failed during startup");
    if let Err(e) = samples::seed(&conn, &config.sample_file) {
      tracing::warn!("Failed to seed template account: {}", e);
    }
  }

  let schedule = reaper::schedule_or_default(&config.guest_cleanup_schedule);

  let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
  let reaper_handle = reaper::spawn(pool.clone(), schedule, config.guest_max_age(), shutdown_rx);

  let bind_addr = config.bind_addr();
  let state = AppState::new(pool, config);
  let app = app::router(state);

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://{}", bind_addr);

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
      }
      tracing::info!("Shutting down");
    })
    .await
    .expect("Server failed to start");

  let _ = shutdown_tx.send(());
  let _ = reaper_handle.await;
}
