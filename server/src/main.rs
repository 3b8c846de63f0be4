use server::config::ServerConfig;
use server::state::AppState;
use server::{db, routes, services};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    let state = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections).await?;
            AppState::postgres(pool, config.client_channel_capacity)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            AppState::in_memory(config.client_channel_capacity)
        }
    };

    let _sweep =
        services::cursor::spawn_cursor_sweep_task(state.clone(), config.cursor_sweep_interval, config.cursor_stale);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "drawroom listening");
    axum::serve(listener, app).await?;
    Ok(())
}
