mod cache;
mod config;
mod db;
mod pagination;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let config = config::Config::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    if let Some(path) = &config.groups_file {
        let seeded = services::group::seed_from_file(&pool, path)
            .await
            .expect("group seeding failed");
        tracing::info!(seeded, path = %path.display(), "groups seeded");
    }

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .expect("cannot create media root");

    let port = config.port;
    let page_size = config.page_size;
    let state = state::AppState::new(pool, config);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, page_size, "yatube listening");
    axum::serve(listener, app).await.expect("server failed");
}
