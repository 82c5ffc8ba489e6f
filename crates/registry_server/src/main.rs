use std::{net::SocketAddr, sync::Arc};

use registry_server::{
    api::RegistryContext,
    build_router,
    config::{load_settings, load_store},
    AppState,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let store = load_store(&settings).map_err(|error| {
        error!(
            seed_path = ?settings.seed_path,
            error = %format!("{error:#}"),
            "failed to load registration seed data"
        );
        error
    })?;
    let seeded = store.list_all().await.len();

    let app = build_router(Arc::new(AppState {
        api: RegistryContext::new(store),
    }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, seeded, "registry listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
