use medivisual::{config, model, server};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medivisual=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load Config
    let config = config::AppConfig::from_env()?;

    // 3. Init ORT & load artifacts; a missing model only disables its route
    model::loader::init_ort();
    let models = model::registry::ModelHandles::load(&config.models);

    let metrics = PrometheusBuilder::new().install_recorder()?;

    // 4. Create Router
    let state = server::types::AppState {
        models,
        diabetes: config.diabetes.clone(),
        metrics: Some(metrics),
    };
    let app = server::routes::create_router(state, config.server.max_upload_bytes);

    // 5. Bind & Serve
    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
