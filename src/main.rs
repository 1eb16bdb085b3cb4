use std::sync::Arc;

use tokio::net::TcpListener;

use quantized_textgen_service::{AppConfig, ModelRegistry, build_router, telemetry::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        model_path = %config.model_path.display(),
        device = %config.device_spec,
        "loading model artifacts"
    );

    let registry = Arc::new(ModelRegistry::initialize(&config)?);
    tracing::info!(sampling = ?registry.sampling(), "model ready");
    let router = build_router(registry);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready");

    axum::serve(listener, router).await?;

    Ok(())
}
