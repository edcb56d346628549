use easyapi_server::{routes, ServerConfig, ServerContext};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load();
    let ctx = match ServerContext::from_config(&config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "failed to assemble server context");
            std::process::exit(1);
        }
    };
    tracing::info!(
        algorithms = ctx.algorithms.len(),
        io_types = ctx.iotypes.len(),
        lanes = ctx.runner.queue().lane_count(),
        "context assembled"
    );

    let app = routes::router(ctx);
    let listener = match tokio::net::TcpListener::bind(&config.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.listen, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %config.listen, server = %config.server_name, "serving");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
    }
}
