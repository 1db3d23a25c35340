mod panel;

use axum::Router;
use axum::routing::get;
use tracing::info;

use wproxy_core::bootstrap::bootstrap_from_env;
use wproxy_core::into_app;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("wproxy failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let boot = bootstrap_from_env()?;
    let bind = boot.config.bind_addr();

    let app = into_app(
        Router::new()
            .route("/", get(panel::serve_panel))
            .route("/index.html", get(panel::serve_panel))
            .merge(boot.core.router()),
    );

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, upstream = %boot.config.upstream, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("wproxy=info,wproxy_core=info,wproxy_provider_impl=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}
