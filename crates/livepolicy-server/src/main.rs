//! livepolicy server binary.
//!
//! Usage: `livepolicy <config.yaml>`
//! - Registers every tenant listed under `opas`
//! - Serves the admin + decision HTTP surface
//! - Stops on Ctrl-C / SIGTERM, bounded by `shutdown_timeout_ms`

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use livepolicy_core::error::{LivePolicyError, Result};
use livepolicy_server::{config, server::Server};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "livepolicy exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        return Err(LivePolicyError::BadRequest(
            "usage: livepolicy <config.yaml>".into(),
        ));
    };

    let cfg = config::load_from_file(&path)?;
    tracing::info!(config = %path, addr = %cfg.listen_addr(), "livepolicy starting");

    let server = Server::new(cfg);
    server.bootstrap().await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    server.run(shutdown).await
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
    shutdown.cancel();
}
