use anyhow::Context;
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common_observability::WebhookMetrics;
use webhook_service::payments::{PaymentEventHandler, PaymentEventStore, PgPaymentEventStore};
use webhook_service::{build_router, AppState, Provider, WebhookConfig, WebhookDispatcher, WebhookHandler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = WebhookConfig::from_env()?;

    let store: Option<Arc<dyn PaymentEventStore>> = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            info!("Recording payment webhooks to Postgres");
            let store: Arc<dyn PaymentEventStore> = Arc::new(PgPaymentEventStore::new(pool));
            Some(store)
        }
        None => {
            info!("DATABASE_URL not set; payment webhooks will only be logged");
            None
        }
    };
    let handler: Arc<dyn WebhookHandler> = Arc::new(PaymentEventHandler::new(store));
    let dispatcher = Provider::ALL
        .into_iter()
        .fold(WebhookDispatcher::builder(), |builder, provider| {
            builder.route(provider, handler.clone())
        })
        .build();

    let metrics = WebhookMetrics::new().context("failed to register webhook metrics")?;
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let state = AppState::new(config, dispatcher, metrics);
    let app = build_router(state);

    info!(%addr, "starting webhook-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down webhook-service");
}
