use std::sync::Arc;

use anyhow::Context;

use promoflow_api::config::{AppConfig, StoreConfig};
use promoflow_infra::{InMemoryStore, PgStore, Services, Store, seed_default_roles};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    promoflow_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn Store> = match &config.store {
        StoreConfig::InMemory => {
            tracing::warn!("USE_PERSISTENT_STORES not set; state is kept in memory only");
            Arc::new(InMemoryStore::new())
        }
        StoreConfig::Postgres {
            url,
            max_connections,
            acquire_timeout,
        } => {
            let pg = PgStore::connect(url, *max_connections, *acquire_timeout)
                .await
                .context("failed to connect to postgres")?;
            pg.migrate().await.context("failed to apply migrations")?;
            Arc::new(pg)
        }
    };

    let services = Services::new(store, &config.services)?;
    seed_default_roles(&services.catalog)
        .await
        .context("failed to seed default roles")?;

    let app = promoflow_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
