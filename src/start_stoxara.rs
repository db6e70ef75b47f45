//! Startup for the Stoxara server binary.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::chat::core::config::AppConfig;
use crate::chat::storage::open_adapter;
use crate::chat::store::SessionStore;
use crate::llm::gemini::GeminiClient;
use crate::llm::provider::GenerationProvider;
use crate::server::{self, AppState};

/// Run the server until Ctrl+C, then flush pending session saves.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Stoxara v{}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve()) {
        tracing::error!("Server error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Build application state from configuration without starting the server.
///
/// # Errors
/// Returns an error if the persistence adapter or HTTP client cannot be created.
pub async fn initialize(config: &AppConfig) -> anyhow::Result<Arc<AppState>> {
    let adapter = open_adapter(&config.storage)
        .await
        .context("opening session storage")?;
    let store = Arc::new(SessionStore::load(adapter, config.storage.sessions_key.clone()).await);

    if config.provider.api_key.is_none() {
        tracing::warn!("no API key configured; replies will fall back to the apology text");
    }
    let client = GeminiClient::new(&config.provider).context("building Gemini client")?;
    tracing::info!(model = client.model(), "generation provider ready");
    let provider: Arc<dyn GenerationProvider> = Arc::new(client);

    Ok(AppState::new(store, provider, config.server.static_dir.clone()))
}

async fn serve() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    let state = initialize(&config).await?;
    let store = Arc::clone(&state.store);

    let served = server::run_server_with_shutdown(state, config.server.port, shutdown_signal()).await;

    if let Err(e) = store.flush().await {
        tracing::error!("Failed to save sessions on shutdown: {e}");
    }
    served.context("serving HTTP")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::config::StorageBackend;

    #[tokio::test]
    async fn test_initialize_with_memory_backend() -> anyhow::Result<()> {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;

        let state = initialize(&config).await?;
        assert_eq!(state.store.len().await, 1);
        assert!(!state.controller.is_busy());
        Ok(())
    }

    #[tokio::test]
    async fn test_initialize_restores_sqlite_history() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = AppConfig::default();
        config.storage.sqlite_path = dir.path().join("stoxara.sqlite");

        let first = initialize(&config).await?;
        let created = first.store.create_session().await;
        drop(first);

        let second = initialize(&config).await?;
        assert_eq!(second.store.len().await, 2);
        assert_eq!(second.store.active_id().await, created.id);
        Ok(())
    }
}
