//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vigil_core::{
    spawn_purge_task, EvictionSweeper, InMemoryMirror, IngestionPipeline, Mirror, NoopMirror,
};
use vigil_observability::MetricsRegistry;

/// Build the pipeline, metrics registry and mirror described by `config`.
///
/// Spawns the analytics workers, so it must run inside a tokio runtime.
pub fn build_state(config: &DaemonConfig) -> DaemonResult<AppState> {
    let metrics = Arc::new(MetricsRegistry::with_prefix(&config.server.metrics_prefix)?);

    let mirror: Option<Arc<dyn Mirror>> = config
        .mirror
        .ttls()
        .map(|(reading_ttl, result_ttl)| {
            Arc::new(InMemoryMirror::new(reading_ttl, result_ttl)) as Arc<dyn Mirror>
        });

    let pipeline_mirror: Arc<dyn Mirror> = match &mirror {
        Some(mirror) => mirror.clone(),
        None => Arc::new(NoopMirror),
    };
    let pipeline = IngestionPipeline::new(config.engine.clone(), metrics.sink(), pipeline_mirror)?;

    Ok(AppState::new(Arc::new(pipeline), metrics, mirror))
}

/// Start the periodic maintenance tasks for `state`.
///
/// The eviction sweeper runs only when eviction is enabled. The mirror purge
/// runs whenever a mirror is configured.
pub fn spawn_background_tasks(
    config: &DaemonConfig,
    state: &AppState,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if config.engine.eviction.enabled {
        let sweeper = EvictionSweeper::new(
            state.pipeline.store().clone(),
            config.engine.eviction.clone(),
            state.metrics.sink(),
        );
        handles.push(sweeper.spawn(shutdown.clone()));
    }

    if let (Some(mirror), Some(every)) = (&state.mirror, config.mirror.purge_interval()) {
        handles.push(spawn_purge_task(mirror.clone(), every, shutdown));
    }

    handles
}

/// Vigil Daemon Server
pub struct Server {
    config: DaemonConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let state = build_state(&config)?;
        Ok(Self { config, state })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(self.state.clone(), self.config.server.enable_cors);

        // Create listener
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Vigil daemon listening on {}", addr);
        tracing::info!(
            window_size = self.config.engine.window_size,
            anomaly_threshold = self.config.engine.anomaly_threshold,
            workers = self.config.engine.workers,
            "Analytics engine ready"
        );

        // Start eviction and mirror purge in background
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = spawn_background_tasks(&self.config, &self.state, shutdown_rx);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Vigil daemon shutting down");

        // Stop background tasks
        let _ = shutdown_tx.send(true);
        for handle in tasks {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background task failed during shutdown");
            }
        }

        // Let queued analytics finish
        self.state.pipeline.shutdown().await;

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use std::time::Duration;
    use vigil_core::Reading;

    #[tokio::test]
    async fn test_build_state_with_mirror() {
        let state = build_state(&DaemonConfig::default()).unwrap();
        assert!(state.mirror.is_some());
        assert_eq!(state.pipeline.config().window_size, 50);
    }

    #[tokio::test]
    async fn test_build_state_without_mirror() {
        let config = DaemonConfig {
            mirror: MirrorConfig::Disabled,
            ..Default::default()
        };
        let state = build_state(&config).unwrap();
        assert!(state.mirror.is_none());
    }

    #[tokio::test]
    async fn test_invalid_engine_config_is_a_config_error() {
        let mut config = DaemonConfig::default();
        config.engine.window_size = 0;
        assert!(matches!(build_state(&config), Err(DaemonError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mirror_purged_with_eviction_disabled() {
        let mut config = DaemonConfig::default();
        config.engine.workers = 1;
        config.engine.eviction.enabled = false;
        config.mirror = MirrorConfig::Memory {
            reading_ttl_secs: 5,
            result_ttl_secs: 5,
            purge_interval_secs: 10,
        };
        let state = build_state(&config).unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = spawn_background_tasks(&config, &state, shutdown_rx);
        assert_eq!(tasks.len(), 1);

        state
            .pipeline
            .ingest(Reading::new("device-001", 1_700_000_000, 42.0))
            .unwrap();
        state.pipeline.shutdown().await;

        // Past both TTLs and one purge interval, nothing is left to purge.
        tokio::time::sleep(Duration::from_secs(15)).await;
        let mirror = state.mirror.clone().unwrap();
        assert_eq!(mirror.purge_expired().await, 0);

        shutdown_tx.send(true).unwrap();
        for handle in tasks {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_no_background_tasks_without_eviction_or_mirror() {
        let mut config = DaemonConfig {
            mirror: MirrorConfig::Disabled,
            ..Default::default()
        };
        config.engine.eviction.enabled = false;
        let state = build_state(&config).unwrap();

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        assert!(spawn_background_tasks(&config, &state, shutdown_rx).is_empty());
    }
}
