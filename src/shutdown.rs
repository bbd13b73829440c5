use actix_web::dev::ServerHandle;
use sqlx::{Pool, Postgres};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Orchestrates graceful shutdown on CTRL+C or SIGTERM.
///
/// Order: stop accepting HTTP requests, drain in-flight ones, signal the
/// background tasks, wait for them, then close the pool.
pub struct ShutdownCoordinator {
    server_handle: ServerHandle,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    background_tasks: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    pool: Pool<Postgres>,
}

impl ShutdownCoordinator {
    pub fn new(
        server_handle: ServerHandle,
        server_task: JoinHandle<Result<(), std::io::Error>>,
        background_tasks: Vec<JoinHandle<()>>,
        shutdown_tx: watch::Sender<bool>,
        pool: Pool<Postgres>,
    ) -> Self {
        Self {
            server_handle,
            server_task,
            background_tasks,
            shutdown_tx,
            pool,
        }
    }

    /// Block until a shutdown signal arrives, then shut everything down
    pub async fn wait_for_shutdown(self) -> Result<(), std::io::Error> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for CTRL+C: {}", e);
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
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received CTRL+C signal, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM signal, initiating graceful shutdown...");
            }
        }

        self.shutdown().await
    }

    async fn shutdown(self) -> Result<(), std::io::Error> {
        info!("Stopping HTTP server (no longer accepting new requests)...");
        self.server_handle.stop(true).await;

        match self.server_task.await {
            Ok(Ok(())) => info!("HTTP server shut down"),
            Ok(Err(e)) => error!("HTTP server encountered error during shutdown: {:?}", e),
            Err(e) => error!("HTTP server task panicked: {:?}", e),
        }

        info!("Signaling background tasks to stop...");
        if let Err(e) = self.shutdown_tx.send(true) {
            // Every receiver is gone, so nothing is left to stop
            info!("No background task listening for shutdown: {:?}", e);
        }

        let total = self.background_tasks.len();
        for (i, handle) in self.background_tasks.into_iter().enumerate() {
            match handle.await {
                Ok(()) => info!("Background task {} stopped ({}/{})", i + 1, i + 1, total),
                Err(e) => error!("Background task {} failed to stop: {:?}", i + 1, e),
            }
        }

        info!("Closing database connection pool...");
        self.pool.close().await;

        info!("Graceful shutdown completed");
        Ok(())
    }
}
