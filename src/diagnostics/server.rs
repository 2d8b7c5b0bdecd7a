//! Diagnostics server lifecycle.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::diagnostics::{setup_router, DiagnosticsState};
use crate::lifecycle::Shutdown;

/// Upper bound on waiting for open connections during stop.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    #[error("failed to bind diagnostics endpoint {address}: {source}")]
    Bind { address: String, source: io::Error },
}

/// A running diagnostics endpoint.
#[derive(Debug)]
pub struct DiagnosticsServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DiagnosticsServer {
    /// Bind `address` and serve in a background task.
    pub async fn start(address: &str, state: DiagnosticsState) -> Result<Self, DiagnosticsError> {
        let bind_err = |source| DiagnosticsError::Bind {
            address: address.to_owned(),
            source,
        };
        let listener = TcpListener::bind(address).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        let app = setup_router(state);

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.recv().await })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Diagnostics endpoint failed");
            }
        });

        tracing::info!(address = %local_addr, "Diagnostics endpoint listening");

        Ok(Self {
            local_addr,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Close the listener and wait for the server task. Idempotent.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        let Some(mut task) = task else {
            return;
        };

        self.shutdown.trigger();
        match tokio::time::timeout(DRAIN_TIMEOUT, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Diagnostics task ended abnormally"),
            Err(_) => {
                tracing::warn!("Diagnostics connections still open, aborting");
                task.abort();
                let _ = task.await;
            }
        }
        tracing::info!(address = %self.local_addr, "Diagnostics endpoint stopped");
    }
}
