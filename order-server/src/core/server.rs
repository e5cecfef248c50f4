//! Server Implementation
//!
//! 启动顺序和优雅关闭

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::core::{Config, Result, ServerState};
use crate::services::http;

/// Order service
///
/// `run` performs the full startup sequence:
/// 1. open store and journal (fatal on failure)
/// 2. recover the cache from the store
/// 3. bind the bus ingress and HTTP listeners
/// 4. start the ingestion pipeline on the durable subscription
/// 5. serve HTTP until SIGINT/SIGTERM
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (tests inject in-memory stores)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        crate::api::health::mark_started();

        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config)?,
        };

        // Cache must be complete before anything can read or write it
        let recovered = state.recover_cache();
        tracing::info!("Recovered {} orders into cache", recovered);

        let bus_listener = TcpListener::bind(self.config.bus_listen_addr()).await?;
        let http_addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let http_listener = TcpListener::bind(http_addr).await?;

        // Message bus ingress
        let bus = state.bus.clone();
        tracing::info!(
            "Message bus TCP server listening on {}",
            self.config.bus_listen_addr()
        );
        let bus_handle = tokio::spawn(async move { bus.serve(bus_listener).await });

        // Ingestion pipeline
        let subscription = state
            .bus
            .subscribe(&self.config.order_channel, &self.config.durable_name)?;
        let ingest_handle = tokio::spawn(
            state
                .pipeline()
                .run(subscription, state.shutdown_token.clone()),
        );

        // Signal listener
        let signal_state = state.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    tracing::info!("Shutting down...");
                    signal_state.shutdown();
                }
                _ = signal_state.shutdown_token.cancelled() => {}
            }
        });

        tracing::info!("🦀 Order service listening on {}", http_addr);
        http::serve(http_listener, state.clone()).await?;

        // HTTP has drained; give ingestion time to finish its in-flight message
        state.shutdown();
        let timeout = Duration::from_millis(self.config.shutdown_timeout_ms);
        if tokio::time::timeout(timeout, ingest_handle).await.is_err() {
            tracing::warn!("Ingestion pipeline did not stop within {:?}", timeout);
        }
        let _ = bus_handle.await;

        tracing::info!("Order service stopped");
        Ok(())
    }
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
}
