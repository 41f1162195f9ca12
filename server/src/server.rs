//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The SSH leaderboard server.
//!
//! Construction loads the host key and binds the listener, so every error
//! that should stop the process from coming up surfaces before the accept
//! loop exists. After `start`, each accepted connection runs the SSH
//! handshake in its own task with a fresh [`SessionGate`]; sessions that
//! make it through the gate live in the [`SessionRegistry`] until they
//! terminate or shutdown drains them.

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::gateway::RankSource;
use crate::handler::SessionGate;
use crate::metrics::{MetricsSnapshot, ServerMetrics};
use crate::registry::SessionRegistry;
use crate::types::ServerSnapshot;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long the accept loop backs off after an accept error.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// How long `shutdown` waits for the accept task to stop.
const ACCEPT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Live SSH leaderboard server.
pub struct LeaderboardServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
    metrics: Arc<ServerMetrics>,
    source: Arc<dyn RankSource>,
    ssh_config: Arc<russh::server::Config>,
    listener: Arc<Mutex<TcpListener>>,
    bind_address: SocketAddr,
    started_at: Instant,
    running: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    accept_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LeaderboardServer {
    /// Validates the configuration, loads the host key, and binds the
    /// listener. Any failure here is fatal to startup.
    pub async fn new(config: ServerConfig, source: Arc<dyn RankSource>) -> Result<Self> {
        config.validate().map_err(ServerError::InvalidConfig)?;

        let key = russh::keys::load_secret_key(&config.host_key_path, None).map_err(|source| {
            ServerError::HostKey {
                path: config.host_key_path.clone(),
                source,
            }
        })?;

        let ssh_config = Arc::new(russh::server::Config {
            keys: vec![key],
            auth_rejection_time: Duration::from_secs(3),
            auth_rejection_time_initial: Some(Duration::ZERO),
            inactivity_timeout: None,
            ..Default::default()
        });

        let listener = TcpListener::bind(config.bind_address).await?;
        let bind_address = listener.local_addr()?;
        info!(%bind_address, "listener bound");

        let metrics = Arc::new(ServerMetrics::new());
        let registry = Arc::new(SessionRegistry::new(
            config.worker_config(),
            metrics.clone(),
        ));

        Ok(Self {
            config,
            registry,
            metrics,
            source,
            ssh_config,
            listener: Arc::new(Mutex::new(listener)),
            bind_address,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: Arc::new(Mutex::new(None)),
        })
    }

    /// Starts accepting connections.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        info!(address = %self.bind_address, "leaderboard server starting");
        let handle = self.spawn_accept_loop();
        *self.accept_handle.lock().await = Some(handle);
        Ok(())
    }

    fn spawn_accept_loop(&self) -> JoinHandle<()> {
        let listener = self.listener.clone();
        let registry = self.registry.clone();
        let metrics = self.metrics.clone();
        let source = self.source.clone();
        let ssh_config = self.ssh_config.clone();
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();
        let max_sessions = self.config.max_sessions;

        tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let accept = async {
                    let listener = listener.lock().await;
                    listener.accept().await
                };
                let accepted = tokio::select! {
                    result = accept => result,
                    _ = shutdown_notify.notified() => break,
                };

                match accepted {
                    Ok((socket, peer_addr)) => {
                        debug!(%peer_addr, "connection accepted");

                        if registry.session_count() >= max_sessions {
                            warn!(
                                %peer_addr,
                                limit = max_sessions,
                                "session limit reached, connection refused"
                            );
                            metrics.session_rejected();
                            drop(socket);
                            continue;
                        }

                        let gate = SessionGate::new(
                            registry.clone(),
                            source.clone(),
                            metrics.clone(),
                            Some(peer_addr),
                        );
                        let ssh_config = ssh_config.clone();
                        let connection_metrics = metrics.clone();
                        tokio::spawn(async move {
                            match russh::server::run_stream(ssh_config, socket, gate).await {
                                Ok(session) => {
                                    if let Err(error) = session.await {
                                        debug!(%peer_addr, %error, "connection ended with error");
                                    }
                                }
                                Err(error) => {
                                    warn!(%peer_addr, %error, "handshake failed");
                                    connection_metrics.session_rejected();
                                }
                            }
                        });
                    }
                    Err(error) => {
                        error!(%error, "accept failed");
                        metrics.accept_error();
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }
            info!("accept loop stopped");
        })
    }

    /// Stops accepting, asks every session to quit, and waits for the set
    /// to drain. Sessions still open at the deadline are aborted and the
    /// call reports them as a [`ServerError::DrainTimeout`].
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServerError::NotRunning);
        }

        info!("shutting down, no longer accepting connections");
        self.shutdown_notify.notify_waiters();
        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(ACCEPT_JOIN_TIMEOUT, handle).await;
        }

        let broadcast = self.registry.broadcast_quit().await;
        info!(
            sessions = broadcast.total,
            delivered = broadcast.succeeded,
            "close broadcast to live sessions"
        );

        let forced = self.registry.drain(self.config.shutdown_timeout).await;
        if forced.is_empty() {
            info!("all sessions drained");
            Ok(())
        } else {
            warn!(forced = forced.len(), "drain deadline passed");
            Err(ServerError::DrainTimeout(forced.len()))
        }
    }

    /// Address the listener is actually bound to.
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Whether the accept loop is live.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Point-in-time server status.
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            bind_address: self.bind_address,
            running: self.is_running(),
            active_sessions: self.registry.session_count(),
            total_sessions: self.registry.total_spawned(),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl std::fmt::Debug for LeaderboardServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaderboardServer")
            .field("bind_address", &self.bind_address)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Drop for LeaderboardServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            warn!("server dropped while running, sessions were not drained");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
