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

//! Live session registry.
//!
//! Tracks every running session worker, hands out identifiers, and owns the
//! shutdown mechanics: broadcast a close to everyone, wait for the set to
//! drain, and abort whatever is left at the deadline.

use crate::error::{Result, ServerError};
use crate::gateway::RankSource;
use crate::metrics::ServerMetrics;
use crate::sink::FrameSink;
use crate::types::{SessionId, SessionInfo, SessionPhase};
use crate::worker::{SessionControl, SessionWorker, WorkerConfig};
use dashmap::DashMap;
use futures_util::future::join_all;
use podium_board::{BoardEvent, BoardModel};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How often drain-style waits re-check the session set.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long a single targeted close waits for the worker to go away.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Bookkeeping for one registered session.
struct ManagedSession {
    control_tx: mpsc::Sender<SessionControl>,
    worker_handle: JoinHandle<()>,
    phase: Arc<AtomicU8>,
    peer_addr: Option<SocketAddr>,
    opened_at: Instant,
}

/// Outcome of broadcasting a close to every session.
#[derive(Debug, Clone)]
pub struct BroadcastResult {
    /// Sessions targeted.
    pub total: usize,
    /// Sessions whose control channel accepted the message.
    pub succeeded: usize,
    /// Sessions whose control channel was already gone.
    pub errors: Vec<SessionId>,
}

impl BroadcastResult {
    /// Number of failed deliveries.
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// True when every delivery succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Registry of live sessions.
///
/// Cheap to share; all members are internally synchronized.
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, ManagedSession>>,
    next_id: AtomicU64,
    metrics: Arc<ServerMetrics>,
    worker_config: WorkerConfig,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new(worker_config: WorkerConfig, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            metrics,
            worker_config,
        }
    }

    /// Spawns a worker for a freshly established session and registers it.
    ///
    /// Returns the new id and the event sender the connection side uses to
    /// feed input. The worker unregisters itself when it exits.
    pub fn spawn_session(
        &self,
        model: BoardModel,
        sink: Box<dyn FrameSink>,
        source: Arc<dyn RankSource>,
        peer_addr: Option<SocketAddr>,
    ) -> (SessionId, mpsc::Sender<BoardEvent>) {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let phase = Arc::new(AtomicU8::new(SessionPhase::Connecting.as_u8()));
        let (worker, event_tx, control_tx) = SessionWorker::new(
            id,
            model,
            sink,
            source,
            self.worker_config.clone(),
            self.metrics.clone(),
            phase.clone(),
        );

        let opened_at = Instant::now();
        let sessions = self.sessions.clone();
        let metrics = self.metrics.clone();
        let worker_handle = tokio::spawn(async move {
            worker.run().await;
            if sessions.remove(&id).is_some() {
                metrics.session_closed(opened_at.elapsed());
            }
            debug!(session_id = %id, "session released");
        });

        let finished_early = worker_handle.is_finished();
        self.sessions.insert(
            id,
            ManagedSession {
                control_tx,
                worker_handle,
                phase,
                peer_addr,
                opened_at,
            },
        );
        self.metrics.session_opened();
        info!(session_id = %id, peer = ?peer_addr, "session registered");

        // The worker can beat the insert when the peer dies instantly. Its
        // cleanup would then have found nothing to remove, so finish the
        // job here. Exactly one of the two paths wins the remove.
        if finished_early && self.sessions.remove(&id).is_some() {
            self.metrics.session_closed(opened_at.elapsed());
            debug!(session_id = %id, "session released at registration");
        }

        (id, event_tx)
    }

    /// Number of currently registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// True if the session is still registered.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Identifiers of all registered sessions.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Snapshot of one session.
    pub fn session_info(&self, id: SessionId) -> Option<SessionInfo> {
        self.sessions.get(&id).map(|entry| SessionInfo {
            id,
            phase: SessionPhase::from_u8(entry.phase.load(Ordering::SeqCst)),
            peer_addr: entry.peer_addr,
            opened_at: entry.opened_at,
        })
    }

    /// Snapshot of every session.
    pub fn session_infos(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|entry| SessionInfo {
                id: *entry.key(),
                phase: SessionPhase::from_u8(entry.phase.load(Ordering::SeqCst)),
                peer_addr: entry.peer_addr,
                opened_at: entry.opened_at,
            })
            .collect()
    }

    /// Total sessions ever spawned.
    pub fn total_spawned(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst) - 1
    }

    /// Gracefully closes one session and waits for it to unregister.
    pub async fn close_session(&self, id: SessionId) -> Result<()> {
        let control_tx = {
            let entry = self
                .sessions
                .get(&id)
                .ok_or(ServerError::SessionNotFound(id))?;
            entry.control_tx.clone()
        };
        control_tx
            .send(SessionControl::Close)
            .await
            .map_err(|_| ServerError::SessionClosed)?;

        let deadline = Instant::now() + CLOSE_GRACE;
        while self.sessions.contains_key(&id) {
            if Instant::now() >= deadline {
                return Err(ServerError::Timeout);
            }
            sleep(DRAIN_POLL_INTERVAL).await;
        }
        Ok(())
    }

    /// Sends a close to every registered session.
    pub async fn broadcast_quit(&self) -> BroadcastResult {
        let targets: Vec<(SessionId, mpsc::Sender<SessionControl>)> = self
            .sessions
            .iter()
            .map(|entry| (*entry.key(), entry.control_tx.clone()))
            .collect();
        let total = targets.len();

        let sends = targets.into_iter().map(|(id, control_tx)| async move {
            control_tx
                .send(SessionControl::Close)
                .await
                .map_err(|_| id)
        });
        let errors: Vec<SessionId> = join_all(sends)
            .await
            .into_iter()
            .filter_map(|result| result.err())
            .collect();

        BroadcastResult {
            total,
            succeeded: total - errors.len(),
            errors,
        }
    }

    /// Waits for the session set to empty, then aborts the stragglers.
    ///
    /// Returns the ids that had to be forced. Aborted workers never run
    /// their cleanup, so their registry entries and metrics are settled
    /// here.
    pub async fn drain(&self, limit: Duration) -> Vec<SessionId> {
        let deadline = Instant::now() + limit;
        while !self.sessions.is_empty() && Instant::now() < deadline {
            sleep(DRAIN_POLL_INTERVAL).await;
        }

        let leftover = self.session_ids();
        let mut forced = Vec::new();
        for id in leftover {
            if let Some((_, managed)) = self.sessions.remove(&id) {
                warn!(session_id = %id, "forcing session closed at drain deadline");
                managed.worker_handle.abort();
                self.metrics.session_forced();
                forced.push(id);
            }
        }
        forced
    }
}

// ============================================================================
// Tests
// ============================================================================
