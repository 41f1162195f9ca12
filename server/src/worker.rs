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

//! Per-session worker task.
//!
//! Each accepted session gets exactly one [`SessionWorker`] task that owns
//! the session's [`BoardModel`] outright. Everything that can change the
//! model arrives through the worker's channels or its own refresh timer, so
//! events apply in a single total order and no state is shared between
//! sessions.
//!
//! The refresh timer is deliberately not free-running. It is disarmed when
//! it fires and re-armed only by the `Rearm` effect after the tick has been
//! fully processed, which keeps the refresh cadence anchored to completion
//! rather than to a fixed schedule.

use crate::error::{Result, ServerError};
use crate::gateway::RankSource;
use crate::metrics::ServerMetrics;
use crate::sink::FrameSink;
use crate::types::{SessionId, SessionPhase};
use podium_board::{
    BoardEvent, BoardModel, Effect, LeaderboardSnapshot, render_frame, session_epilogue,
    session_preamble,
};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep, sleep, timeout};
use tracing::{debug, info, trace, warn};

/// Control messages delivered to a worker from outside its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    /// Terminate the session gracefully, as if the user had quit.
    Close,
}

/// Per-session worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Delay between refreshes, measured from the end of tick processing.
    pub refresh_interval: Duration,
    /// How long a frame write may stall before the session is dropped.
    pub write_timeout: Duration,
    /// Input event channel capacity.
    pub event_buffer_size: usize,
    /// Control channel capacity.
    pub control_buffer_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            event_buffer_size: 64,
            control_buffer_size: 16,
        }
    }
}

/// Whether the session loop should keep going after an event.
enum Flow {
    Continue,
    Stop,
}

/// Worker task owning one session end to end.
pub struct SessionWorker {
    id: SessionId,
    model: BoardModel,
    sink: Box<dyn FrameSink>,
    source: Arc<dyn RankSource>,
    config: WorkerConfig,
    metrics: Arc<ServerMetrics>,
    phase: Arc<AtomicU8>,
    event_rx: mpsc::Receiver<BoardEvent>,
    control_rx: mpsc::Receiver<SessionControl>,
    control_open: bool,
    refresh_timer: Pin<Box<Sleep>>,
    timer_armed: bool,
}

impl SessionWorker {
    /// Creates a worker and the sender halves of its channels.
    ///
    /// The event sender belongs to the connection plumbing; dropping it
    /// tells the worker the peer is gone. The control sender belongs to the
    /// registry.
    pub fn new(
        id: SessionId,
        model: BoardModel,
        sink: Box<dyn FrameSink>,
        source: Arc<dyn RankSource>,
        config: WorkerConfig,
        metrics: Arc<ServerMetrics>,
        phase: Arc<AtomicU8>,
    ) -> (
        Self,
        mpsc::Sender<BoardEvent>,
        mpsc::Sender<SessionControl>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer_size);
        let (control_tx, control_rx) = mpsc::channel(config.control_buffer_size);
        let refresh_timer = Box::pin(sleep(config.refresh_interval));
        let worker = Self {
            id,
            model,
            sink,
            source,
            config,
            metrics,
            phase,
            event_rx,
            control_rx,
            control_open: true,
            refresh_timer,
            // The first refresh is due one interval after the initial
            // synchronous fetch that built the model.
            timer_armed: true,
        };
        (worker, event_tx, control_tx)
    }

    /// Runs the session to completion and releases its resources.
    pub async fn run(mut self) {
        self.set_phase(SessionPhase::Active);
        debug!(session_id = %self.id, "session worker started");

        if let Err(error) = self.session_loop().await {
            warn!(session_id = %self.id, %error, "session ended with error");
        }

        self.cleanup();
    }

    /// Paints the opening frame and then serves events until termination.
    async fn session_loop(&mut self) -> Result<()> {
        self.send(session_preamble().as_bytes()).await?;
        self.render().await?;

        loop {
            tokio::select! {
                maybe_event = self.event_rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            trace!(session_id = %self.id, ?event, "input event");
                            if let Flow::Stop = self.apply(event).await? {
                                return Ok(());
                            }
                        }
                        None => {
                            // Every event sender lives on the connection
                            // side. All gone means the peer disconnected.
                            debug!(session_id = %self.id, "peer disconnected");
                            return Ok(());
                        }
                    }
                }
                maybe_control = self.control_rx.recv(), if self.control_open => {
                    if maybe_control.is_none() {
                        self.control_open = false;
                    } else {
                        info!(session_id = %self.id, "close requested");
                    }
                    if let Flow::Stop = self.apply(BoardEvent::Quit).await? {
                        return Ok(());
                    }
                }
                () = &mut self.refresh_timer, if self.timer_armed => {
                    self.timer_armed = false;
                    let tick = self.refresh().await;
                    if let Flow::Stop = self.apply(BoardEvent::Tick(tick)).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Fetches fresh standings, mapping failure to a stale tick.
    async fn refresh(&mut self) -> Option<LeaderboardSnapshot> {
        match self.source.fetch_ranked().await {
            Ok(snapshot) => {
                trace!(session_id = %self.id, rows = snapshot.len(), "refresh fetched");
                self.metrics.refresh_succeeded();
                Some(snapshot)
            }
            Err(error) => {
                warn!(session_id = %self.id, %error, "refresh failed, keeping last snapshot");
                self.metrics.refresh_failed();
                None
            }
        }
    }

    /// Feeds one event through the model and executes the resulting effects.
    async fn apply(&mut self, event: BoardEvent) -> Result<Flow> {
        for effect in self.model.update(event) {
            match effect {
                Effect::Render => self.render().await?,
                Effect::Rearm => {
                    self.refresh_timer
                        .as_mut()
                        .reset(Instant::now() + self.config.refresh_interval);
                    self.timer_armed = true;
                }
                Effect::Close => {
                    // Best effort: the peer may already be gone.
                    let _ = timeout(
                        self.config.write_timeout,
                        self.sink.send_frame(session_epilogue().as_bytes()),
                    )
                    .await;
                    let _ = timeout(self.config.write_timeout, self.sink.close()).await;
                    info!(session_id = %self.id, "session terminated");
                    return Ok(Flow::Stop);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Renders the model and delivers the frame.
    async fn render(&mut self) -> Result<()> {
        let frame = render_frame(&self.model);
        self.send(frame.as_bytes()).await?;
        self.metrics.frame_sent();
        Ok(())
    }

    /// Writes bytes to the sink under the configured timeout.
    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match timeout(self.config.write_timeout, self.sink.send_frame(bytes)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(ServerError::Timeout),
        }
    }

    fn cleanup(&mut self) {
        self.set_phase(SessionPhase::Closing);
        // Drain any control messages that raced with termination.
        while self.control_rx.try_recv().is_ok() {}
        self.set_phase(SessionPhase::Closed);
        debug!(session_id = %self.id, "session worker finished");
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.store(phase.as_u8(), Ordering::SeqCst);
    }
}

// ============================================================================
// Tests
// ============================================================================
