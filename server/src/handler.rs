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

//! Per-connection SSH protocol gate.
//!
//! One [`SessionGate`] exists per TCP connection and runs inside the russh
//! session task. It accepts any credentials (the leaderboard is public),
//! refuses shells without a terminal, performs the initial standings fetch,
//! and then degrades into a dumb pipe: keystrokes in, worker events out.
//!
//! The gate owns the only event sender for its session. When the
//! connection dies for any reason the sender drops with the gate and the
//! worker sees the channel close, so no session outlives its peer.

use crate::error::ServerError;
use crate::gateway::RankSource;
use crate::metrics::ServerMetrics;
use crate::registry::SessionRegistry;
use crate::sink::SshFrameSink;
use crate::types::SessionId;
use podium_board::{BoardEvent, BoardModel, Direction, KeyDecoder, KeyEvent};
use russh::keys::PublicKey;
use russh::server::{Auth, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Message shown to clients that request a shell without a PTY.
const PTY_REQUIRED_NOTICE: &[u8] = b"podium requires an interactive terminal\r\n";

/// Message shown when the opening fetch fails.
const BOARD_UNAVAILABLE_NOTICE: &[u8] = b"leaderboard unavailable, try again shortly\r\n";

/// SSH handler for a single inbound connection.
pub struct SessionGate {
    registry: Arc<SessionRegistry>,
    source: Arc<dyn RankSource>,
    metrics: Arc<ServerMetrics>,
    peer_addr: Option<SocketAddr>,
    channel: Option<ChannelId>,
    pty_size: Option<(u16, u16)>,
    decoder: KeyDecoder,
    session_id: Option<SessionId>,
    events: Option<mpsc::Sender<BoardEvent>>,
}

impl SessionGate {
    /// Creates a gate for one freshly accepted connection.
    pub fn new(
        registry: Arc<SessionRegistry>,
        source: Arc<dyn RankSource>,
        metrics: Arc<ServerMetrics>,
        peer_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            registry,
            source,
            metrics,
            peer_addr,
            channel: None,
            pty_size: None,
            decoder: KeyDecoder::new(),
            session_id: None,
            events: None,
        }
    }

    /// Tells the worker the peer is done. Best effort; the worker may
    /// already have exited.
    async fn forward_quit(&mut self) {
        if let Some(events) = self.events.take() {
            let _ = events.send(BoardEvent::Quit).await;
        }
    }
}

/// Maps a decoded key to the session event it drives.
fn event_for_key(key: KeyEvent) -> BoardEvent {
    match key {
        KeyEvent::Up => BoardEvent::Navigate(Direction::Up),
        KeyEvent::Down => BoardEvent::Navigate(Direction::Down),
        KeyEvent::ToggleFocus => BoardEvent::ToggleFocus,
        KeyEvent::Quit => BoardEvent::Quit,
    }
}

impl russh::server::Handler for SessionGate {
    type Error = ServerError;

    // The board is public; any identity may watch it.
    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        debug!(peer = ?self.peer_addr, user, "anonymous auth accepted");
        Ok(Auth::Accept)
    }

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        debug!(peer = ?self.peer_addr, user, "password auth accepted");
        Ok(Auth::Accept)
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        debug!(peer = ?self.peer_addr, user, "publickey auth accepted");
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if self.channel.is_some() {
            debug!(peer = ?self.peer_addr, "additional session channel refused");
            return Ok(false);
        }
        self.channel = Some(channel.id());
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let width = col_width.min(u16::MAX as u32) as u16;
        let height = row_height.min(u16::MAX as u32) as u16;
        debug!(peer = ?self.peer_addr, term, width, height, "pty granted");
        self.pty_size = Some((width, height));
        session.channel_success(channel)?;
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        // Without a terminal there is nothing to draw on.
        let Some((width, height)) = self.pty_size else {
            warn!(peer = ?self.peer_addr, "shell without terminal refused");
            self.metrics.session_rejected();
            let _ = session.data(channel, CryptoVec::from_slice(PTY_REQUIRED_NOTICE));
            session.channel_failure(channel)?;
            return Err(russh::Error::Disconnect.into());
        };

        // The opening snapshot is fetched before the session exists, so a
        // joining viewer either sees real standings or no session at all.
        let snapshot = match self.source.fetch_ranked().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(peer = ?self.peer_addr, %error, "opening fetch failed, refusing session");
                self.metrics.session_rejected();
                let _ = session.data(channel, CryptoVec::from_slice(BOARD_UNAVAILABLE_NOTICE));
                session.channel_failure(channel)?;
                return Err(russh::Error::Disconnect.into());
            }
        };

        let model = BoardModel::new(snapshot, width, height);
        let sink = Box::new(SshFrameSink::new(session.handle(), channel));
        let (id, events) =
            self.registry
                .spawn_session(model, sink, self.source.clone(), self.peer_addr);
        self.session_id = Some(id);
        self.events = Some(events);
        info!(session_id = %id, peer = ?self.peer_addr, "session established");

        session.channel_success(channel)?;
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        // Command execution is not a thing here.
        warn!(peer = ?self.peer_addr, "exec request refused");
        self.metrics.session_rejected();
        let _ = session.data(channel, CryptoVec::from_slice(PTY_REQUIRED_NOTICE));
        session.channel_failure(channel)?;
        Err(russh::Error::Disconnect.into())
    }

    async fn data(
        &mut self,
        _channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        let Some(events) = &self.events else {
            // Input before the shell is up steers nothing.
            return Ok(());
        };
        for key in self.decoder.feed(data) {
            trace!(session_id = ?self.session_id, ?key, "key decoded");
            if events.send(event_for_key(key)).await.is_err() {
                // Worker already gone; nothing left to serve.
                return Err(russh::Error::Disconnect.into());
            }
        }
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        _channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        let width = col_width.min(u16::MAX as u32) as u16;
        let height = row_height.min(u16::MAX as u32) as u16;
        if let Some(events) = &self.events {
            let _ = events.send(BoardEvent::Resize { width, height }).await;
        } else if self.pty_size.is_some() {
            // Resized between the pty grant and the shell request.
            self.pty_size = Some((width, height));
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        debug!(session_id = ?self.session_id, "peer sent eof");
        self.forward_quit().await;
        Ok(())
    }

    async fn channel_close(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        debug!(session_id = ?self.session_id, "peer closed channel");
        self.forward_quit().await;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_event_mapping() {
        assert_eq!(
            event_for_key(KeyEvent::Up),
            BoardEvent::Navigate(Direction::Up)
        );
        assert_eq!(
            event_for_key(KeyEvent::Down),
            BoardEvent::Navigate(Direction::Down)
        );
        assert_eq!(event_for_key(KeyEvent::ToggleFocus), BoardEvent::ToggleFocus);
        assert_eq!(event_for_key(KeyEvent::Quit), BoardEvent::Quit);
    }

    #[test]
    fn test_gate_starts_empty() {
        let metrics = Arc::new(ServerMetrics::new());
        let registry = Arc::new(SessionRegistry::new(
            crate::worker::WorkerConfig::default(),
            metrics.clone(),
        ));

        struct NoSource;

        #[async_trait::async_trait]
        impl RankSource for NoSource {
            async fn fetch_ranked(
                &self,
            ) -> Result<podium_board::LeaderboardSnapshot, crate::error::FetchError> {
                Ok(podium_board::LeaderboardSnapshot::empty(
                    std::time::SystemTime::UNIX_EPOCH,
                ))
            }
        }

        let gate = SessionGate::new(registry, Arc::new(NoSource), metrics, None);
        assert!(gate.channel.is_none());
        assert!(gate.pty_size.is_none());
        assert!(gate.session_id.is_none());
        assert!(gate.events.is_none());
    }
}
