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

//! Core identifier and status types shared across the server.

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Unique identifier for an interactive session.
///
/// Identifiers are allocated from a monotonically increasing counter and are
/// never reused for the lifetime of the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a new session identifier from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle phase of a session.
///
/// The discriminants are stable so a phase can be stored in an `AtomicU8` and
/// shared between the session worker and the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionPhase {
    /// Handshake finished, worker not yet running.
    Connecting = 0,
    /// Worker loop is live and serving frames.
    Active = 1,
    /// Termination observed, worker is flushing and releasing resources.
    Closing = 2,
    /// Worker has exited.
    Closed = 3,
}

impl SessionPhase {
    /// Converts the phase to its `u8` representation.
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Converts a `u8` back into a phase. Unknown values map to `Closed`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionPhase::Connecting,
            1 => SessionPhase::Active,
            2 => SessionPhase::Closing,
            _ => SessionPhase::Closed,
        }
    }

    /// Returns true once the session can no longer produce frames.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Closing | SessionPhase::Closed)
    }

    /// Returns true while the session is serving a connected peer.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionPhase::Connecting | SessionPhase::Active)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Connecting => "connecting",
            SessionPhase::Active => "active",
            SessionPhase::Closing => "closing",
            SessionPhase::Closed => "closed",
        };
        write!(f, "{name}")
    }
}

/// Point-in-time description of a registered session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session identifier.
    pub id: SessionId,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Remote peer address, when known.
    pub peer_addr: Option<SocketAddr>,
    /// When the session was registered.
    pub opened_at: Instant,
}

impl SessionInfo {
    /// Time elapsed since the session was registered.
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

/// Point-in-time description of the whole server.
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Address the listener is bound to.
    pub bind_address: SocketAddr,
    /// Whether the acceptor is currently taking connections.
    pub running: bool,
    /// Number of sessions currently registered.
    pub active_sessions: usize,
    /// Total sessions accepted since startup.
    pub total_sessions: u64,
    /// Time since the server was created.
    pub uptime: Duration,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} running={} active={} total={} uptime={}s",
            self.bind_address,
            self.running,
            self.active_sessions,
            self.total_sessions,
            self.uptime.as_secs()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
