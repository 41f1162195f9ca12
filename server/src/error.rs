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

//! Error types for the leaderboard server.

use crate::types::SessionId;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience result alias used throughout the server.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors raised while fetching the ranked standings.
///
/// A fetch failure never tears the server down. Sessions that hit one keep
/// presenting their last good snapshot and retry on the next refresh.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The ranking query could not be executed.
    #[error("ranking query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// The store returned a row that does not form a valid standings table.
    #[error("malformed ranking row: {0}")]
    InvalidRow(String),
}

/// Errors raised by the server, its sessions, and its lifecycle operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// I/O error from the listener or a connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SSH protocol error on a single connection.
    #[error("SSH protocol error: {0}")]
    Ssh(#[from] russh::Error),

    /// The host identity key could not be loaded.
    #[error("cannot load host key {}: {source}", .path.display())]
    HostKey {
        /// Path that was tried.
        path: PathBuf,
        /// Underlying key parse or I/O failure.
        source: russh::keys::Error,
    },

    /// The standings could not be fetched.
    #[error("leaderboard fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Referenced session is not registered.
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// The peer went away while a write was pending.
    #[error("Session closed by peer")]
    SessionClosed,

    /// The client asked for a shell without allocating a terminal.
    #[error("Interactive terminal required")]
    PtyRequired,

    /// A bounded operation did not finish in time.
    #[error("Operation timed out")]
    Timeout,

    /// `start` was called while the acceptor was already live.
    #[error("Server already running")]
    AlreadyRunning,

    /// A lifecycle operation requires a running server.
    #[error("Server not running")]
    NotRunning,

    /// The concurrent session limit was hit.
    #[error("Session limit of {0} reached")]
    SessionLimitReached(usize),

    /// Sessions were still open when the drain deadline passed.
    #[error("{0} sessions still open at drain deadline")]
    DrainTimeout(usize),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServerError {
    /// Returns true for errors that must abort startup before the accept
    /// loop runs.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            ServerError::Io(_) | ServerError::HostKey { .. } | ServerError::InvalidConfig(_)
        )
    }

    /// Returns true for errors confined to a single session. These are
    /// logged and the affected session is dropped without disturbing the
    /// rest of the server.
    pub fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            ServerError::Ssh(_)
                | ServerError::Fetch(_)
                | ServerError::SessionNotFound(_)
                | ServerError::SessionClosed
                | ServerError::PtyRequired
                | ServerError::Timeout
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
