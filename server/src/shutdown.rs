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

//! Signal-driven shutdown for the long-running daemon.

use crate::error::{Result, ServerError};
use crate::server::LeaderboardServer;
use std::sync::Arc;
use tracing::{info, warn};

/// Waits for a termination signal, then runs the server's drain sequence.
///
/// A drain that leaves sessions behind is reported but does not fail the
/// process; the daemon has nothing better to do with those sessions than
/// exit anyway.
pub struct ShutdownCoordinator {
    server: Arc<LeaderboardServer>,
}

impl ShutdownCoordinator {
    pub fn new(server: Arc<LeaderboardServer>) -> Self {
        Self { server }
    }

    /// Blocks until SIGINT or SIGTERM arrives, then shuts the server down.
    pub async fn run(self) -> Result<()> {
        let signal = wait_for_signal().await?;
        info!(signal, "termination signal received");
        self.settle().await
    }

    /// Runs the drain sequence immediately.
    pub async fn settle(self) -> Result<()> {
        match self.server.shutdown().await {
            Ok(()) => Ok(()),
            Err(ServerError::DrainTimeout(count)) => {
                warn!(sessions = count, "exiting with undrained sessions");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => Ok("SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("SIGINT")
}

// ============================================================================
// Tests
// ============================================================================
