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

//! SSH Leaderboard Server Implementation
//!
//! This crate serves the live CTF leaderboard over SSH. Any client that can
//! run `ssh` gets the scrolling board; no account, no client install. The
//! design goals:
//!
//! - Sessions are fully isolated; keystrokes in one never steer another
//! - Each session owns its refresh timer, re-armed only after the previous
//!   refresh has been applied
//! - A failing database keeps the last standings on screen instead of
//!   tearing the session down
//! - Graceful drain on SIGINT/SIGTERM with a forced-close deadline
//! - Lock-free metrics and monitoring
//!
//! # Architecture
//!
//! The implementation follows a layered architecture:
//!
//! ```text
//! LeaderboardServer
//!     ↓
//! SessionRegistry
//!     ↓
//! SessionWorker → BoardModel (podium-board)
//! ```
//!
//! The SSH handshake and channel plumbing live in [`SessionGate`]; rankings
//! come from a [`RankSource`], Postgres in production.
//!
//! # Example
//!
//! ```no_run
//! use podium_server::{LeaderboardServer, PgRankSource, ServerConfig, ShutdownCoordinator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let source = Arc::new(PgRankSource::connect_lazy("postgres://localhost/ctf")?);
//!     let server = Arc::new(LeaderboardServer::new(config, source).await?);
//!     server.start().await?;
//!     ShutdownCoordinator::new(server).run().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod gateway;
mod handler;
mod metrics;
mod registry;
mod server;
mod shutdown;
mod sink;
mod types;
mod worker;

pub use config::ServerConfig;
pub use error::{FetchError, Result, ServerError};
pub use gateway::{PgRankSource, RANKING_QUERY, RankSource};
pub use handler::SessionGate;
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::{BroadcastResult, SessionRegistry};
pub use server::LeaderboardServer;
pub use shutdown::ShutdownCoordinator;
pub use sink::{FrameSink, SshFrameSink};
pub use types::{ServerSnapshot, SessionId, SessionInfo, SessionPhase};
pub use worker::{SessionControl, SessionWorker, WorkerConfig};
