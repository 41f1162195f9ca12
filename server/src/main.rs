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

//! `podiumd`, the leaderboard daemon.

use clap::Parser;
use podium_server::{
    LeaderboardServer, PgRankSource, Result, ServerConfig, ServerError, ShutdownCoordinator,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "podiumd", about = "Live CTF leaderboard over SSH", version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:23234")]
    listen: SocketAddr,

    /// Path to the SSH host key
    #[arg(long, default_value = ".ssh/id_ed25519")]
    host_key: PathBuf,

    /// Seconds between leaderboard refreshes
    #[arg(long, default_value_t = 10)]
    refresh_secs: u64,

    /// Seconds to wait for open sessions at shutdown
    #[arg(long, default_value_t = 30)]
    drain_secs: u64,

    /// Maximum concurrent sessions
    #[arg(long, default_value_t = 1000)]
    max_sessions: usize,

    /// Postgres connection string
    #[arg(long, env = "DATABASE_ENDPOINT")]
    database: Option<String>,
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let database = args
        .database
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| {
            ServerError::InvalidConfig(
                "no database endpoint, set DATABASE_ENDPOINT or pass --database".to_string(),
            )
        })?;

    let config = ServerConfig::new(args.listen)
        .with_host_key_path(args.host_key)
        .with_max_sessions(args.max_sessions)
        .with_refresh_interval(Duration::from_secs(args.refresh_secs))
        .with_shutdown_timeout(Duration::from_secs(args.drain_secs));

    let source = Arc::new(PgRankSource::connect_lazy(&database)?);
    let server = Arc::new(LeaderboardServer::new(config, source).await?);
    server.start().await?;
    info!(address = %server.bind_address(), "podiumd ready");

    ShutdownCoordinator::new(server).run().await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run().await {
        error!(%error, "podiumd failed");
        std::process::exit(1);
    }
}
