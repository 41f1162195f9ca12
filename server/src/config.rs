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

//! Server configuration

use crate::worker::WorkerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
///
/// This structure contains all configuration options for the leaderboard
/// server. Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use podium_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("0.0.0.0:23234".parse().unwrap())
///     .with_max_sessions(500)
///     .with_refresh_interval(Duration::from_secs(10));
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the SSH listener to
    pub bind_address: SocketAddr,

    /// Path to the host identity key in OpenSSH format
    ///
    /// Loading this key is the first thing server construction does. A
    /// missing or unreadable key aborts startup.
    pub host_key_path: PathBuf,

    /// Maximum number of concurrent sessions
    pub max_sessions: usize,

    /// Delay between leaderboard refreshes
    ///
    /// Measured from the moment the previous refresh finished processing,
    /// not from when it was scheduled.
    pub refresh_interval: Duration,

    /// Timeout for frame writes
    ///
    /// If a frame cannot be handed to the peer within this duration the
    /// session is considered dead and is dropped.
    pub write_timeout: Duration,

    /// How long shutdown waits for sessions to drain
    ///
    /// Sessions still open when this deadline passes are forcibly closed.
    pub shutdown_timeout: Duration,

    /// Buffered capacity of each session's input event channel
    pub event_buffer_size: usize,

    /// Buffered capacity of each session's control channel
    pub control_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 23234)))
    }
}

impl ServerConfig {
    /// Creates a configuration bound to the given address with defaults for
    /// everything else.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            host_key_path: PathBuf::from(".ssh/id_ed25519"),
            max_sessions: 1000,
            refresh_interval: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
            event_buffer_size: 64,
            control_buffer_size: 16,
        }
    }

    /// Sets the host identity key path.
    pub fn with_host_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.host_key_path = path.into();
        self
    }

    /// Sets the maximum number of concurrent sessions.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Sets the refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Sets the frame write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the shutdown drain deadline.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the input event channel capacity.
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Sets the control channel capacity.
    pub fn with_control_buffer_size(mut self, size: usize) -> Self {
        self.control_buffer_size = size;
        self
    }

    /// Extracts the per-session worker configuration.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            refresh_interval: self.refresh_interval,
            write_timeout: self.write_timeout,
            event_buffer_size: self.event_buffer_size,
            control_buffer_size: self.control_buffer_size,
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.host_key_path.as_os_str().is_empty() {
            return Err("host_key_path must not be empty".to_string());
        }
        if self.max_sessions == 0 {
            return Err("max_sessions must be greater than 0".to_string());
        }
        if self.refresh_interval.is_zero() {
            return Err("refresh_interval must be greater than 0".to_string());
        }
        if self.write_timeout.is_zero() {
            return Err("write_timeout must be greater than 0".to_string());
        }
        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be greater than 0".to_string());
        }
        if self.event_buffer_size == 0 {
            return Err("event_buffer_size must be greater than 0".to_string());
        }
        if self.control_buffer_size == 0 {
            return Err("control_buffer_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
