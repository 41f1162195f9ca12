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

//! Lock-free metrics for the leaderboard server
//!
//! Counters are kept in process-local atomics for cheap snapshotting and
//! mirrored to the `metrics` facade under the `podium.*` namespace so any
//! installed recorder sees them too.

use metrics::{counter, gauge, histogram};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// All metrics are stored as atomics and can be accessed concurrently
/// without locks. Use the `snapshot()` method to get a consistent view
/// of all metrics at a point in time.
#[derive(Debug)]
pub struct ServerMetrics {
    // Session counts
    total_sessions: AtomicU64,
    active_sessions: AtomicU64,
    rejected_sessions: AtomicU64,
    forced_closes: AtomicU64,

    // Refresh outcomes
    refreshes_succeeded: AtomicU64,
    refreshes_failed: AtomicU64,

    // Throughput
    frames_sent: AtomicU64,

    // Errors
    accept_errors: AtomicU64,

    // Timing
    total_session_nanos: AtomicU64,
    started_at: Instant,
}

impl ServerMetrics {
    /// Creates a zeroed collector.
    pub fn new() -> Self {
        Self {
            total_sessions: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            rejected_sessions: AtomicU64::new(0),
            forced_closes: AtomicU64::new(0),
            refreshes_succeeded: AtomicU64::new(0),
            refreshes_failed: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            accept_errors: AtomicU64::new(0),
            total_session_nanos: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Records a session entering the registry.
    pub fn session_opened(&self) {
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        counter!("podium.sessions.total").increment(1);
        gauge!("podium.sessions.active").increment(1.0);
    }

    /// Records a session leaving the registry after a normal worker exit.
    pub fn session_closed(&self, lifetime: Duration) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
        self.total_session_nanos
            .fetch_add(lifetime.as_nanos() as u64, Ordering::Relaxed);
        gauge!("podium.sessions.active").decrement(1.0);
        histogram!("podium.session.duration").record(lifetime.as_secs_f64());
    }

    /// Records a connection turned away before a session was registered.
    pub fn session_rejected(&self) {
        self.rejected_sessions.fetch_add(1, Ordering::Relaxed);
        counter!("podium.sessions.rejected").increment(1);
    }

    /// Records a listener accept failure.
    pub fn accept_error(&self) {
        self.accept_errors.fetch_add(1, Ordering::Relaxed);
        counter!("podium.accept.errors").increment(1);
    }

    /// Records a refresh that produced a fresh snapshot.
    pub fn refresh_succeeded(&self) {
        self.refreshes_succeeded.fetch_add(1, Ordering::Relaxed);
        counter!("podium.refreshes.ok").increment(1);
    }

    /// Records a refresh that failed and left the stale snapshot in place.
    pub fn refresh_failed(&self) {
        self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
        counter!("podium.refreshes.failed").increment(1);
    }

    /// Records a frame handed to a peer.
    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        counter!("podium.frames.sent").increment(1);
    }

    /// Records a session aborted at the drain deadline. The worker never
    /// runs its normal close path for these, so the active gauge is
    /// adjusted here.
    pub fn session_forced(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
        self.forced_closes.fetch_add(1, Ordering::Relaxed);
        gauge!("podium.sessions.active").decrement(1.0);
        counter!("podium.sessions.forced").increment(1);
    }

    /// Takes a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            rejected_sessions: self.rejected_sessions.load(Ordering::Relaxed),
            forced_closes: self.forced_closes.load(Ordering::Relaxed),
            refreshes_succeeded: self.refreshes_succeeded.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            accept_errors: self.accept_errors.load(Ordering::Relaxed),
            total_session_duration: Duration::from_nanos(
                self.total_session_nanos.load(Ordering::Relaxed),
            ),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ServerMetrics`].
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Sessions accepted since startup.
    pub total_sessions: u64,
    /// Sessions currently live.
    pub active_sessions: u64,
    /// Connections turned away before a session existed.
    pub rejected_sessions: u64,
    /// Sessions forcibly closed at the drain deadline.
    pub forced_closes: u64,
    /// Successful refreshes.
    pub refreshes_succeeded: u64,
    /// Failed refreshes.
    pub refreshes_failed: u64,
    /// Frames delivered.
    pub frames_sent: u64,
    /// Listener accept failures.
    pub accept_errors: u64,
    /// Sum of completed session lifetimes.
    pub total_session_duration: Duration,
    /// Collector uptime at snapshot time.
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Fraction of refreshes that failed, in `[0.0, 1.0]`.
    pub fn refresh_failure_rate(&self) -> f64 {
        let total = self.refreshes_succeeded + self.refreshes_failed;
        if total == 0 {
            0.0
        } else {
            self.refreshes_failed as f64 / total as f64
        }
    }

    /// Frames delivered per second of uptime.
    pub fn frames_per_second(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.frames_sent as f64 / secs
        }
    }

    /// Mean lifetime of sessions that closed normally.
    pub fn avg_session_duration(&self) -> Duration {
        let closed = self
            .total_sessions
            .saturating_sub(self.active_sessions)
            .saturating_sub(self.forced_closes);
        if closed == 0 {
            Duration::ZERO
        } else {
            self.total_session_duration / closed as u32
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sessions: {} active / {} total ({} rejected, {} forced), \
             refreshes: {} ok / {} failed, frames: {}",
            self.active_sessions,
            self.total_sessions,
            self.rejected_sessions,
            self.forced_closes,
            self.refreshes_succeeded,
            self.refreshes_failed,
            self.frames_sent
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_metrics_are_zeroed() {
        let snapshot = ServerMetrics::new().snapshot();
        assert_eq!(snapshot.total_sessions, 0);
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.rejected_sessions, 0);
        assert_eq!(snapshot.refreshes_succeeded, 0);
        assert_eq!(snapshot.refreshes_failed, 0);
        assert_eq!(snapshot.frames_sent, 0);
        assert_eq!(snapshot.forced_closes, 0);
        assert_eq!(snapshot.accept_errors, 0);
    }

    #[test]
    fn test_session_lifecycle_counting() {
        let metrics = ServerMetrics::new();
        metrics.session_opened();
        metrics.session_opened();
        assert_eq!(metrics.snapshot().active_sessions, 2);
        assert_eq!(metrics.snapshot().total_sessions, 2);

        metrics.session_closed(Duration::from_secs(4));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_sessions, 1);
        assert_eq!(snapshot.total_sessions, 2);
        assert_eq!(snapshot.total_session_duration, Duration::from_secs(4));
    }

    #[test]
    fn test_forced_close_counting() {
        let metrics = ServerMetrics::new();
        metrics.session_opened();
        metrics.session_forced();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.forced_closes, 1);
    }

    #[test]
    fn test_refresh_failure_rate() {
        let metrics = ServerMetrics::new();
        assert_eq!(metrics.snapshot().refresh_failure_rate(), 0.0);

        metrics.refresh_succeeded();
        metrics.refresh_succeeded();
        metrics.refresh_succeeded();
        metrics.refresh_failed();
        let rate = metrics.snapshot().refresh_failure_rate();
        assert!((rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_avg_session_duration() {
        let metrics = ServerMetrics::new();
        assert_eq!(metrics.snapshot().avg_session_duration(), Duration::ZERO);

        metrics.session_opened();
        metrics.session_opened();
        metrics.session_closed(Duration::from_secs(10));
        metrics.session_closed(Duration::from_secs(20));
        assert_eq!(
            metrics.snapshot().avg_session_duration(),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_snapshot_display() {
        let metrics = ServerMetrics::new();
        metrics.session_opened();
        metrics.refresh_succeeded();
        metrics.frame_sent();
        let rendered = format!("{}", metrics.snapshot());
        assert!(rendered.contains("1 active"));
        assert!(rendered.contains("1 ok"));
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(ServerMetrics::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let metrics = metrics.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    metrics.session_opened();
                    metrics.frame_sent();
                    metrics.session_closed(Duration::from_millis(1));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_sessions, 8000);
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.frames_sent, 8000);
    }
}
