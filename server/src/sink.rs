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

//! Outbound frame delivery.
//!
//! Workers never hold the SSH machinery directly. They write frames through
//! a [`FrameSink`], which keeps the session loop testable without a real
//! connection on the other end.

use crate::error::{Result, ServerError};
use async_trait::async_trait;
use russh::server::Handle;
use russh::{ChannelId, CryptoVec};

/// Destination for rendered frames.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Delivers one blob of bytes to the peer.
    ///
    /// An error means the peer is unreachable and the session should end.
    async fn send_frame(&self, bytes: &[u8]) -> Result<()>;

    /// Closes the channel. Called once when the session terminates.
    async fn close(&self) -> Result<()>;
}

/// [`FrameSink`] writing to one channel of a live SSH session.
pub struct SshFrameSink {
    handle: Handle,
    channel: ChannelId,
}

impl SshFrameSink {
    /// Wraps a session handle and the channel frames should go to.
    pub fn new(handle: Handle, channel: ChannelId) -> Self {
        Self { handle, channel }
    }
}

#[async_trait]
impl FrameSink for SshFrameSink {
    async fn send_frame(&self, bytes: &[u8]) -> Result<()> {
        self.handle
            .data(self.channel, CryptoVec::from_slice(bytes))
            .await
            .map_err(|_| ServerError::SessionClosed)
    }

    async fn close(&self) -> Result<()> {
        // Best effort: the peer may already have hung up.
        let _ = self.handle.eof(self.channel).await;
        let _ = self.handle.close(self.channel).await;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&self, bytes: &[u8]) -> Result<()> {
            self.frames.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_usable_as_trait_object() {
        let sink = RecordingSink::default();
        let boxed: Box<dyn FrameSink> = Box::new(sink.clone());
        boxed.send_frame(b"frame one").await.unwrap();
        boxed.send_frame(b"frame two").await.unwrap();
        boxed.close().await.unwrap();

        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], b"frame one");
        assert!(sink.closed.load(Ordering::SeqCst));
    }
}
