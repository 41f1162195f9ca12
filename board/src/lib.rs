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

//! Leaderboard Session State Machine
//!
//! This crate holds the protocol-independent half of the podium server: the
//! ranked entries and snapshots delivered by the data gateway, the per-session
//! state machine that reacts to refresh ticks and key presses, the incremental
//! key decoder, and the frame renderer. Everything here is pure and
//! synchronous; the network layer in `podium-server` drives it.
//!
//! # Architecture
//!
//! ```text
//! raw bytes ─→ KeyDecoder ─→ BoardEvent ─┐
//!                                        ├─→ BoardModel::update ─→ [Effect]
//! refresh tick ─→ BoardEvent ────────────┘            │
//!                                                     ↓
//!                                            render_frame(&model)
//! ```
//!
//! Each connected session owns exactly one [`BoardModel`] and processes its
//! events strictly one at a time, so no synchronization appears anywhere in
//! this crate.

mod entry;
mod keys;
mod model;
mod render;

pub use self::entry::{Entry, LeaderboardSnapshot, SnapshotError};
pub use self::keys::{KeyDecoder, KeyEvent};
pub use self::model::{BoardEvent, BoardModel, Direction, Effect};
pub use self::render::{
    ALT_SCREEN_ENTER, ALT_SCREEN_LEAVE, CLEAR_SCREEN, CURSOR_HIDE, CURSOR_HOME, CURSOR_SHOW,
    SGR_INVERSE, SGR_RESET, render_frame, session_epilogue, session_preamble,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn test_module_exports_exist() {
        // Verify all public exports are accessible
        let _ = std::any::type_name::<Entry>();
        let _ = std::any::type_name::<LeaderboardSnapshot>();
        let _ = std::any::type_name::<SnapshotError>();
        let _ = std::any::type_name::<BoardModel>();
        let _ = std::any::type_name::<BoardEvent>();
        let _ = std::any::type_name::<Effect>();
        let _ = std::any::type_name::<KeyDecoder>();
        let _ = std::any::type_name::<KeyEvent>();
    }

    #[test]
    fn test_end_to_end_session_flow() {
        // Decode keys, drive the model, render, exactly as a session worker does.
        let snapshot = LeaderboardSnapshot::new(
            vec![
                Entry::new(1, "Alpha", 500),
                Entry::new(2, "Beta", 300),
                Entry::new(3, "Gamma", 100),
            ],
            SystemTime::UNIX_EPOCH,
        )
        .unwrap();
        let mut model = BoardModel::new(snapshot, 80, 24);
        let mut decoder = KeyDecoder::new();

        let events = decoder.feed(b"j");
        assert_eq!(events, vec![KeyEvent::Down]);
        let effects = model.update(BoardEvent::Navigate(Direction::Down));
        assert_eq!(effects, vec![Effect::Render]);
        assert_eq!(model.selected(), Some(1));

        let frame = render_frame(&model);
        assert!(frame.contains("Alpha"));
        assert!(frame.contains("Beta"));

        let events = decoder.feed(b"q");
        assert_eq!(events, vec![KeyEvent::Quit]);
        let effects = model.update(BoardEvent::Quit);
        assert_eq!(effects, vec![Effect::Close]);
        assert!(model.terminating());
    }
}
