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

//! Per-session state machine
//!
//! One [`BoardModel`] exists per connected session and is owned exclusively by
//! that session's worker task. Events arrive strictly one at a time; `update`
//! consumes each event, mutates the model, and returns the effects the caller
//! must execute (repaint, re-arm the refresh timer, close the connection).
//! The model itself performs no I/O.

use crate::entry::LeaderboardSnapshot;
use tracing::{debug, trace};

/// Direction of a selection movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward rank 1
    Up,
    /// Toward the last row
    Down,
}

/// An event delivered to one session's state machine.
///
/// Ticks and key presses land in the same queue, so a session observes a
/// single total order of its own events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// A scheduled refresh completed. `Some` carries the fresh snapshot,
    /// `None` means the fetch failed and the prior snapshot stays on screen.
    Tick(Option<LeaderboardSnapshot>),
    /// Move the selection one row
    Navigate(Direction),
    /// Flip table focus on or off
    ToggleFocus,
    /// Leave the session
    Quit,
    /// The client terminal was resized
    Resize { width: u16, height: u16 },
}

/// Side effects requested by a state transition, executed by the session
/// worker in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Repaint the frame from the current state
    Render,
    /// Arm the next refresh tick
    Rearm,
    /// Release the connection and stop the event loop
    Close,
}

/// The interactive state of one session: the displayed snapshot, the
/// selection, the focus flag, and the termination flag.
#[derive(Debug, Clone)]
pub struct BoardModel {
    snapshot: LeaderboardSnapshot,
    selected: Option<usize>,
    focused: bool,
    terminating: bool,
    width: u16,
    height: u16,
}

impl BoardModel {
    /// Create the model from the initial fetch. Sessions start focused with
    /// the top row selected.
    pub fn new(snapshot: LeaderboardSnapshot, width: u16, height: u16) -> Self {
        let selected = if snapshot.is_empty() { None } else { Some(0) };
        Self {
            snapshot,
            selected,
            focused: true,
            terminating: false,
            width: sanitize_dimension(width, 80),
            height: sanitize_dimension(height, 24),
        }
    }

    /// Apply one event and return the effects to execute.
    ///
    /// Once the model has reached the terminating state it absorbs all
    /// further events without effects.
    pub fn update(&mut self, event: BoardEvent) -> Vec<Effect> {
        if self.terminating {
            trace!(?event, "event ignored after termination");
            return Vec::new();
        }
        match event {
            BoardEvent::Tick(Some(snapshot)) => {
                trace!(rows = snapshot.len(), "snapshot replaced");
                self.snapshot = snapshot;
                self.clamp_selection();
                vec![Effect::Render, Effect::Rearm]
            }
            // Failed fetch: the stale snapshot stays, the timer is re-armed
            // so the next tick retries.
            BoardEvent::Tick(None) => vec![Effect::Render, Effect::Rearm],
            BoardEvent::Navigate(direction) => {
                if !self.focused {
                    trace!(?direction, "navigation ignored while unfocused");
                    return Vec::new();
                }
                self.move_selection(direction);
                vec![Effect::Render]
            }
            BoardEvent::ToggleFocus => {
                self.focused = !self.focused;
                trace!(focused = self.focused, "focus toggled");
                vec![Effect::Render]
            }
            BoardEvent::Quit => {
                debug!("session quitting");
                self.terminating = true;
                vec![Effect::Close]
            }
            BoardEvent::Resize { width, height } => {
                self.width = sanitize_dimension(width, self.width);
                self.height = sanitize_dimension(height, self.height);
                vec![Effect::Render]
            }
        }
    }

    /// Saturating one-row move; no wraparound at either end.
    fn move_selection(&mut self, direction: Direction) {
        let Some(selected) = self.selected else {
            return;
        };
        let last = self.snapshot.len() - 1;
        self.selected = Some(match direction {
            Direction::Up => selected.saturating_sub(1),
            Direction::Down => selected.saturating_add(1).min(last),
        });
    }

    /// Keep the selection inside the new snapshot, preserving it by position.
    /// An empty snapshot clears the selection, a shrunken one clamps to the
    /// last row.
    fn clamp_selection(&mut self) {
        self.selected = if self.snapshot.is_empty() {
            None
        } else {
            let last = self.snapshot.len() - 1;
            Some(self.selected.unwrap_or(0).min(last))
        };
    }

    /// The currently displayed snapshot
    pub fn snapshot(&self) -> &LeaderboardSnapshot {
        &self.snapshot
    }

    /// Selected row index, `None` when the board is empty
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Whether key navigation currently moves the selection
    pub fn focused(&self) -> bool {
        self.focused
    }

    /// Whether the session has quit
    pub fn terminating(&self) -> bool {
        self.terminating
    }

    /// Terminal width in columns
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Terminal height in rows
    pub fn height(&self) -> u16 {
        self.height
    }
}

/// PTY requests can carry zero dimensions; fall back rather than rendering
/// into a degenerate viewport.
fn sanitize_dimension(value: u16, fallback: u16) -> u16 {
    if value == 0 { fallback } else { value }
}
