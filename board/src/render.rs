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

//! Frame rendering
//!
//! [`render_frame`] turns a [`BoardModel`] into the full byte frame written to
//! the client after every processed event. It is a pure function of the model:
//! the same state always produces the identical frame, so a worker can repaint
//! at any time without tearing. Output uses CRLF line endings because the
//! session terminal runs in raw mode.

use crate::model::BoardModel;
use std::fmt::Write;
use std::time::{Duration, SystemTime};

/// Erase the whole display
pub const CLEAR_SCREEN: &str = "\x1b[2J";
/// Move the cursor to row 1, column 1
pub const CURSOR_HOME: &str = "\x1b[H";
/// Hide the text cursor
pub const CURSOR_HIDE: &str = "\x1b[?25l";
/// Show the text cursor
pub const CURSOR_SHOW: &str = "\x1b[?25h";
/// Switch to the alternate screen buffer
pub const ALT_SCREEN_ENTER: &str = "\x1b[?1049h";
/// Return to the primary screen buffer
pub const ALT_SCREEN_LEAVE: &str = "\x1b[?1049l";
/// Select graphic rendition: inverse video
pub const SGR_INVERSE: &str = "\x1b[7m";
/// Select graphic rendition: reset all attributes
pub const SGR_RESET: &str = "\x1b[0m";

/// Column width for the rank
const PLACE_WIDTH: usize = 7;
/// Column width for the display name
const NAME_WIDTH: usize = 15;
/// Column width for the score
const SCORES_WIDTH: usize = 9;
/// Frame rows that are not table body: header, separator, blank, status, help
const CHROME_ROWS: u16 = 5;

/// Bytes sent once when a session opens, before the first frame
pub fn session_preamble() -> String {
    format!("{ALT_SCREEN_ENTER}{CURSOR_HIDE}{CLEAR_SCREEN}{CURSOR_HOME}")
}

/// Bytes sent once when a session closes, restoring the client terminal
pub fn session_epilogue() -> String {
    format!("{SGR_RESET}{ALT_SCREEN_LEAVE}{CURSOR_SHOW}")
}

/// Render the complete frame for the current session state.
pub fn render_frame(model: &BoardModel) -> String {
    let mut frame = String::with_capacity(2048);
    frame.push_str(CLEAR_SCREEN);
    frame.push_str(CURSOR_HOME);

    let _ = write!(
        frame,
        " {:>place$}  {:<name$}  {:>scores$}\r\n",
        "PLACE",
        "NAME",
        "SCORES",
        place = PLACE_WIDTH,
        name = NAME_WIDTH,
        scores = SCORES_WIDTH,
    );
    let _ = write!(
        frame,
        " {}\r\n",
        "-".repeat(PLACE_WIDTH + NAME_WIDTH + SCORES_WIDTH + 4)
    );

    let window = visible_rows(model.height());
    let (start, end) = visible_range(model.selected(), model.snapshot().len(), window);
    for index in start..end {
        let entry = &model.snapshot().entries()[index];
        let marked = model.selected() == Some(index);
        let row = format!(
            " {:>place$}  {:<name$}  {:>scores$}",
            entry.rank,
            truncate_name(&entry.name),
            entry.score,
            place = PLACE_WIDTH,
            name = NAME_WIDTH,
            scores = SCORES_WIDTH,
        );
        if marked && model.focused() {
            let _ = write!(frame, "{SGR_INVERSE}{row}{SGR_RESET}\r\n");
        } else if marked {
            let _ = write!(frame, ">{}\r\n", &row[1..]);
        } else {
            frame.push_str(&row);
            frame.push_str("\r\n");
        }
    }
    if model.snapshot().is_empty() {
        frame.push_str("   no entries yet\r\n");
    }

    frame.push_str("\r\n");
    let _ = write!(
        frame,
        " captured {}  {}\r\n",
        format_clock(model.snapshot().captured_at()),
        if model.focused() {
            "[focused]"
        } else {
            "[unfocused]"
        },
    );
    frame.push_str(" k/up j/down  tab focus  q quit\r\n");
    frame
}

/// Table rows that fit the terminal, always at least one.
fn visible_rows(height: u16) -> usize {
    height.saturating_sub(CHROME_ROWS).max(1) as usize
}

/// The window of rows to draw, sliding so the selection stays visible.
fn visible_range(selected: Option<usize>, len: usize, window: usize) -> (usize, usize) {
    if len <= window {
        return (0, len);
    }
    let selected = selected.unwrap_or(0);
    let half = window / 2;
    let start = selected.saturating_sub(half).min(len - window);
    (start, start + window)
}

/// Clip a display name to its column, char-safe for multibyte names.
fn truncate_name(name: &str) -> String {
    name.chars().take(NAME_WIDTH).collect()
}

/// Wall-clock HH:MM:SS (UTC) for the status line.
fn format_clock(at: SystemTime) -> String {
    let since_epoch = at
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    let secs = since_epoch.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}
