//! Terminal UI: the hosting layer for the feed controller.
//!
//! Owns activation and deactivation of the controller, renders from its
//! state, and translates key presses into the feed operations. Split into:
//!
//! - [`loop_runner`] - terminal setup/teardown and the `tokio::select!` loop
//! - [`input`] - key dispatch
//! - [`render`] - ratatui drawing

mod input;
mod loop_runner;
mod render;

pub use loop_runner::run;

use crate::api::User;
use std::borrow::Cow;
use tokio::time::Instant;

/// Compose box state. `pending` is the in-flight gate for posting: while a
/// submit is outstanding, Enter is a no-op and the content is kept so a
/// failure can be retried (or edited).
pub struct ComposeState {
    pub content: String,
    pub pending: bool,
}

/// Presentation state that is not the feed's business: selection, the
/// compose box, and the transient status line.
pub struct UiState {
    /// Index of the highlighted topic in the feed list.
    pub selected: usize,
    pub compose: Option<ComposeState>,
    /// Status message with expiry — Cow avoids allocation for static literals.
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    /// The authenticated user, if any. Gates posting and the delete key.
    pub current_user: Option<User>,
}

impl UiState {
    pub fn new(current_user: Option<User>) -> Self {
        Self {
            selected: 0,
            compose: None,
            status_message: None,
            needs_redraw: true,
            current_user,
        }
    }

    /// Set status message (auto-expires after 3 seconds).
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear the status message if older than 3 seconds.
    /// Returns true if a message was actually cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, since)) = &self.status_message {
            if since.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    /// Keep the selection inside the list after any mutation that may have
    /// shrunk it (delete, reload, failed initial load).
    pub fn clamp_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(len - 1);
        }
    }

    pub fn nav_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move down; returns true when the selection was already at the bottom
    /// (the scroll-to-bottom signal that triggers backward pagination).
    pub fn nav_down(&mut self, len: usize) -> bool {
        if len == 0 {
            return false;
        }
        let max_index = len - 1;
        if self.selected >= max_index {
            true
        } else {
            self.selected += 1;
            false
        }
    }
}
