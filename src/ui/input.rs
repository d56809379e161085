//! Key dispatch for the feed view.

use super::{ComposeState, UiState};
use crate::feed::FeedController;
use crossterm::event::{KeyCode, KeyModifiers};

/// Result of handling a key press event.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
}

/// Route a key press to the compose box, the delete confirmation, or the
/// feed list, in that priority order (modal surfaces first).
pub fn handle_input(
    ui: &mut UiState,
    controller: &mut FeedController,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }

    if ui.compose.is_some() {
        handle_compose_key(ui, controller, code);
        return Action::Continue;
    }

    if controller.state().pending_delete().is_some() {
        handle_confirm_key(ui, controller, code);
        return Action::Continue;
    }

    handle_browse_key(ui, controller, code)
}

fn handle_browse_key(
    ui: &mut UiState,
    controller: &mut FeedController,
    code: KeyCode,
) -> Action {
    let topic_count = controller.state().topics().len();

    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => ui.nav_up(),
        KeyCode::Down | KeyCode::Char('j') => {
            // Reaching the bottom is the "load more" signal
            if ui.nav_down(topic_count) && !controller.state().is_last_page() {
                controller.load_older();
            }
        }
        KeyCode::End | KeyCode::Char('G') => {
            ui.clamp_selection(topic_count);
            ui.selected = topic_count.saturating_sub(1);
            if !controller.state().is_last_page() {
                controller.load_older();
            }
        }
        KeyCode::Char('n') => {
            if controller.state().new_topic_count() > 0 {
                controller.load_newer();
            }
        }
        KeyCode::Char('r') => {
            // Manual reload; the controller re-arms polling on success
            controller.load_initial();
            ui.set_status("Reloading feed...");
        }
        KeyCode::Char('p') => {
            if ui.current_user.is_some() {
                ui.compose = Some(ComposeState {
                    content: String::new(),
                    pending: false,
                });
            } else {
                ui.set_status("Log in to post (set username/password in config)");
            }
        }
        KeyCode::Char('d') => request_delete_selected(ui, controller),
        _ => {}
    }
    Action::Continue
}

/// Ownership gate for delete: a display-layer courtesy, not the
/// authorization itself — the server re-checks on the DELETE request.
fn request_delete_selected(ui: &mut UiState, controller: &mut FeedController) {
    let Some(user) = &ui.current_user else {
        ui.set_status("Log in to delete your topics");
        return;
    };
    let Some(topic) = controller.state().topics().get(ui.selected).cloned() else {
        return;
    };
    if topic.user.id != user.id {
        ui.set_status("You can only delete your own topics");
        return;
    }
    controller.request_delete(topic);
}

fn handle_confirm_key(ui: &mut UiState, controller: &mut FeedController, code: KeyCode) {
    match code {
        KeyCode::Char('y') | KeyCode::Enter => controller.confirm_delete(),
        KeyCode::Char('n') | KeyCode::Esc => {
            controller.cancel_delete();
            ui.set_status("Delete cancelled");
        }
        _ => {}
    }
}

fn handle_compose_key(ui: &mut UiState, controller: &mut FeedController, code: KeyCode) {
    let Some(compose) = ui.compose.as_mut() else {
        return;
    };
    if compose.pending {
        // Submit in flight; only allow backing out entirely
        if code == KeyCode::Esc {
            ui.compose = None;
        }
        return;
    }

    match code {
        KeyCode::Esc => ui.compose = None,
        KeyCode::Enter => {
            let content = compose.content.trim().to_string();
            if content.is_empty() {
                ui.set_status("Nothing to post");
                return;
            }
            compose.pending = true;
            controller.post_topic(content);
        }
        KeyCode::Backspace => {
            compose.content.pop();
        }
        KeyCode::Char(c) => compose.content.push(c),
        _ => {}
    }
}
