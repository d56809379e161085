//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, feed task completions, Unix signals, and a
//! periodic tick. The loop is the hosting layer from the feed's point of
//! view: it activates the controller on entry, routes every completion event
//! through it, and deactivates it on the way out.

use super::input::{handle_input, Action};
use super::render::render;
use super::UiState;
use crate::feed::{FeedController, FeedEvent};
use anyhow::Result;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Runs the TUI event loop until the user quits or a signal arrives.
///
/// # Panic Safety
///
/// Installs a panic hook that restores terminal state before unwinding,
/// ensuring the terminal is not left in raw mode on panic.
pub async fn run(
    controller: &mut FeedController,
    ui: &mut UiState,
    mut event_rx: mpsc::Receiver<FeedEvent>,
) -> Result<()> {
    // Install panic hook BEFORE setting up the terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut event_stream = crossterm::event::EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    // Signal handlers for graceful shutdown (Unix only)
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    // Activation: initial load fires, polling follows once it lands
    controller.start();

    loop {
        if ui.needs_redraw {
            terminal.draw(|f| render(f, controller, ui))?;
            ui.needs_redraw = false;
        }

        if ui.clear_expired_status() {
            ui.needs_redraw = true;
        }

        // Drain pending feed events before waiting, so a burst of
        // completions is applied promptly even during rapid input.
        while let Ok(event) = event_rx.try_recv() {
            ui.needs_redraw = true;
            apply_feed_event(controller, ui, event);
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;  // Process in order listed for predictable behavior

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            maybe_event = event_stream.next() => {
                if let Some(Ok(Event::Key(key))) = maybe_event {
                    ui.needs_redraw = true;
                    match handle_input(ui, controller, key.code, key.modifiers) {
                        Action::Quit => break,
                        Action::Continue => {}
                    }
                }
            }

            Some(event) = event_rx.recv() => {
                ui.needs_redraw = true;
                apply_feed_event(controller, ui, event);
            }

            _ = tick_interval.tick() => {
                // Redraw on tick only when something visible changed;
                // expired statuses are handled at the top of the loop.
            }
        }
    }

    // Deactivation: the poll stops and any late completions are discarded
    controller.stop();

    restore_terminal(terminal)?;
    Ok(())
}

/// Surface user-facing outcomes, then let the controller mutate feed state.
///
/// The compose box is the one event the controller does not own: posting
/// success clears it, failure re-enables it for retry.
fn apply_feed_event(controller: &mut FeedController, ui: &mut UiState, event: FeedEvent) {
    match &event {
        FeedEvent::InitialLoaded(Err(_)) => {
            ui.set_status("Failed to load feed — press r to retry");
        }
        FeedEvent::OlderLoaded { result: Err(_), .. } => {
            ui.set_status("Failed to load older topics");
        }
        FeedEvent::NewerLoaded { result: Err(_), .. } => {
            ui.set_status("Failed to load new topics");
        }
        FeedEvent::DeleteCompleted { result: Ok(()), .. } => ui.set_status("Topic deleted"),
        FeedEvent::DeleteCompleted { result: Err(_), .. } => {
            ui.set_status("Delete failed — y to retry, n to keep");
        }
        FeedEvent::TopicPosted(Ok(_)) => {
            ui.compose = None;
            ui.set_status("Posted");
        }
        FeedEvent::TopicPosted(Err(_)) => {
            if let Some(compose) = ui.compose.as_mut() {
                compose.pending = false;
            }
            ui.set_status("Post failed — Enter to retry, Esc to discard");
        }
        _ => {}
    }

    controller.handle_event(event);
    ui.clamp_selection(controller.state().topics().len());
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
