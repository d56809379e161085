//! Render functions for the feed view.

use super::UiState;
use crate::api::Topic;
use crate::feed::{FeedController, FeedState};
use crate::util::{display_width, format_relative_time, strip_control_chars, truncate_to_width};
use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Minimum terminal dimensions required for normal operation.
const MIN_WIDTH: u16 = 40;
const MIN_HEIGHT: u16 = 8;

/// Main render dispatch: banner, feed list, compose box, status line, and
/// the delete confirmation overlay on top.
pub(super) fn render(f: &mut Frame, controller: &FeedController, ui: &mut UiState) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        f.render_widget(Paragraph::new("Terminal too small"), area);
        return;
    }

    let state = controller.state();
    let banner_height = if state.new_topic_count() > 0 { 1 } else { 0 };
    let compose_height = if ui.compose.is_some() { 3 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner_height),
            Constraint::Min(0),
            Constraint::Length(compose_height),
            Constraint::Length(1),
        ])
        .split(area);

    if banner_height > 0 {
        render_banner(f, chunks[0], state.new_topic_count());
    }
    render_feed_list(f, chunks[1], controller, ui);
    if let Some(compose) = &ui.compose {
        let title = if compose.pending {
            "New topic (posting...)"
        } else {
            "New topic (Enter to post, Esc to cancel)"
        };
        let body = Paragraph::new(compose.content.as_str())
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(body, chunks[2]);
    }
    render_status_line(f, chunks[3], state, ui);

    if let Some(target) = state.pending_delete() {
        render_confirm_overlay(f, area, target);
    }
}

fn render_banner(f: &mut Frame, area: Rect, count: u64) {
    let label = if count == 1 {
        "There is 1 new topic — press n to load".to_string()
    } else {
        format!("There are {} new topics — press n to load", count)
    };
    let banner = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_widget(banner, area);
}

fn render_feed_list(f: &mut Frame, area: Rect, controller: &FeedController, ui: &mut UiState) {
    let state = controller.state();
    let title = match controller.scope() {
        Some(username) => format!(" {}'s topics ", username),
        None => " topics ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if state.flags().loading_initial && state.topics().is_empty() {
        f.render_widget(
            Paragraph::new("Loading...")
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
        return;
    }
    if state.topics().is_empty() {
        f.render_widget(
            Paragraph::new("There are no topics")
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let now = Utc::now();
    let items: Vec<ListItem> = state
        .topics()
        .iter()
        .map(|topic| topic_list_item(topic, inner_width, now))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut list_state = ListState::default();
    ui.clamp_selection(state.topics().len());
    list_state.select(Some(ui.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

/// One topic as a two-line list entry: author + relative time, then content.
fn topic_list_item<'a>(topic: &'a Topic, width: usize, now: chrono::DateTime<Utc>) -> ListItem<'a> {
    let header = format!(
        "{}@{} · {}",
        topic.user.display_name,
        topic.user.username,
        format_relative_time(topic.date, now)
    );

    let sanitized = strip_control_chars(&topic.content);
    let mut body = sanitized.replace(['\n', '\t'], " ");
    if topic.attachment.as_ref().is_some_and(|a| a.is_image()) {
        body.push_str(" [image]");
    }

    let lines = vec![
        Line::from(Span::styled(
            truncate_to_width(&header, width).into_owned(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(truncate_to_width(&body, width).into_owned()),
    ];
    ListItem::new(lines)
}

fn render_status_line(f: &mut Frame, area: Rect, state: &FeedState, ui: &UiState) {
    let text: String = if let Some((msg, _)) = &ui.status_message {
        msg.to_string()
    } else if state.flags().loading_older {
        "Loading older topics...".to_string()
    } else if state.flags().loading_newer {
        "Loading new topics...".to_string()
    } else if state.flags().deleting {
        "Deleting...".to_string()
    } else if state.is_last_page() {
        "j/k move · n new · p post · d delete · q quit · end of feed".to_string()
    } else {
        "j/k move · n new · p post · d delete · q quit".to_string()
    };
    f.render_widget(Paragraph::new(text), area);
}

/// Centered confirmation dialog for a pending delete.
fn render_confirm_overlay(f: &mut Frame, area: Rect, target: &Topic) {
    let preview = truncate_to_width(&strip_control_chars(&target.content), 40).into_owned();
    let body = format!("Delete this topic?\n\n\"{}\"\n\n[y] delete    [n] keep", preview);

    let width = (display_width(&preview).max(28) as u16 + 6).min(area.width);
    let height = 7.min(area.height);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(body)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Confirm ")),
        popup,
    );
}
