use chrono::FixedOffset;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListState, Paragraph},
    Frame,
};

use crate::domain::{
    chat_view_state::{ChatViewState, Focus},
    connection::ConnectionState,
};

use super::message_input::render_message_input;
use super::message_rendering::{
    build_message_list_elements, element_to_list_item, message_index_to_element_index,
};
use super::styles;

const MESSAGES_HELP: &str = "i: write  j/k: scroll  q: quit";
const INPUT_HELP: &str = "Enter: send  Esc: back  Ctrl+C: quit";

pub fn render(frame: &mut Frame<'_>, state: &ChatViewState, offset: FixedOffset) {
    let [header_area, messages_area, typing_area, input_area, help_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    frame.render_widget(Paragraph::new(header_line(state)), header_area);
    render_messages_panel(frame, messages_area, state, offset);
    frame.render_widget(Paragraph::new(typing_line(state)), typing_area);
    render_message_input(
        frame,
        input_area,
        state.input(),
        state.focus() == Focus::Input,
        state.connection().is_open(),
    );
    frame.render_widget(Paragraph::new(help_line(state.focus())), help_area);
}

fn render_messages_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &ChatViewState,
    offset: FixedOffset,
) {
    let border_style = if state.focus() == Focus::Messages {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    };
    let block = Block::default()
        .title(format!("Messages ({})", state.timeline().len()))
        .borders(Borders::ALL)
        .border_style(border_style);

    if state.timeline().is_empty() {
        frame.render_widget(Paragraph::new("No messages yet.").block(block), area);
        return;
    }

    let elements = build_message_list_elements(
        state.timeline(),
        state.local_user_id(),
        offset,
        state.rendered_at(),
    );
    let items: Vec<_> = elements.iter().map(element_to_list_item).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut list_state = ListState::default();
    list_state.select(
        state
            .selected_index()
            .and_then(|index| message_index_to_element_index(&elements, index)),
    );
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn header_line(state: &ChatViewState) -> Line<'static> {
    let connection = state.connection();
    Line::from(vec![
        Span::styled(state.group_title().to_owned(), styles::group_title_style()),
        Span::raw("  "),
        Span::styled(
            connection_indicator(connection).to_owned(),
            styles::connection_style(connection),
        ),
    ])
}

fn connection_indicator(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Open => "● live",
        ConnectionState::Connecting => "◌ connecting...",
        ConnectionState::Idle | ConnectionState::Closed => "○ offline, polling",
    }
}

/// Notice wins over the typing indicator; both share one row.
fn typing_line(state: &ChatViewState) -> Line<'static> {
    if let Some(notice) = state.notice() {
        return Line::from(Span::styled(notice.to_owned(), styles::notice_style()));
    }

    match state.typing_user() {
        Some(name) => Line::from(Span::styled(
            format!("{name} is typing..."),
            styles::typing_style(),
        )),
        None => Line::default(),
    }
}

fn help_line(focus: Focus) -> Line<'static> {
    let help = match focus {
        Focus::Messages => MESSAGES_HELP,
        Focus::Input => INPUT_HELP,
    };
    Line::from(Span::styled(help.to_owned(), styles::message_time_style()))
}
