//! Message list rendering logic.
//!
//! Handles visual formatting of the timeline:
//! - Day separators taken from the timeline's day groups
//! - Sender grouping (consecutive messages from the same sender show the name once)
//! - "You" for own messages and a distinct style for bot messages
//! - Absolute time plus a relative age for each message

use chrono::{DateTime, FixedOffset, Utc};
use ratatui::{
    layout::Alignment,
    style::Style,
    text::{Line, Span},
    widgets::ListItem,
};

use crate::domain::timeline::{format_day, format_time, relative_age, Timeline};

use super::styles;

const INDENT: &str = "      ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKind {
    Other,
    Own,
    Bot,
}

/// Represents a visual element in the messages list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    /// Day separator line (e.g., "——— 14 Feb 2026 ———").
    DateSeparator(String),
    Message {
        time: String,
        age: String,
        /// `None` when grouped under the previous message's sender.
        sender: Option<String>,
        kind: SenderKind,
        content: String,
    },
}

/// Builds the visual elements for a timeline as of `now`.
pub fn build_message_list_elements(
    timeline: &Timeline,
    local_user_id: Option<i64>,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Vec<MessageListElement> {
    let mut elements = Vec::with_capacity(timeline.len() + timeline.days().len());

    for day in timeline.days() {
        elements.push(MessageListElement::DateSeparator(format_day(day.date)));
        let mut prev_sender: Option<&str> = None;

        for message in &day.messages {
            let sender_name = message.display_sender(local_user_id);
            let kind = if message.is_bot() {
                SenderKind::Bot
            } else if local_user_id.is_some_and(|id| message.is_from(id)) {
                SenderKind::Own
            } else {
                SenderKind::Other
            };

            let sender = (prev_sender != Some(sender_name)).then(|| sender_name.to_owned());

            elements.push(MessageListElement::Message {
                time: format_time(message.timestamp, offset),
                age: relative_age(message.timestamp, now, offset),
                sender,
                kind,
                content: message.content.clone(),
            });

            prev_sender = Some(sender_name);
        }
    }

    elements
}

/// Maps a message index (timeline order) to its element index, skipping separators.
pub fn message_index_to_element_index(
    elements: &[MessageListElement],
    message_index: usize,
) -> Option<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, element)| matches!(element, MessageListElement::Message { .. }))
        .nth(message_index)
        .map(|(element_index, _)| element_index)
}

/// Converts a list element to a ListItem for ratatui rendering.
pub fn element_to_list_item(element: &MessageListElement) -> ListItem<'static> {
    match element {
        MessageListElement::DateSeparator(date) => date_separator_item(date),
        MessageListElement::Message {
            time,
            age,
            sender,
            kind,
            content,
        } => message_item(time, age, sender.as_deref(), *kind, content),
    }
}

fn date_separator_item(date: &str) -> ListItem<'static> {
    let line = Line::from(vec![Span::styled(
        format!("——— {date} ———"),
        styles::date_separator_style(),
    )])
    .alignment(Alignment::Center);
    ListItem::new(vec![Line::default(), line])
}

fn message_item(
    time: &str,
    age: &str,
    sender: Option<&str>,
    kind: SenderKind,
    content: &str,
) -> ListItem<'static> {
    let text_style = content_style(kind);
    let mut lines = Vec::new();

    if let Some(name) = sender {
        lines.push(Line::from(vec![
            Span::styled(format!("{time:>5} "), styles::message_time_style()),
            Span::styled(format!("{name}:"), sender_style(kind)),
            Span::styled(format!(" {age}"), styles::message_time_style()),
        ]));

        for text_line in content.lines() {
            lines.push(Line::from(vec![
                Span::raw(INDENT.to_owned()),
                Span::styled(text_line.to_owned(), text_style),
            ]));
        }
    } else {
        let mut content_lines = content.lines();
        let first = content_lines.next().unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(format!("{time:>5} "), styles::message_time_style()),
            Span::styled(first.to_owned(), text_style),
        ]));

        for text_line in content_lines {
            lines.push(Line::from(vec![
                Span::raw(INDENT.to_owned()),
                Span::styled(text_line.to_owned(), text_style),
            ]));
        }
    }

    ListItem::new(lines)
}

fn sender_style(kind: SenderKind) -> Style {
    match kind {
        SenderKind::Other => styles::message_sender_style(),
        SenderKind::Own => styles::own_sender_style(),
        SenderKind::Bot => styles::bot_message_style(),
    }
}

fn content_style(kind: SenderKind) -> Style {
    match kind {
        SenderKind::Bot => styles::bot_message_style(),
        SenderKind::Other | SenderKind::Own => styles::message_text_style(),
    }
}
