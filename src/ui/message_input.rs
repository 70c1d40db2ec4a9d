//! Message input field rendering.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::domain::message_input_state::MessageInputState;

use super::styles;

/// Placeholder text shown when the input is not focused and empty.
const PLACEHOLDER_TEXT: &str = "Press 'i' to type a message...";

/// Shown instead of the placeholder while messages cannot be sent.
const OFFLINE_PLACEHOLDER_TEXT: &str = "Offline. Sending is paused...";

const PROMPT_SYMBOL: &str = "> ";

pub fn render_message_input(
    frame: &mut Frame<'_>,
    area: Rect,
    input_state: &MessageInputState,
    is_focused: bool,
    can_send: bool,
) {
    let border_style = if is_focused {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    };

    let paragraph = Paragraph::new(build_input_line(input_state, is_focused, can_send)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(paragraph, area);

    if is_focused {
        let typed_width = input_state.text_before_cursor().width();
        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(PROMPT_SYMBOL.len() as u16)
            .saturating_add(typed_width.min(u16::MAX as usize) as u16);
        let cursor_y = area.y.saturating_add(1);
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

fn build_input_line(
    input_state: &MessageInputState,
    is_focused: bool,
    can_send: bool,
) -> Line<'static> {
    let prompt = Span::styled(PROMPT_SYMBOL.to_owned(), styles::input_prompt_style());
    let text_style = if can_send {
        styles::input_text_style()
    } else {
        styles::input_disabled_style()
    };

    if input_state.text().is_empty() && !is_focused {
        let placeholder = if can_send {
            PLACEHOLDER_TEXT
        } else {
            OFFLINE_PLACEHOLDER_TEXT
        };
        return Line::from(vec![
            prompt,
            Span::styled(placeholder.to_owned(), styles::input_placeholder_style()),
        ]);
    }

    Line::from(vec![
        prompt,
        Span::styled(input_state.text().to_owned(), text_style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn shows_placeholder_when_empty_and_unfocused() {
        let text = line_text(&build_input_line(&MessageInputState::default(), false, true));

        assert!(text.starts_with(PROMPT_SYMBOL));
        assert!(text.contains(PLACEHOLDER_TEXT));
    }

    #[test]
    fn shows_offline_placeholder_when_sending_is_unavailable() {
        let text = line_text(&build_input_line(&MessageInputState::default(), false, false));

        assert!(text.contains(OFFLINE_PLACEHOLDER_TEXT));
    }

    #[test]
    fn shows_empty_prompt_when_focused_and_empty() {
        let text = line_text(&build_input_line(&MessageInputState::default(), true, true));

        assert_eq!(text, PROMPT_SYMBOL);
    }

    #[test]
    fn keeps_draft_visible_while_offline() {
        let mut state = MessageInputState::default();
        state.insert_char('H');
        state.insert_char('i');

        let line = build_input_line(&state, true, false);

        assert_eq!(line_text(&line), "> Hi");
        assert_eq!(line.spans[1].style, styles::input_disabled_style());
    }
}
