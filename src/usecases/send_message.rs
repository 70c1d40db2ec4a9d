//! Use case for posting a chat message from the input box.
//!
//! Validation happens here, before anything reaches the live channel; delivery
//! is best effort and is reported back so the caller can keep the draft.

use thiserror::Error;

/// Errors reported by the delivery side (the chat session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageSourceError {
    /// Live channel is not open; the frame was dropped, not queued.
    ChannelUnavailable,
    /// The chat session has already shut down.
    SessionClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("not connected; message was not sent")]
    ChannelUnavailable,
    #[error("chat session is closed")]
    SessionClosed,
}

pub trait MessageSender {
    /// Hands already-validated text to the live channel.
    fn send_text(&self, text: &str) -> Result<(), SendMessageSourceError>;

    /// Best-effort "I am typing" signal.
    fn notify_typing(&self);
}

impl<T: MessageSender + ?Sized> MessageSender for &T {
    fn send_text(&self, text: &str) -> Result<(), SendMessageSourceError> {
        (*self).send_text(text)
    }

    fn notify_typing(&self) {
        (*self).notify_typing()
    }
}

/// Trims `text`, rejects it when empty and otherwise delegates to `sender`.
pub fn send_message(sender: &dyn MessageSender, text: &str) -> Result<(), SendMessageError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    sender.send_text(text).map_err(map_source_error)
}

fn map_source_error(error: SendMessageSourceError) -> SendMessageError {
    match error {
        SendMessageSourceError::ChannelUnavailable => SendMessageError::ChannelUnavailable,
        SendMessageSourceError::SessionClosed => SendMessageError::SessionClosed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct StubSender {
        result: Result<(), SendMessageSourceError>,
        captured_text: RefCell<Option<String>>,
    }

    impl StubSender {
        fn with_result(result: Result<(), SendMessageSourceError>) -> Self {
            Self {
                result,
                captured_text: RefCell::new(None),
            }
        }
    }

    impl MessageSender for StubSender {
        fn send_text(&self, text: &str) -> Result<(), SendMessageSourceError> {
            *self.captured_text.borrow_mut() = Some(text.to_owned());
            self.result.clone()
        }

        fn notify_typing(&self) {}
    }

    #[test]
    fn rejects_empty_message_text() {
        let sender = StubSender::with_result(Ok(()));

        let result = send_message(&sender, "");

        assert_eq!(result, Err(SendMessageError::EmptyMessage));
        assert!(sender.captured_text.borrow().is_none());
    }

    #[test]
    fn rejects_whitespace_only_message() {
        let sender = StubSender::with_result(Ok(()));

        let result = send_message(&sender, "   \n\t  ");

        assert_eq!(result, Err(SendMessageError::EmptyMessage));
    }

    #[test]
    fn trims_whitespace_before_sending() {
        let sender = StubSender::with_result(Ok(()));

        let result = send_message(&sender, "  split the taxi?  ");

        assert_eq!(result, Ok(()));
        assert_eq!(
            *sender.captured_text.borrow(),
            Some("split the taxi?".to_owned())
        );
    }

    #[test]
    fn maps_channel_unavailable() {
        let sender = StubSender::with_result(Err(SendMessageSourceError::ChannelUnavailable));

        assert_eq!(
            send_message(&sender, "hello"),
            Err(SendMessageError::ChannelUnavailable)
        );
    }

    #[test]
    fn maps_session_closed() {
        let sender = StubSender::with_result(Err(SendMessageSourceError::SessionClosed));

        assert_eq!(
            send_message(&sender, "hello"),
            Err(SendMessageError::SessionClosed)
        );
    }
}
