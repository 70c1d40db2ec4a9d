use std::{cmp::Ordering, fmt};

use chrono::{DateTime, NaiveDateTime, Utc};

/// Opaque message identifier, unique within one group's timeline.
///
/// The backend currently emits integers; ordering is only meaningful as a
/// deterministic tie-break between messages sharing a timestamp. Numeric ids
/// compare by value, anything else falls back to text order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for MessageId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<i64>(), other.0.parse::<i64>()) {
            (Ok(left), Ok(right)) => left.cmp(&right).then_with(|| self.0.cmp(&other.0)),
            _ => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for MessageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

impl Message {
    pub fn is_bot(&self) -> bool {
        self.kind == MessageKind::Bot
    }

    /// Returns true when the message was written by `user_id`.
    pub fn is_from(&self, user_id: i64) -> bool {
        self.kind == MessageKind::User && self.sender_id == Some(user_id)
    }

    /// Display name for the sender column: "You" for own messages, "Bot" for
    /// bot messages, the sender name otherwise.
    pub fn display_sender(&self, local_user_id: Option<i64>) -> &str {
        if self.is_bot() {
            return "Bot";
        }

        if local_user_id.is_some_and(|id| self.is_from(id)) {
            return "You";
        }

        self.sender_name.as_deref().unwrap_or("Unknown")
    }
}

/// The signed-in user, as reported by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
}

const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parses a wire timestamp. Offset-less values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, NAIVE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
