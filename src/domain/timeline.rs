//! Derived, day-grouped view of a group's messages.
//!
//! The timeline is a pure function of the message set and the display offset:
//! ordering comes from timestamps (ties broken by id), never from arrival order,
//! and day separators depend only on consecutive messages' dates.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use super::message::{Message, MessageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Timeline {
    days: Vec<DayGroup>,
}

impl Timeline {
    pub fn build<'a, I>(messages: I, offset: FixedOffset) -> Self
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut ordered: Vec<&Message> = messages.into_iter().collect();
        ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        let mut days: Vec<DayGroup> = Vec::new();
        for message in ordered {
            let date = local_date(message.timestamp, offset);
            match days.last_mut() {
                Some(day) if day.date == date => day.messages.push(message.clone()),
                _ => days.push(DayGroup {
                    date,
                    messages: vec![message.clone()],
                }),
            }
        }

        Self { days }
    }

    pub fn days(&self) -> &[DayGroup] {
        &self.days
    }

    /// Number of messages across all days.
    pub fn len(&self) -> usize {
        self.days.iter().map(|day| day.messages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.days.iter().flat_map(|day| day.messages.iter())
    }

    #[cfg(test)]
    pub fn ids(&self) -> impl Iterator<Item = &MessageId> {
        self.messages().map(|message| &message.id)
    }

    pub fn latest(&self) -> Option<&Message> {
        self.days.last().and_then(|day| day.messages.last())
    }
}

pub fn local_date(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

/// Day header label, e.g. "14 Feb 2026".
pub fn format_day(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

/// Wall-clock label in the display offset, e.g. "15:30".
pub fn format_time(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp.with_timezone(&offset).format("%H:%M").to_string()
}

/// Coarse age label relative to `now`. Falls back to the day label after a day.
pub fn relative_age(timestamp: DateTime<Utc>, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let elapsed = now.signed_duration_since(timestamp);

    if elapsed.num_minutes() < 1 {
        return "just now".to_owned();
    }

    if elapsed.num_hours() < 1 {
        return format!("{}m ago", elapsed.num_minutes());
    }

    if elapsed.num_days() < 1 {
        return format!("{}h ago", elapsed.num_hours());
    }

    format_day(local_date(timestamp, offset))
}
