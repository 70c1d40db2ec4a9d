//! Non-interactive dump of a group's timeline.

use chrono::FixedOffset;
use thiserror::Error;

use crate::{
    domain::{
        message::GroupId,
        timeline::{format_day, format_time, Timeline},
    },
    sync::contracts::{SnapshotSource, SnapshotSourceError},
};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot load history: {0}")]
    Snapshot(#[from] SnapshotSourceError),
}

/// Fetches one snapshot and renders it line by line.
pub async fn load_history(
    source: &dyn SnapshotSource,
    group_id: GroupId,
    local_user_id: Option<i64>,
    offset: FixedOffset,
) -> Result<Vec<String>, HistoryError> {
    let messages = source.fetch_messages(group_id).await?;
    tracing::debug!(group_id = %group_id, count = messages.len(), "history snapshot fetched");

    let timeline = Timeline::build(messages.iter(), offset);
    Ok(render_history(&timeline, local_user_id, offset))
}

/// Day headers followed by `HH:MM sender: content` lines.
pub fn render_history(
    timeline: &Timeline,
    local_user_id: Option<i64>,
    offset: FixedOffset,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(timeline.len() + timeline.days().len());

    for day in timeline.days() {
        lines.push(format!("-- {} --", format_day(day.date)));
        for message in &day.messages {
            lines.push(format!(
                "{} {}: {}",
                format_time(message.timestamp, offset),
                message.display_sender(local_user_id),
                message.content
            ));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        domain::message::{Message, MessageId, MessageKind},
        test_support::{message, ScriptedSource},
    };

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).expect("utc offset")
    }

    #[test]
    fn renders_day_headers_and_labels_own_and_bot_messages() {
        let own = Message {
            sender_id: Some(42),
            sender_name: Some("Me".to_owned()),
            ..message(2, 5)
        };
        let bot = Message {
            id: MessageId::from(3),
            content: "Alice added 300".to_owned(),
            sender_id: None,
            sender_name: None,
            timestamp: Utc
                .with_ymd_and_hms(2026, 2, 15, 8, 0, 0)
                .single()
                .expect("valid time"),
            kind: MessageKind::Bot,
        };
        let messages = [bot, own, message(1, 0)];
        let timeline = Timeline::build(messages.iter(), utc());

        let lines = render_history(&timeline, Some(42), utc());

        assert_eq!(
            lines,
            vec![
                "-- 14 Feb 2026 --".to_owned(),
                "10:00 Alice: message 1".to_owned(),
                "10:05 You: message 2".to_owned(),
                "-- 15 Feb 2026 --".to_owned(),
                "08:00 Bot: Alice added 300".to_owned(),
            ]
        );
    }

    #[test]
    fn empty_timeline_renders_nothing() {
        assert!(render_history(&Timeline::default(), None, utc()).is_empty());
    }

    #[tokio::test]
    async fn load_history_propagates_snapshot_failure() {
        let source = ScriptedSource::scripted(vec![Err(SnapshotSourceError::Unauthorized)], vec![]);

        let error = load_history(&source, GroupId(3), None, utc())
            .await
            .expect_err("unauthorized must fail");

        assert!(matches!(
            error,
            HistoryError::Snapshot(SnapshotSourceError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn load_history_uses_display_offset_for_times() {
        let source = ScriptedSource::always(vec![message(1, 0)]);
        let ist = FixedOffset::east_opt(330 * 60).expect("ist offset");

        let lines = load_history(&source, GroupId(3), None, ist)
            .await
            .expect("history should load");

        assert_eq!(lines[1], "15:30 Alice: message 1");
    }
}
