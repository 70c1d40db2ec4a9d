use std::collections::HashSet;

use chrono::FixedOffset;

use crate::domain::{
    message::{Message, MessageId},
    timeline::Timeline,
};

/// Deduplicated message set for one group view.
///
/// Merging is idempotent and commutative in message id: the first delivery of
/// an id wins and later copies are ignored, whichever source they came from.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
}

impl MessageStore {
    /// Appends every message whose id is not present yet. Returns how many were applied.
    pub fn merge<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = Message>,
    {
        let mut applied = 0;

        for message in incoming {
            if self.ids.insert(message.id.clone()) {
                self.messages.push(message);
                applied += 1;
            }
        }

        applied
    }

    pub fn view(&self, offset: FixedOffset) -> Timeline {
        Timeline::build(&self.messages, offset)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
