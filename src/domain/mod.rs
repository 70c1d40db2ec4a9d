//! Domain layer: core entities and business rules.

pub mod chat_view_state;
pub mod connection;
pub mod events;
pub mod message;
pub mod message_input_state;
pub mod timeline;
