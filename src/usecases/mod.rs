//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod chat_session;
pub mod context;
pub mod contracts;
pub mod history;
pub mod send_message;
pub mod shell;
