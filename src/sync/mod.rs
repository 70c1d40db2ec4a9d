//! Real-time sync core for one group chat view.

pub mod contracts;
pub mod coordinator;
pub mod frames;
pub mod poll;
pub mod store;
pub mod transport;
pub mod typing;
