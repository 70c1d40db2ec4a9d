//! Adapters for the expense service: REST collaborator and live chat socket.

pub mod error;
pub mod rest;
pub mod websocket;

pub use error::ApiError;
pub use rest::ApiClient;
pub use websocket::WebSocketConnector;
