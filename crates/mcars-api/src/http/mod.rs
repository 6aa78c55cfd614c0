//! HTTP layer: the widget page, its WebSocket, and a health check.

pub mod handlers;
pub mod router;
pub mod socket_view;
