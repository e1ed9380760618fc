//! Gateway server setup
//!
//! Exposes the relay over `GET /ws`.

mod handler;
mod state;

pub use handler::ws_handler;
pub use state::GatewayState;

use axum::{routing::get, Router};

/// Path the WebSocket endpoint is mounted on
pub const WS_PATH: &str = "/ws";

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new().route(WS_PATH, get(ws_handler))
}

/// Gateway router with its state applied
pub fn create_app(state: GatewayState) -> Router {
    create_router().with_state(state)
}
