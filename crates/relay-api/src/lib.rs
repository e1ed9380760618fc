//! # relay-api
//!
//! HTTP surface around the relay gateway: file uploads, static file serving,
//! account signup/login and health, plus the `relay-server` binary.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;
pub mod upload;

pub use server::{create_app, create_app_state, create_gateway, run, run_server};
pub use state::AppState;
