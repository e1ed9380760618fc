//! Gateway state
//!
//! Shared state handed to the WebSocket handler.

use crate::gateway::Gateway;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    gateway: Arc<Gateway>,
}

impl GatewayState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connections", &self.gateway.connection_count())
            .field("queue_capacity", &self.gateway.queue_capacity())
            .finish()
    }
}
