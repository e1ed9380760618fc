//! Inbound message routing

mod outcome;
mod router;

pub use outcome::RouteOutcome;
pub use router::Router;
