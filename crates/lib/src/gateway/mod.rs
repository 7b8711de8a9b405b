//! Gateway: the HTTP listener Telegram delivers webhook updates to.
//!
//! Single port. Every POST is a Telegram update handled by the pipeline; GET / is a health probe.

mod server;

pub use server::{build_router, run_gateway, GatewayState};
