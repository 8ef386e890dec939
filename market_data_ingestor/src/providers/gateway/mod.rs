//! Client for the terminal gateway: a small HTTP/JSON process running next to
//! the vendor terminal that exposes session, sector, detail and history calls.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{GatewayConfig, GatewayTerminal, TOKEN_ENV};
