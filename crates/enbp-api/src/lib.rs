// enbp-api: Async Rust client for the Enapter HTTP API (v3)
//
// Speaks to both the Enapter Cloud and to on-premise gateways, which expose
// the same v3 surface under `/api`. Authentication is a per-site token sent
// as `X-Enapter-Auth-Token`.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{AUTH_HEADER, ApiClient};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
