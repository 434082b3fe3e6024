//! Mesh channel pool.
//!
//! Owns a fixed-size set of logical peer slots; each slot independently
//! opens, monitors and re-opens a transport channel through the external
//! handshake collaborator. Exposes send/broadcast plus connection-count
//! and inbound-message events.
//!
//! Failure semantics: handshake errors, malformed control payloads and
//! protocol-version mismatches are all handled identically — close and
//! reconnect with linear backoff; no failure is fatal to the process.

mod config;
mod pool;
mod replay;
mod slot;
mod transport;

pub use config::PoolConfig;
pub use pool::{ChannelPool, PoolEvent};
pub use replay::ReplayStore;
pub use transport::{Channel, ChannelEvent, ConnectError, Connector, Transport, TransportError};
