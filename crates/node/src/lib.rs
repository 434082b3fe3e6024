//! Combined mesh node.
//!
//! Composes the channel pool, propagation engine, consensus tracker and
//! resource-test verifier into a complete node: one dispatch loop
//! consumes every slot's inbound messages, routes them by type, executes
//! the resulting actions and emits events to the owning application.

mod config;
mod dispatch;
mod entity;
mod events;
mod node;

pub use config::{ConfigError, NodeConfig};
pub use entity::{Entity, EntityError, SEED_LENGTH};
pub use events::NodeEvent;
pub use node::Node;
