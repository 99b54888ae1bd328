//! NATS Connector Library
//!
//! A lazily connected facade for request/reply, publish, and subscribe
//! over a NATS broker. The connection is created on first use and cached
//! for the lifetime of the [`Connector`].

pub mod connector;
pub mod error;
pub mod memory;
pub mod nats;
pub mod options;
pub mod subject;
pub mod subscription;
pub mod traits;

pub use connector::*;
pub use error::*;
pub use options::ConnectOptions;
pub use subscription::*;
pub use traits::*;

pub use natsbridge_config::NatsConfig;
pub use natsbridge_types::{encode, InboundMessage, Payload};
