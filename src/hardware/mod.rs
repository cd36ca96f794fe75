//! Device-side abstractions: capability traits, connection events and mocks.

pub mod capabilities;
pub mod connection;
pub mod mock;

pub use capabilities::{CameraControl, ConnectionFactory, DeviceConnection};
pub use connection::{ConnectionEvent, ConnectionId, EventSink, TelemetrySnapshot};
