//! Core library for the p2_bridge camera integration.
//!
//! Bridges a show-control host (buttons, triggers, text variables) to a
//! networked P2 camera. The host invokes parameterized actions which are
//! validated, turned into camera-control commands and issued on the live
//! connection. Camera telemetry flows back as host variables.
//!
//! The entry point is [`app_actor::spawn_module`], which runs a
//! [`app_actor::CameraModule`] actor and returns a [`messages::ModuleHandle`].

pub mod actions;
pub mod app_actor;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hardware;
pub mod host;
pub mod iris;
pub mod messages;
pub mod state;
pub mod testing;
pub mod variables;

pub use error::{AppResult, BridgeError};
