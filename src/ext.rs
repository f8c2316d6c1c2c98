//! Helpers for attaching broker-issued tokens to outbound requests.

pub mod bearer;

pub use bearer::*;
