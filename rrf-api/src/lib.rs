//! RepRapFirmware HTTP API
//!
//! This crate provides the pieces needed to talk to a RepRapFirmware
//! (Duet) controller over its legacy HTTP interface:
//!
//! - [`types`] - Wire types for `rr_connect`, `rr_config` and `rr_status`
//! - [`client`] - Authenticated polling client ([`DeviceClient`])
//! - [`error`] - Error types

pub mod client;
pub mod error;
pub mod types;

// Re-export commonly used types at the crate root
pub use client::{DeviceClient, StatusKind};
pub use error::ClientError;
pub use types::{
    AuthResponse, ConfigResponse, FanRpms, MachineStatus, MinCurMax, RrfBool, StatusResponse,
    TempState,
};
