//! MQTT bridge for RepRapFirmware devices.
//!
//! Polls each configured printer's HTTP status API on a fixed interval
//! and republishes a normalized snapshot, availability transitions and
//! Home Assistant discovery metadata to an MQTT broker.

pub mod bridge;
pub mod config;
pub mod discovery;
pub mod poller;
pub mod topic;
pub mod variables;

pub use config::{BridgeConfig, ConfigError};
pub use discovery::Message;
pub use poller::{Availability, DevicePoller, PollResult};
pub use variables::{Variable, variables_from_result};
