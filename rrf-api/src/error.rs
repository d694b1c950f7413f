//! Error types for the device client.

use thiserror::Error;

/// Errors returned by [`DeviceClient`](crate::client::DeviceClient).
///
/// Every variant carries the device host and the request step it failed
/// in, so a log line is enough to locate the problem on a multi-device
/// bridge.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The device rejected the supplied password.
    #[error("authentication rejected by {host}: error code {code}")]
    Auth { host: String, code: i32 },

    /// The request did not complete: connection failure, timeout, or a
    /// non-success HTTP status from the device.
    #[error("{step} request to {host} failed: {source}")]
    Transport {
        host: String,
        step: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The device answered, but the body was not the expected JSON.
    #[error("{step} response from {host} did not decode: {source}")]
    Decode {
        host: String,
        step: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
