//! Authenticated polling client for a single RepRapFirmware device.

use std::time::Duration;

use crate::error::ClientError;
use crate::types::{AuthResponse, ConfigResponse, StatusResponse};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which `rr_status` variant to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Type 1: core telemetry.
    Standard,
    /// Type 2: adds tool, heater and board properties.
    Extended,
    /// Type 3: adds print-progress properties.
    Print,
}

impl StatusKind {
    fn query_value(self) -> u8 {
        match self {
            StatusKind::Standard => 1,
            StatusKind::Extended => 2,
            StatusKind::Print => 3,
        }
    }
}

/// HTTP client for one device.
///
/// The firmware grants a session on `rr_connect`; all other endpoints
/// return 401 without one. The client authenticates lazily before the
/// first fetch and then keeps the session flag for its lifetime - the
/// firmware does not expire sessions that keep polling. There is no
/// retry logic here: failures propagate to the caller, which retries
/// naturally on its next tick.
///
/// Each instance is owned by exactly one polling task, so the session
/// flag needs no synchronization.
#[derive(Debug)]
pub struct DeviceClient {
    host: String,
    password: String,
    authenticated: bool,
    timeout: Duration,
    http: reqwest::Client,
}

impl DeviceClient {
    /// Create a client for `host` (`"name-or-ip[:port]"`).
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            password: password.into(),
            authenticated: false,
            timeout: DEFAULT_TIMEOUT,
            http: reqwest::Client::new(),
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The device host this client talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Issue a GET and decode the JSON body.
    ///
    /// The timeout bounds the whole request; on expiry the in-flight
    /// request is cancelled and a transport error is returned.
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        uri: &str,
        step: &'static str,
    ) -> Result<T, ClientError> {
        let url = format!("http://{}/{}", self.host, uri);

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| ClientError::Transport {
                host: self.host.clone(),
                step,
                source,
            })?;

        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                host: self.host.clone(),
                step,
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            host: self.host.clone(),
            step,
            source,
        })
    }

    /// Send the password to the device and mark the session authenticated.
    ///
    /// A non-zero firmware error code (wrong password, session table
    /// full) maps to [`ClientError::Auth`].
    pub async fn authenticate(&mut self) -> Result<(), ClientError> {
        let uri = format!("rr_connect?password={}", self.password);
        let response: AuthResponse = self.request(&uri, "connect").await?;

        if response.error_code != 0 {
            return Err(ClientError::Auth {
                host: self.host.clone(),
                code: response.error_code,
            });
        }

        tracing::debug!(device = %self.host, board = %response.board_type, "session established");
        self.authenticated = true;
        Ok(())
    }

    /// Fetch the static device configuration, authenticating first if needed.
    pub async fn fetch_config(&mut self) -> Result<ConfigResponse, ClientError> {
        if !self.authenticated {
            self.authenticate().await?;
        }
        self.request("rr_config", "config").await
    }

    /// Fetch a status snapshot, authenticating first if needed.
    pub async fn fetch_status(&mut self, kind: StatusKind) -> Result<StatusResponse, ClientError> {
        if !self.authenticated {
            self.authenticate().await?;
        }
        let uri = format!("rr_status?type={}", kind.query_value());
        self.request(&uri, "status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_kind_query_values() {
        assert_eq!(StatusKind::Standard.query_value(), 1);
        assert_eq!(StatusKind::Extended.query_value(), 2);
        assert_eq!(StatusKind::Print.query_value(), 3);
    }
}
