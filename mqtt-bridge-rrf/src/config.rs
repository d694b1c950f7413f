//! Bridge configuration.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::topic::Topics;

/// Capacity of the shared outbound message queue. Pollers block on a
/// full queue rather than dropping messages.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 100;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid broker address '{url}': {reason}")]
    Broker { url: String, reason: String },
    #[error("validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration, assembled from CLI flags and
/// `RRF_*` environment variables.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Device hosts to poll (`"name-or-ip[:port]"`).
    pub devices: Vec<String>,

    /// Password shared by all devices.
    pub password: String,

    /// Broker address (`"mqtt://host[:port]"`).
    pub broker: String,

    /// MQTT client identifier.
    pub client_id: String,

    /// Topic prefix for state and availability messages.
    pub data_topic_prefix: String,

    /// Topic prefix for Home Assistant discovery messages.
    pub discovery_topic_prefix: String,

    /// Interval between polling a device.
    pub poll_interval: Duration,

    /// Interval between discovery republications.
    pub discovery_interval: Duration,

    /// Delay between broker reconnection attempts.
    pub connect_retry_delay: Duration,

    /// MQTT keepalive.
    pub keep_alive: Duration,
}

impl BridgeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::Validation(
                "at least one device must be configured".to_string(),
            ));
        }
        if self.devices.iter().any(|d| d.is_empty()) {
            return Err(ConfigError::Validation(
                "device host cannot be empty".to_string(),
            ));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::Validation(
                "client id cannot be empty".to_string(),
            ));
        }
        if self.data_topic_prefix.is_empty() || self.discovery_topic_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "topic prefixes cannot be empty".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Validation(
                "poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse the broker address into host and port.
    ///
    /// This is the only startup-fatal error on the bridge path; polling
    /// never begins with an unparseable broker address.
    pub fn broker_addr(&self) -> Result<(String, u16), ConfigError> {
        let url = Url::parse(&self.broker).map_err(|e| ConfigError::Broker {
            url: self.broker.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "mqtt" | "tcp" => {}
            other => {
                return Err(ConfigError::Broker {
                    url: self.broker.clone(),
                    reason: format!("unsupported scheme '{other}'"),
                });
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::Broker {
                url: self.broker.clone(),
                reason: "missing host".to_string(),
            })?
            .to_string();

        Ok((host, url.port().unwrap_or(1883)))
    }

    /// Topic builders for the configured prefixes.
    pub fn topics(&self) -> Topics {
        Topics::new(&self.data_topic_prefix, &self.discovery_topic_prefix)
    }
}
