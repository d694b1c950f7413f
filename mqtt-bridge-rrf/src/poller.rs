//! Per-device polling loop.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rrf_api::types::{ConfigResponse, StatusResponse};
use rrf_api::{ClientError, DeviceClient, StatusKind};

use crate::config::BridgeConfig;
use crate::discovery::{Message, discovery_messages, state_message};
use crate::topic::{Topics, topic_safe};
use crate::variables::variables_from_result;

/// Device availability as announced on the availability topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Online,
    Offline,
}

impl Availability {
    pub fn as_str(self) -> &'static str {
        match self {
            Availability::Online => "online",
            Availability::Offline => "offline",
        }
    }
}

/// Everything one successful tick learned about a device.
///
/// `config` is only present on ticks where discovery was due; the two
/// status snapshots are always required.
#[derive(Debug, Clone)]
pub struct PollResult {
    pub host: String,
    /// Topic slug of the device-reported name.
    pub name: String,
    pub availability_topic: String,
    pub state_topic: String,
    pub config: Option<ConfigResponse>,
    pub status2: StatusResponse,
    pub status3: StatusResponse,
}

/// Polls a single device on a fixed interval and turns each tick into
/// outbound messages.
///
/// The poller never stops on its own: fetch failures are logged,
/// announced as `offline`, and retried on the next tick. Only the
/// cancellation token ends the loop.
pub struct DevicePoller {
    host: String,
    client: DeviceClient,
    topics: Topics,
    poll_interval: Duration,
    discovery_interval: Duration,
    availability_topic: String,
    last_discovery: Option<Instant>,
    last_availability: Option<Availability>,
}

impl DevicePoller {
    pub fn new(host: impl Into<String>, config: &BridgeConfig) -> Self {
        let host = host.into();
        let topics = config.topics();
        let availability_topic = topics.availability(&topic_safe(&host));
        Self {
            client: DeviceClient::new(host.clone(), config.password.clone()),
            host,
            topics,
            poll_interval: config.poll_interval,
            discovery_interval: config.discovery_interval,
            availability_topic,
            last_discovery: None,
            last_availability: None,
        }
    }

    /// Run until cancelled, pushing messages onto the shared queue.
    ///
    /// A full queue blocks the poller rather than dropping messages.
    pub async fn run(mut self, queue: mpsc::Sender<Message>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            device = %self.host,
            interval_secs = self.poll_interval.as_secs(),
            "starting device poller"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // cancellation here aborts the in-flight requests
            let messages = tokio::select! {
                _ = cancel.cancelled() => break,
                messages = self.tick() => messages,
            };

            for message in messages {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = queue.send(message) => {
                        if sent.is_err() {
                            tracing::debug!(device = %self.host, "outbound queue closed, stopping");
                            return;
                        }
                    }
                }
            }
        }

        tracing::debug!(device = %self.host, "device poller stopped");
    }

    /// One tick: poll the device, derive availability, and build the
    /// tick's outbound messages in publish order.
    pub async fn tick(&mut self) -> Vec<Message> {
        let result = match self.poll().await {
            Ok(result) => Some(result),
            Err(error) => {
                tracing::warn!(device = %self.host, %error, "poll failed");
                None
            }
        };

        let availability = match result {
            Some(_) => Availability::Online,
            None => Availability::Offline,
        };

        let mut messages = Vec::new();
        if self.last_availability != Some(availability) {
            self.last_availability = Some(availability);
            messages.push(Message::text(
                self.availability_topic.clone(),
                availability.as_str(),
                true,
            ));
        }

        if let Some(result) = result {
            tracing::debug!(device = %self.host, name = %result.status2.name, "poll succeeded");
            let variables = variables_from_result(&result);
            if result.config.is_some() {
                match discovery_messages(&self.topics, &result, &variables) {
                    Ok(discovery) => messages.extend(discovery),
                    Err(error) => {
                        tracing::error!(device = %self.host, %error, "failed to encode discovery payload");
                    }
                }
            }
            messages.push(state_message(&result, &variables, unix_time()));
        }

        messages
    }

    /// Fetch the snapshots for one tick. Config is only fetched when the
    /// discovery interval has elapsed since the last successful fetch.
    async fn poll(&mut self) -> Result<PollResult, ClientError> {
        let discovery_due = self
            .last_discovery
            .is_none_or(|at| at.elapsed() >= self.discovery_interval);

        let config = if discovery_due {
            let config = self.client.fetch_config().await?;
            self.last_discovery = Some(Instant::now());
            Some(config)
        } else {
            None
        };

        let status2 = self.client.fetch_status(StatusKind::Extended).await?;
        let status3 = self.client.fetch_status(StatusKind::Print).await?;

        let name = topic_safe(&status2.name);
        Ok(PollResult {
            host: self.host.clone(),
            availability_topic: self.availability_topic.clone(),
            state_topic: self.topics.state(&name),
            name,
            config,
            status2,
            status3,
        })
    }
}

/// Current Unix time in seconds, with millisecond precision.
fn unix_time() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
