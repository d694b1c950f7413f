//! Outbound message construction: Home Assistant discovery documents
//! and the per-tick state payload.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::poller::PollResult;
use crate::topic::Topics;
use crate::variables::{DeviceClass, Variable};

const DEFAULT_ICON: &str = "mdi:printer-3d";

/// An outbound MQTT message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl Message {
    /// A message with a JSON-encoded body.
    pub fn json<T: Serialize>(
        topic: impl Into<String>,
        body: &T,
        retain: bool,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic: topic.into(),
            payload: serde_json::to_vec(body)?,
            retain,
        })
    }

    /// A message with a plain-text body.
    pub fn text(topic: impl Into<String>, body: impl Into<String>, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: body.into().into_bytes(),
            retain,
        }
    }
}

/// Reference to an availability topic in a discovery document.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityRef {
    pub topic: String,
}

/// The `device` block tying all of a printer's sensors together in the
/// Home Assistant registry.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub configuration_url: String,
    pub name: String,
    pub sw_version: String,
    pub model: String,
}

/// A Home Assistant MQTT sensor registration document.
#[derive(Debug, Clone, Serialize)]
pub struct Sensor {
    pub availability: Vec<AvailabilityRef>,
    pub device: DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    pub icon: &'static str,
    pub name: String,
    pub state_topic: String,
    pub unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    pub value_template: String,
}

/// Build one retained discovery message per variable.
///
/// Returns nothing when the poll result carries no config snapshot;
/// discovery is only re-announced on ticks that freshly fetched one.
pub fn discovery_messages(
    topics: &Topics,
    result: &PollResult,
    variables: &[Variable],
) -> Result<Vec<Message>, serde_json::Error> {
    let Some(config) = &result.config else {
        return Ok(Vec::new());
    };

    let availability = vec![
        AvailabilityRef {
            topic: topics.bridge_availability(),
        },
        AvailabilityRef {
            topic: result.availability_topic.clone(),
        },
    ];
    let real_name = &result.status2.name;
    let sw_version = format!(
        "{} v{} ({})",
        config.firmware_name, config.firmware_version, config.firmware_date
    );

    let mut messages = Vec::with_capacity(variables.len());
    for variable in variables {
        let unique_id = format!("{}_{}", result.name, variable.field);
        let sensor = Sensor {
            availability: availability.clone(),
            device: DeviceInfo {
                identifiers: vec![result.name.clone(), unique_id.clone()],
                configuration_url: format!("http://{}", result.host),
                name: real_name.clone(),
                sw_version: sw_version.clone(),
                model: config.firmware_electronics.clone(),
            },
            device_class: variable.device_class,
            icon: variable.icon.unwrap_or(DEFAULT_ICON),
            name: format!("{} {}", real_name, variable.field),
            state_topic: result.state_topic.clone(),
            unique_id,
            unit_of_measurement: variable.units,
            value_template: format!("{{{{ value_json.{}}}}}", variable.field),
        };
        messages.push(Message::json(
            topics.discovery(&result.name, &variable.field),
            &sensor,
            true,
        )?);
    }
    Ok(messages)
}

/// Build the per-tick state message: every variable keyed by field,
/// plus `t` with the publish time in fractional epoch seconds.
pub fn state_message(result: &PollResult, variables: &[Variable], timestamp: f64) -> Message {
    let mut body = Map::with_capacity(variables.len() + 1);
    body.insert("t".to_string(), timestamp.into());
    for variable in variables {
        body.insert(variable.field.clone(), variable.value.clone());
    }

    Message {
        topic: result.state_topic.clone(),
        payload: Value::Object(body).to_string().into_bytes(),
        retain: false,
    }
}
