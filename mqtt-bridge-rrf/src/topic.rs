//! Topic names and the device-name slug transform.

/// Turn a device display name into a topic-safe slug.
///
/// MQTT wildcard and separator characters are spelled out, dashes and
/// colons collapse to underscores, and the result is trimmed and
/// lowercased.
pub fn topic_safe(name: &str) -> String {
    let slug = name
        .replace('/', "_slash_")
        .replace('#', "_hash_")
        .replace('+', "_plus_")
        .replace('-', "_")
        .replace(':', "_");
    slug.trim_matches('_').to_lowercase()
}

/// Builders for the bridge's topic layout.
#[derive(Debug, Clone)]
pub struct Topics {
    data_prefix: String,
    discovery_prefix: String,
}

impl Topics {
    pub fn new(data_prefix: impl Into<String>, discovery_prefix: impl Into<String>) -> Self {
        Self {
            data_prefix: data_prefix.into(),
            discovery_prefix: discovery_prefix.into(),
        }
    }

    /// `<data-prefix>/<name>/availability`
    pub fn availability(&self, name: &str) -> String {
        format!("{}/{}/availability", self.data_prefix, name)
    }

    /// The bridge-level availability topic, also used as the MQTT will.
    pub fn bridge_availability(&self) -> String {
        self.availability("bridge")
    }

    /// `<data-prefix>/<name>/state`
    pub fn state(&self, name: &str) -> String {
        format!("{}/{}/state", self.data_prefix, name)
    }

    /// `<discovery-prefix>/sensor/<name>_<field>/config`
    pub fn discovery(&self, name: &str, field: &str) -> String {
        format!("{}/sensor/{}_{}/config", self.discovery_prefix, name, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_spells_out_mqtt_specials() {
        assert_eq!(topic_safe("Mock/RRF#1"), "mock_slash_rrf_hash_1");
        assert_eq!(topic_safe("a+b"), "a_plus_b");
    }

    #[test]
    fn slug_collapses_and_trims_punctuation() {
        assert_eq!(topic_safe("My-Printer:1"), "my_printer_1");
        assert_eq!(topic_safe("-edgy-"), "edgy");
        assert_eq!(topic_safe("__x__"), "x");
    }

    #[test]
    fn topic_layout() {
        let topics = Topics::new("rrfdata", "rrfdisc");
        assert_eq!(topics.availability("mockrrf"), "rrfdata/mockrrf/availability");
        assert_eq!(topics.bridge_availability(), "rrfdata/bridge/availability");
        assert_eq!(topics.state("mockrrf"), "rrfdata/mockrrf/state");
        assert_eq!(
            topics.discovery("mockrrf", "state_code"),
            "rrfdisc/sensor/mockrrf_state_code/config"
        );
    }
}
