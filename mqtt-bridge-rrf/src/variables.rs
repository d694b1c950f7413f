//! Extraction of published variables from a poll result.

use serde::Serialize;
use serde_json::Value;

use rrf_api::types::MachineStatus;

use crate::poller::PollResult;
use crate::topic::topic_safe;

/// Sensors reporting above this are disconnected and not published.
const SENSOR_DISCONNECTED: f64 = 1000.0;

const CELSIUS: &str = "°C";
const VOLTS: &str = "V";

const AXIS_ICONS: [&str; 3] = [
    "mdi:axis-x-arrow",
    "mdi:axis-y-arrow",
    "mdi:axis-z-arrow",
];
const EXTRUDER_ICON: &str = "mdi:printer-3d-nozzle";

/// Home Assistant device class for a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Temperature,
    Voltage,
}

/// One named scalar extracted from a poll result.
///
/// `field` is the key used in both the state payload and the discovery
/// value template, so it must be stable across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub field: String,
    pub icon: Option<&'static str>,
    pub units: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub value: Value,
}

/// Graphable mapping of the machine state: 1 for the idle/busy family,
/// 2 for the error family, 3 for the active-print family.
pub fn state_code(status: MachineStatus) -> i64 {
    match status {
        MachineStatus::Configuring | MachineStatus::Idle | MachineStatus::Busy => 1,
        MachineStatus::Stopped | MachineStatus::Halted | MachineStatus::Flashing => 2,
        MachineStatus::Printing
        | MachineStatus::Pausing
        | MachineStatus::Resuming
        | MachineStatus::ToolChanging => 3,
        MachineStatus::Unknown => 0,
    }
}

/// Map a poll result to its published variables.
///
/// The fixed portion is a declarative (field, units, class, value)
/// table; rows whose source group is absent contribute nothing. Order
/// only matters for discovery-message emission order.
pub fn variables_from_result(result: &PollResult) -> Vec<Variable> {
    let s2 = &result.status2;
    let s3 = &result.status3;

    type Row = (
        &'static str,
        Option<&'static str>,
        Option<DeviceClass>,
        Option<Value>,
    );

    let fixed: Vec<Row> = vec![
        ("state", None, None, Some(s2.status.label().into())),
        ("state_code", None, None, Some(state_code(s2.status).into())),
        ("file_time_remaining", None, None, Some(s3.times_left.file.into())),
        ("filament_time_remaining", None, None, Some(s3.times_left.filament.into())),
        ("layer_time_remaining", None, None, Some(s3.times_left.layer.into())),
        ("mcu_temp_min", Some(CELSIUS), Some(DeviceClass::Temperature), s2.mcu_temp.map(|t| t.min.into())),
        ("mcu_temp_cur", Some(CELSIUS), Some(DeviceClass::Temperature), s2.mcu_temp.map(|t| t.cur.into())),
        ("mcu_temp_max", Some(CELSIUS), Some(DeviceClass::Temperature), s2.mcu_temp.map(|t| t.max.into())),
        ("vin_min", Some(VOLTS), Some(DeviceClass::Voltage), s2.vin.map(|v| v.min.into())),
        ("vin_cur", Some(VOLTS), Some(DeviceClass::Voltage), s2.vin.map(|v| v.cur.into())),
        ("vin_max", Some(VOLTS), Some(DeviceClass::Voltage), s2.vin.map(|v| v.max.into())),
        ("geometry", None, None, Some(s2.geometry.clone().into())),
        ("layer", None, None, Some(s3.current_layer.into())),
        ("requested_speed", None, None, Some(s2.speeds.requested.into())),
        ("top_speed", None, None, Some(s2.speeds.top.into())),
    ];

    let mut variables: Vec<Variable> = Vec::with_capacity(fixed.len() + 8);
    for (field, units, device_class, value) in fixed {
        if let Some(value) = value {
            variables.push(Variable {
                field: field.to_string(),
                icon: None,
                units,
                device_class,
                value,
            });
        }
    }

    // positional axes, only for the ordinary three-axis layout
    if s2.coordinates.xyz.len() == 3 {
        for (i, axis) in ["x", "y", "z"].into_iter().enumerate() {
            variables.push(Variable {
                field: axis.to_string(),
                icon: Some(AXIS_ICONS[i]),
                units: None,
                device_class: None,
                value: s2.coordinates.xyz[i].into(),
            });
        }
    }

    for (i, position) in s2.coordinates.extruder.iter().enumerate() {
        variables.push(Variable {
            field: format!("e{i}"),
            icon: Some(EXTRUDER_ICON),
            units: None,
            device_class: None,
            value: (*position).into(),
        });
    }

    for (i, reading) in s2.temps.current.iter().enumerate() {
        if *reading > SENSOR_DISCONNECTED {
            continue;
        }
        let fallback = format!("temp{i}");
        let mut field = s2
            .temps
            .names
            .get(i)
            .filter(|name| !name.is_empty())
            .map(|name| topic_safe(name))
            .unwrap_or_else(|| fallback.clone());
        // a reported name that normalizes to nothing, or collides with a
        // field already taken (another sensor claiming "bed", say), keeps
        // its positional name instead
        if field.is_empty() || variables.iter().any(|v| v.field == field) {
            field = fallback;
        }
        variables.push(Variable {
            field,
            icon: None,
            units: Some(CELSIUS),
            device_class: Some(DeviceClass::Temperature),
            value: (*reading).into(),
        });
    }

    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrf_api::types::{MinCurMax, StatusResponse, Temps};

    fn result_with(status2: StatusResponse, status3: StatusResponse) -> PollResult {
        PollResult {
            host: "printer.local".to_string(),
            name: "printer".to_string(),
            availability_topic: "rrfdata/printer_local/availability".to_string(),
            state_topic: "rrfdata/printer/state".to_string(),
            config: None,
            status2,
            status3,
        }
    }

    fn find<'a>(variables: &'a [Variable], field: &str) -> Option<&'a Variable> {
        variables.iter().find(|v| v.field == field)
    }

    #[test]
    fn extracts_mcu_temperature_with_units_and_class() {
        let status2 = StatusResponse {
            status: MachineStatus::Printing,
            mcu_temp: Some(MinCurMax {
                min: 31.0,
                cur: 38.4,
                max: 38.6,
            }),
            ..StatusResponse::default()
        };
        let variables = variables_from_result(&result_with(status2, StatusResponse::default()));

        let cur = find(&variables, "mcu_temp_cur").expect("mcu_temp_cur present");
        assert_eq!(cur.units, Some("°C"));
        assert_eq!(cur.device_class, Some(DeviceClass::Temperature));
        assert_eq!(cur.value, Value::from(38.4));
    }

    #[test]
    fn absent_reading_groups_contribute_nothing() {
        let variables =
            variables_from_result(&result_with(StatusResponse::default(), StatusResponse::default()));
        assert!(find(&variables, "mcu_temp_cur").is_none());
        assert!(find(&variables, "vin_cur").is_none());
        // the unconditional rows are still there
        assert!(find(&variables, "state").is_some());
        assert!(find(&variables, "state_code").is_some());
    }

    #[test]
    fn state_codes_by_family() {
        assert_eq!(state_code(MachineStatus::Idle), 1);
        assert_eq!(state_code(MachineStatus::Busy), 1);
        assert_eq!(state_code(MachineStatus::Halted), 2);
        assert_eq!(state_code(MachineStatus::Flashing), 2);
        assert_eq!(state_code(MachineStatus::Printing), 3);
        assert_eq!(state_code(MachineStatus::ToolChanging), 3);
    }

    #[test]
    fn axes_only_emitted_for_three_axis_layout() {
        let mut status2 = StatusResponse::default();
        status2.coordinates.xyz = vec![1.0, 2.0, 3.0];
        let variables = variables_from_result(&result_with(status2, StatusResponse::default()));
        assert_eq!(find(&variables, "x").unwrap().value, Value::from(1.0));
        assert_eq!(find(&variables, "z").unwrap().icon, Some("mdi:axis-z-arrow"));

        let mut status2 = StatusResponse::default();
        status2.coordinates.xyz = vec![1.0, 2.0, 3.0, 4.0];
        let variables = variables_from_result(&result_with(status2, StatusResponse::default()));
        assert!(find(&variables, "x").is_none());
    }

    #[test]
    fn one_entry_per_extruder_drive() {
        let mut status2 = StatusResponse::default();
        status2.coordinates.extruder = vec![10.0, 20.0];
        let variables = variables_from_result(&result_with(status2, StatusResponse::default()));
        assert_eq!(find(&variables, "e0").unwrap().value, Value::from(10.0));
        assert_eq!(find(&variables, "e1").unwrap().value, Value::from(20.0));
    }

    #[test]
    fn disconnected_sensors_are_skipped() {
        let status2 = StatusResponse {
            temps: Temps {
                current: vec![80.0, 200.0, 2000.0],
                names: vec!["bed".to_string(), String::new(), String::new()],
                ..Temps::default()
            },
            ..StatusResponse::default()
        };
        let variables = variables_from_result(&result_with(status2, StatusResponse::default()));

        assert_eq!(find(&variables, "bed").unwrap().value, Value::from(80.0));
        assert_eq!(find(&variables, "temp1").unwrap().value, Value::from(200.0));
        assert!(find(&variables, "temp2").is_none());
    }

    #[test]
    fn sensor_names_are_normalized_and_deduplicated() {
        let status2 = StatusResponse {
            temps: Temps {
                current: vec![80.0, 200.0, 60.0],
                names: vec![
                    "bed".to_string(),
                    "Heater-1".to_string(),
                    "bed".to_string(),
                ],
                ..Temps::default()
            },
            ..StatusResponse::default()
        };
        let variables = variables_from_result(&result_with(status2, StatusResponse::default()));

        assert!(find(&variables, "bed").is_some());
        assert!(find(&variables, "heater_1").is_some());
        // second sensor claiming "bed" falls back to its positional name
        assert_eq!(find(&variables, "temp2").unwrap().value, Value::from(60.0));
    }

    #[test]
    fn fixed_rows_come_before_conditional_ones() {
        let status2 = StatusResponse {
            mcu_temp: Some(MinCurMax::default()),
            vin: Some(MinCurMax::default()),
            ..StatusResponse::default()
        };
        let variables = variables_from_result(&result_with(status2, StatusResponse::default()));
        let fields: Vec<&str> = variables.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            &fields[..5],
            &[
                "state",
                "state_code",
                "file_time_remaining",
                "filament_time_remaining",
                "layer_time_remaining"
            ]
        );
        assert_eq!(fields[fields.len() - 2], "requested_speed");
        assert_eq!(fields[fields.len() - 1], "top_speed");
    }
}
