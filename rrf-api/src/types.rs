//! Wire types for the RepRapFirmware legacy HTTP interface.
//!
//! Field names and encodings follow what the firmware actually emits,
//! including its integer-encoded booleans and the scalar-or-array fan
//! RPM quirk.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Durations on the wire are plain floating-point seconds.
pub type Seconds = f64;

/// Response to `rr_connect`.
///
/// `err` is zero on success; non-zero values are firmware error codes
/// (1 = wrong password, 2 = no more sessions available).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(rename = "err")]
    pub error_code: i32,
    pub session_timeout: Seconds,
    pub board_type: String,
}

/// Response to `rr_config`: static and slow-changing device metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigResponse {
    pub axis_mins: Vec<f64>,
    pub axis_maxes: Vec<f64>,
    pub accelerations: Vec<f64>,
    pub currents: Vec<f64>,
    pub firmware_electronics: String,
    pub firmware_name: String,
    pub firmware_version: String,
    pub dws_version: String,
    pub firmware_date: String,
    #[serde(rename = "sysdir")]
    pub sys_dir: String,
    pub idle_current_factor: f64,
    pub idle_timeout: f64,
    #[serde(rename = "minFeedrates")]
    pub min_feed_rates: Vec<f64>,
    #[serde(rename = "maxFeedrates")]
    pub max_feed_rates: Vec<f64>,
}

/// Response to `rr_status?type={1|2|3}`.
///
/// Type 1 carries the core telemetry, type 2 adds the extended
/// properties and type 3 the print-progress extensions. Fields absent
/// from a given type decode to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: MachineStatus,
    #[serde(rename = "coords")]
    pub coordinates: StatusCoords,
    pub speeds: Speeds,
    pub current_tool: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Output>,
    pub params: Params,
    pub seq: u64,
    pub sensors: Sensors,
    pub temps: Temps,
    pub resp: String,
    #[serde(rename = "time")]
    pub up_time: Seconds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner: Option<Scanner>,
    pub spindles: Vec<Spindle>,

    // type 2 properties
    pub cold_extrude_temp: f64,
    pub cold_retract_temp: f64,
    pub compensation: String,
    pub controllable_fans: u32,
    pub temp_limit: f64,
    pub endstops: u32,
    pub firmware_name: String,
    pub geometry: String,
    pub axes: usize,
    pub total_axes: usize,
    pub axis_names: String,
    pub volumes: u32,
    pub mounted_volumes: u32,
    pub name: String,
    pub probe: Probe,
    pub tools: Vec<Tool>,
    #[serde(rename = "mcutemp", skip_serializing_if = "Option::is_none")]
    pub mcu_temp: Option<MinCurMax>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin: Option<MinCurMax>,

    // type 3 properties
    pub current_layer: u32,
    pub current_layer_time: Seconds,
    pub extr_raw: Vec<f64>,
    pub fraction_printed: f64,
    pub file_position: u64,
    pub first_layer_duration: Seconds,
    pub first_layer_height: f64,
    pub print_duration: Seconds,
    pub warm_up_duration: Seconds,
    pub times_left: TimesLeft,
}

/// Machine operating state, a single status letter on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MachineStatus {
    Configuring,
    Idle,
    Busy,
    Printing,
    Pausing,
    Stopped,
    Resuming,
    Halted,
    Flashing,
    ToolChanging,
    /// Any letter this crate does not know about.
    #[default]
    Unknown,
}

impl MachineStatus {
    /// The single-letter wire encoding.
    pub fn letter(&self) -> &'static str {
        match self {
            MachineStatus::Configuring => "C",
            MachineStatus::Idle => "I",
            MachineStatus::Busy => "B",
            MachineStatus::Printing => "P",
            MachineStatus::Pausing => "D",
            MachineStatus::Stopped => "S",
            MachineStatus::Resuming => "R",
            MachineStatus::Halted => "H",
            MachineStatus::Flashing => "F",
            MachineStatus::ToolChanging => "T",
            MachineStatus::Unknown => "",
        }
    }

    /// Decode a status letter, tolerating unknown values.
    pub fn from_letter(s: &str) -> Self {
        match s {
            "C" => MachineStatus::Configuring,
            "I" => MachineStatus::Idle,
            "B" => MachineStatus::Busy,
            "P" => MachineStatus::Printing,
            "D" => MachineStatus::Pausing,
            "S" => MachineStatus::Stopped,
            "R" => MachineStatus::Resuming,
            "H" => MachineStatus::Halted,
            "F" => MachineStatus::Flashing,
            "T" => MachineStatus::ToolChanging,
            _ => MachineStatus::Unknown,
        }
    }

    /// Human-readable label used in published telemetry.
    pub fn label(&self) -> &'static str {
        match self {
            MachineStatus::Configuring => "configuring",
            MachineStatus::Idle => "idle",
            MachineStatus::Busy => "busy",
            MachineStatus::Printing => "printing",
            MachineStatus::Pausing => "pausing",
            MachineStatus::Stopped => "stopped",
            MachineStatus::Resuming => "resuming",
            MachineStatus::Halted => "halted",
            MachineStatus::Flashing => "flashing",
            MachineStatus::ToolChanging => "toolchanging",
            MachineStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for MachineStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.letter())
    }
}

impl<'de> Deserialize<'de> for MachineStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(MachineStatus::from_letter(&s))
    }
}

/// Boolean encoded as `0`/`1` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RrfBool(pub bool);

impl From<bool> for RrfBool {
    fn from(b: bool) -> Self {
        RrfBool(b)
    }
}

impl From<RrfBool> for bool {
    fn from(b: RrfBool) -> Self {
        b.0
    }
}

impl Serialize for RrfBool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(self.0))
    }
}

impl<'de> Deserialize<'de> for RrfBool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = u8::deserialize(deserializer)?;
        Ok(RrfBool(v == 1))
    }
}

/// Axis coordinates and extrusion state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusCoords {
    pub axes_homed: Vec<RrfBool>,
    #[serde(rename = "extr")]
    pub extruder: Vec<f64>,
    #[serde(rename = "wpl")]
    pub workplace_system: i32,
    pub xyz: Vec<f64>,
    pub machine: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Speeds {
    pub requested: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Output {
    pub beep_duration: i32,
    pub beep_frequency: i32,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Params {
    pub atx_power: RrfBool,
    pub fan_percent: Vec<f64>,
    pub fan_names: Vec<String>,
    pub speed_factor: f64,
    #[serde(rename = "extrFactors")]
    pub extruder_factors: Vec<f64>,
    #[serde(rename = "babystep")]
    pub baby_step: f64,
}

/// Fan RPM readings.
///
/// Older firmware revisions emit a single bare number instead of an
/// array when only one fan is fitted; both encodings decode to a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanRpms(pub Vec<f64>);

impl Serialize for FanRpms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FanRpms {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Many(Vec<f64>),
            One(f64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Many(v) => Ok(FanRpms(v)),
            Repr::One(v) => Ok(FanRpms(vec![v])),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Sensors {
    pub probe_value: f64,
    pub probe_secondary: Vec<f64>,
    #[serde(rename = "fanRPM")]
    pub fan_rpm: FanRpms,
}

/// Heater state, an integer on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TempState {
    #[default]
    Off,
    Standby,
    Active,
    Fault,
}

impl TempState {
    pub fn label(&self) -> &'static str {
        match self {
            TempState::Off => "off",
            TempState::Standby => "standby",
            TempState::Active => "active",
            TempState::Fault => "fault",
        }
    }
}

impl Serialize for TempState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            TempState::Off => 0,
            TempState::Standby => 1,
            TempState::Active => 2,
            TempState::Fault => 3,
        })
    }
}

impl<'de> Deserialize<'de> for TempState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match u8::deserialize(deserializer)? {
            1 => TempState::Standby,
            2 => TempState::Active,
            3 => TempState::Fault,
            _ => TempState::Off,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Temp {
    pub current: f64,
    pub active: f64,
    pub standby: f64,
    pub state: TempState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolTemps {
    pub active: Vec<Vec<f64>>,
    pub standby: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Temps {
    pub bed: Temp,
    pub chamber: Temp,
    pub heads: Temp,
    pub tools: ToolTemps,
    /// One reading per configured sensor; values above 1000 mark a
    /// disconnected sensor.
    pub current: Vec<f64>,
    pub state: Vec<TempState>,
    pub names: Vec<String>,
    pub extra: Vec<ExtraTemp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtraTemp {
    pub name: String,
    pub temp: f64,
}

/// 3D scanner state, a single status letter on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScannerStatus {
    #[serde(rename = "D")]
    Disconnected,
    #[serde(rename = "I")]
    Idle,
    #[serde(rename = "S")]
    Scanning,
    #[serde(rename = "U")]
    Uploading,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scanner {
    pub status: ScannerStatus,
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Spindle {
    pub current: f64,
    pub active: f64,
    pub tool: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Probe {
    pub threshold: i32,
    pub height: f64,
    #[serde(rename = "type")]
    pub probe_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tool {
    pub number: i32,
    pub name: String,
    pub heaters: Vec<i32>,
    pub drives: Vec<i32>,
    pub axis_map: Vec<Vec<i32>>,
    pub fans: i32,
    pub filament: String,
    pub offsets: Vec<f64>,
}

/// A min/current/max reading group (MCU temperature, input voltage).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinCurMax {
    pub min: f64,
    pub cur: f64,
    pub max: f64,
}

/// Estimated times remaining, by extrapolation source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimesLeft {
    pub file: Seconds,
    pub filament: Seconds,
    pub layer: Seconds,
}
