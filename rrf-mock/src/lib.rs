//! Mock RepRapFirmware device server.
//!
//! Serves the `rr_*` HTTP endpoints of a Duet controller with
//! deterministic canned telemetry: the virtual print head sweeps a
//! circle and the heater temperatures ride a small sinusoid, both
//! driven by a counter that advances on every status request. After
//! 100 status polls the "print" finishes and the device reports idle.
//!
//! Auth-gated endpoints return 401 until a successful `rr_connect`,
//! and individual requests can be failed by index to exercise error
//! paths in callers.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;

use rrf_api::types::{
    AuthResponse, ConfigResponse, MachineStatus, MinCurMax, Params, Probe, RrfBool, Speeds,
    StatusCoords, StatusResponse, Temp, TempState, Temps, TimesLeft, Tool, ToolTemps,
};

/// Passwords the mock accepts, mirroring the firmware's default.
const PASSWORDS: [&str; 2] = ["passw0rd", "reprap"];

const TO_RAD: f64 = 0.017_453_3;

/// Half the travel of the virtual axes, in mm.
const TRAVEL: f64 = 100.0;

#[derive(Debug, Default)]
struct MockState {
    auth: bool,
    count: f64,
    requests: usize,
    fail_set: HashSet<usize>,
}

type SharedState = Arc<Mutex<MockState>>;

/// A mock device instance.
///
/// Clones share the same session and counter state, so a router and
/// its owning test see the same world.
#[derive(Debug, Clone, Default)]
pub struct MockRrf {
    state: SharedState,
}

impl MockRrf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the Nth requests (0-based, counted across all endpoints)
    /// with HTTP 401 before they reach a handler.
    pub fn with_fail_set(self, fail_set: HashSet<usize>) -> Self {
        self.state.lock().fail_set = fail_set;
        self
    }

    /// Build the axum router serving the device endpoints.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/rr_connect", get(connect))
            .route("/rr_config", get(config))
            .route("/rr_status", get(status))
            .route("/rr_reply", get(reply))
            .route("/rr_gcode", get(gcode))
            .route("/rr_filelist", get(filelist))
            .route("/rr_fileinfo", get(fileinfo))
            .route("/rr_download", get(download))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                inject_failures,
            ))
            .with_state(self.state.clone())
    }

    /// Serve on an already-bound listener until the task is dropped.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "mock device listening");
        }
        axum::serve(listener, self.router()).await
    }
}

/// Count every request and 401 the scripted failures.
async fn inject_failures(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let fail = {
        let mut state = state.lock();
        let n = state.requests;
        state.requests += 1;
        state.fail_set.contains(&n)
    };

    tracing::debug!(uri = %request.uri(), fail, "mock request");
    if fail {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    #[serde(default)]
    password: String,
}

async fn connect(
    State(state): State<SharedState>,
    Query(params): Query<ConnectParams>,
) -> Json<AuthResponse> {
    if PASSWORDS.contains(&params.password.as_str()) {
        state.lock().auth = true;
        Json(auth_response())
    } else {
        Json(AuthResponse {
            error_code: 1,
            ..AuthResponse::default()
        })
    }
}

async fn config(State(state): State<SharedState>) -> Response {
    if !state.lock().auth {
        return unauthorized();
    }
    Json(config_response()).into_response()
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    #[serde(default, rename = "type")]
    kind: String,
}

async fn status(State(state): State<SharedState>, Query(params): Query<StatusParams>) -> Response {
    let count = {
        let mut state = state.lock();
        if !state.auth {
            return unauthorized();
        }
        let count = state.count;
        state.count += 1.0;
        count
    };

    // anything other than 1..=3 is treated as a type 1 request
    let kind = match params.kind.parse::<u8>() {
        Ok(k @ 1..=3) => k,
        _ => 1,
    };

    Json(status_response(kind, count)).into_response()
}

async fn reply(State(state): State<SharedState>) -> Response {
    if !state.lock().auth {
        return unauthorized();
    }
    String::new().into_response()
}

async fn gcode(State(state): State<SharedState>) -> Response {
    if !state.lock().auth {
        return unauthorized();
    }
    Json(json!({ "buff": 250 })).into_response()
}

#[derive(Debug, Deserialize)]
struct FilelistParams {
    #[serde(default)]
    dir: String,
}

async fn filelist(
    State(state): State<SharedState>,
    Query(params): Query<FilelistParams>,
) -> Response {
    if !state.lock().auth {
        return unauthorized();
    }
    Json(json!({
        "dir": params.dir,
        "first": 0,
        "files": [],
        "next": 0,
    }))
    .into_response()
}

async fn fileinfo(State(state): State<SharedState>) -> Response {
    if !state.lock().auth {
        return unauthorized();
    }
    Json(json!({ "err": 1 })).into_response()
}

async fn download(State(state): State<SharedState>) -> Response {
    if !state.lock().auth {
        return unauthorized();
    }
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorised").into_response()
}

fn round3(f: f64) -> f64 {
    (f * 1000.0).round() / 1000.0
}

/// The auth payload returned on a successful `rr_connect`.
pub fn auth_response() -> AuthResponse {
    AuthResponse {
        error_code: 0,
        session_timeout: 8000.0,
        board_type: "mockrrf".to_string(),
    }
}

/// The canned `rr_config` payload.
pub fn config_response() -> ConfigResponse {
    ConfigResponse {
        axis_mins: vec![-TRAVEL, -TRAVEL, 0.0],
        axis_maxes: vec![TRAVEL, TRAVEL, 2.0 * TRAVEL],
        accelerations: vec![3000.0, 3000.0, 3000.0, 1000.0],
        currents: vec![800.0, 800.0, 800.0, 500.0],
        firmware_electronics: "Duet WiFi 1.0 or 1.01".to_string(),
        firmware_name: "RepRapFirmware for Duet 2 WiFi/Ethernet".to_string(),
        firmware_version: "2.05.1".to_string(),
        dws_version: "1.23".to_string(),
        firmware_date: "2020-02-09b1".to_string(),
        sys_dir: "0:/sys/".to_string(),
        idle_current_factor: 60.0,
        idle_timeout: 30.0,
        min_feed_rates: vec![20.0, 20.0, 20.0, 10.0],
        max_feed_rates: vec![300.0, 300.0, 300.0, 60.0],
    }
}

/// The canned `rr_status` payload for a given type and poll counter.
pub fn status_response(kind: u8, count: f64) -> StatusResponse {
    let mut s = StatusResponse {
        status: MachineStatus::Printing,
        coordinates: StatusCoords {
            axes_homed: vec![RrfBool(true), RrfBool(true), RrfBool(true)],
            extruder: vec![0.0],
            xyz: vec![0.0, 0.0, 0.0],
            machine: vec![0.0, 0.0, 0.0],
            ..StatusCoords::default()
        },
        speeds: Speeds {
            requested: 20.0,
            top: 30.0,
        },
        current_tool: 0,
        params: Params {
            fan_percent: vec![0.0, 50.0],
            speed_factor: 100.0,
            extruder_factors: vec![100.0],
            ..Params::default()
        },
        temps: Temps {
            current: vec![80.0, 200.0, 2000.0, 2000.0],
            state: vec![
                TempState::Active,
                TempState::Active,
                TempState::Off,
                TempState::Off,
            ],
            names: vec![
                "bed".to_string(),
                String::new(),
                String::new(),
                String::new(),
            ],
            tools: ToolTemps {
                active: vec![vec![0.0]],
                standby: vec![vec![0.0]],
            },
            bed: Temp::default(),
            chamber: Temp::default(),
            heads: Temp::default(),
            extra: vec![],
        },
        ..StatusResponse::default()
    };

    match kind {
        2 => {
            s.cold_extrude_temp = 160.0;
            s.cold_retract_temp = 90.0;
            s.compensation = "None".to_string();
            s.controllable_fans = 2;
            s.temp_limit = 290.0;
            s.endstops = 4080;
            s.firmware_name = "RepRapFirmware for Duet 2 WiFi/Ethernet".to_string();
            s.geometry = "delta".to_string();
            s.axes = 3;
            s.total_axes = 3;
            s.axis_names = "XYZ".to_string();
            s.volumes = 2;
            s.mounted_volumes = 1;
            s.params.fan_names = vec![String::new(), "print".to_string()];
            s.name = "MockRRF".to_string();
            s.probe = Probe {
                threshold: 500,
                height: -0.2,
                probe_type: 4,
            };
            s.tools = vec![Tool {
                number: 0,
                heaters: vec![1],
                drives: vec![0],
                axis_map: vec![vec![0], vec![1]],
                fans: 1,
                offsets: vec![0.0, 0.0, 0.0],
                ..Tool::default()
            }];
            s.mcu_temp = Some(MinCurMax {
                min: 31.0,
                cur: 38.4,
                max: 38.6,
            });
            s.vin = Some(MinCurMax {
                min: 11.9,
                cur: 12.1,
                max: 12.2,
            });
        }
        3 => {
            s.current_layer_time = 20.0;
            s.extr_raw = vec![0.0];
            s.first_layer_duration = 10.0;
            s.first_layer_height = 0.2;
            s.warm_up_duration = 2.0;
        }
        _ => {}
    }

    s.up_time = count;

    if count > 100.0 {
        s.status = MachineStatus::Idle;
        return s;
    }

    let rad = count * TO_RAD;
    let sin = rad.sin();
    let cos = rad.cos();
    let xyz = vec![
        round3(TRAVEL * cos),
        round3(TRAVEL * sin),
        round3(TRAVEL + TRAVEL * sin),
    ];

    s.temps.current = vec![
        round3(80.0 + 5.0 * sin),
        round3(200.0 + 5.0 * cos),
        2000.0,
        2000.0,
    ];
    s.coordinates.xyz = xyz.clone();
    s.coordinates.machine = xyz;

    if kind != 3 {
        return s;
    }

    let left = (100.0 - count) * 20.0;
    s.print_duration = count;
    s.times_left = TimesLeft {
        file: left,
        filament: left,
        layer: left,
    };
    s.current_layer = count as u32;
    s.fraction_printed = count;
    s.file_position = (20.0 * count) as u64;

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_finishes_after_one_hundred_polls() {
        assert_eq!(status_response(2, 50.0).status, MachineStatus::Printing);
        assert_eq!(status_response(2, 150.0).status, MachineStatus::Idle);
    }

    #[test]
    fn type_two_carries_board_properties() {
        let s2 = status_response(2, 0.0);
        assert_eq!(s2.name, "MockRRF");
        assert_eq!(s2.geometry, "delta");
        assert_eq!(s2.axes, 3);
        assert!(s2.mcu_temp.is_some());

        let s1 = status_response(1, 0.0);
        assert!(s1.name.is_empty());
        assert!(s1.mcu_temp.is_none());
    }

    #[test]
    fn type_three_tracks_print_progress() {
        let s3 = status_response(3, 10.0);
        assert_eq!(s3.current_layer, 10);
        assert_eq!(s3.times_left.file, 1800.0);
        assert_eq!(s3.file_position, 200);

        // progress fields stay at defaults for other types
        let s2 = status_response(2, 10.0);
        assert_eq!(s2.current_layer, 0);
        assert_eq!(s2.times_left, TimesLeft::default());
    }

    #[test]
    fn motion_follows_the_counter() {
        let s = status_response(1, 0.0);
        assert_eq!(s.coordinates.xyz, vec![100.0, 0.0, 100.0]);
        assert_eq!(s.temps.current[0], 80.0);
        assert_eq!(s.temps.current[1], 205.0);

        let s = status_response(1, 30.0);
        assert!(s.coordinates.xyz[1] > 0.0);
        assert_eq!(s.up_time, 30.0);
    }
}
