// MIT License - Copyright (c) 2026 the hms2mqtt authors

/// Envelope result code for a successful request.
pub const API_CODE_OK: i64 = 1;

/// `conn_state` value reported for a device that has dropped off the cloud.
/// Any other value counts as connected.
pub const CONN_STATE_OFFLINE: i64 = 0;

/// Request header carrying the API key id. Lowercase for `HeaderName::from_static`.
pub const HEADER_KEY_ID: &str = "x-key-id";

/// Request header carrying the API key secret.
pub const HEADER_API_KEY: &str = "x-api-key";

/// Monitoring-profile collection path (identifier resolution).
pub const PATH_PROFILE: &str = "/v1/monitoring/profile";

/// Device record path prefix; the device id is appended.
pub const PATH_DEVICES: &str = "/v1/devices";

/// Default per-request timeout for cloud calls, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
