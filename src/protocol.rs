// MIT License - Copyright (c) 2026 the hms2mqtt authors

use serde::{Deserialize, Serialize};

use crate::constants::{API_CODE_OK, PATH_DEVICES, PATH_PROFILE};
use crate::error::{ApiErrorCode, HmsError};

/// JSON envelope wrapping every cloud response.
///
/// The ok code is `1`; any other code is an error, with `msg` carrying the
/// service's explanation.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, mapping non-ok codes onto [`HmsError`].
    pub fn into_data(self) -> Result<T, HmsError> {
        if self.code != API_CODE_OK {
            return Err(self.reject());
        }
        self.data.ok_or_else(|| HmsError::InvalidResponse {
            details: "ok envelope without a data field".to_string(),
        })
    }

    /// Check the envelope code, discarding any payload. Used for one-way
    /// calls where the service returns no meaningful data.
    pub fn ok(self) -> Result<(), HmsError> {
        if self.code == API_CODE_OK {
            Ok(())
        } else {
            Err(self.reject())
        }
    }

    fn reject(self) -> HmsError {
        match ApiErrorCode::from_code(self.code) {
            Some(code) => HmsError::Api(code),
            None => HmsError::UnknownApiCode {
                code: self.code,
                msg: self.msg,
            },
        }
    }
}

/// Payload of the monitoring-profile lookup.
#[derive(Debug, Deserialize)]
pub struct ProfileData {
    pub profile_id: String,
}

/// Payload of the profile status endpoint.
#[derive(Debug, Deserialize)]
pub struct StatusData {
    pub status: String,
    pub conn_state: i64,
    #[serde(default)]
    pub updated_ms: Option<u64>,
}

/// Payload of the device record endpoint.
#[derive(Debug, Deserialize)]
pub struct DeviceData {
    pub nickname: String,
    pub conn_state: i64,
}

/// Body of the state-push request.
#[derive(Debug, Serialize)]
pub struct StateChangeRequest<'a> {
    pub state: &'a str,
}

/// Path of the profile status endpoint.
pub fn status_path(profile_id: &str) -> String {
    format!("{PATH_PROFILE}/{profile_id}/status")
}

/// Path of the state-push endpoint.
pub fn state_path(profile_id: &str) -> String {
    format!("{PATH_PROFILE}/{profile_id}/state")
}

/// Path of a device record.
pub fn device_path(device_id: &str) -> String {
    format!("{PATH_DEVICES}/{device_id}")
}
