// MIT License - Copyright (c) 2026 the hms2mqtt authors

use std::fmt;

use crate::state::SecurityState;

/// Error codes returned by the HMS cloud in response envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    /// 1001 - Invalid request parameters
    InvalidParameters,
    /// 1003 - Service busy, retry later
    ServiceBusy,
    /// 2001 - Invalid API key or key id
    InvalidApiKey,
    /// 2002 - API key expired
    KeyExpired,
    /// 3001 - Monitoring profile not found
    ProfileNotFound,
    /// 3003 - Device not found
    DeviceNotFound,
    /// 3005 - Device offline
    DeviceOffline,
    /// 5000 - Internal service error
    InternalError,
}

impl ApiErrorCode {
    /// Parse a numeric error code from a response envelope.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1001 => Some(Self::InvalidParameters),
            1003 => Some(Self::ServiceBusy),
            2001 => Some(Self::InvalidApiKey),
            2002 => Some(Self::KeyExpired),
            3001 => Some(Self::ProfileNotFound),
            3003 => Some(Self::DeviceNotFound),
            3005 => Some(Self::DeviceOffline),
            5000 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// The numeric wire representation.
    pub fn as_code(&self) -> i64 {
        match self {
            Self::InvalidParameters => 1001,
            Self::ServiceBusy => 1003,
            Self::InvalidApiKey => 2001,
            Self::KeyExpired => 2002,
            Self::ProfileNotFound => 3001,
            Self::DeviceNotFound => 3003,
            Self::DeviceOffline => 3005,
            Self::InternalError => 5000,
        }
    }

    /// Human-readable description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidParameters => "Invalid request parameters",
            Self::ServiceBusy => "Service busy, retry later",
            Self::InvalidApiKey => "Invalid API key or key id",
            Self::KeyExpired => "API key expired",
            Self::ProfileNotFound => "Monitoring profile not found",
            Self::DeviceNotFound => "Device not found",
            Self::DeviceOffline => "Device offline",
            Self::InternalError => "Internal service error",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.as_code(), self.description())
    }
}

/// All errors that can occur in the hms-cloud-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum HmsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloud rejected request: {0}")]
    Api(ApiErrorCode),

    #[error("Cloud rejected request with unrecognized code {code}: {msg}")]
    UnknownApiCode { code: i64, msg: String },

    #[error("Malformed cloud response: {details}")]
    InvalidResponse { details: String },

    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("Monitoring identifier not resolved yet")]
    IdentifierUnresolved,

    #[error("No panel status received yet")]
    StatusPending,

    #[error("Panel status \"{status}\" has no security-system mapping")]
    UnmappedStatus { status: String },

    #[error("{0} cannot be requested as a target state")]
    UnsupportedTarget(SecurityState),
}

impl HmsError {
    /// Whether this error is transient and the request should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            HmsError::Http(_) => true,
            HmsError::Api(code) => {
                matches!(code, ApiErrorCode::ServiceBusy | ApiErrorCode::InternalError)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, HmsError>;
