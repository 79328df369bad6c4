// MIT License - Copyright (c) 2026 the hms2mqtt authors

use std::fmt;

use crate::constants::CONN_STATE_OFFLINE;

/// Panel status vocabulary reported by the HMS cloud.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HmsStatus {
    /// "home" - armed with occupants at home
    Home,
    /// "away" - fully armed
    Away,
    /// "disarm" - disarmed
    Disarm,
    /// "changing" - an arm/disarm request is still settling
    Changing,
    /// Any other wire value, preserved verbatim for diagnostics
    Unknown(String),
}

impl HmsStatus {
    /// Parse a status wire string. Unrecognized values become `Unknown`
    /// rather than an error; the cloud adds states over time.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "home" => Self::Home,
            "away" => Self::Away,
            "disarm" => Self::Disarm,
            "changing" => Self::Changing,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire string representation.
    pub fn as_wire_str(&self) -> &str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
            Self::Disarm => "disarm",
            Self::Changing => "changing",
            Self::Unknown(raw) => raw,
        }
    }

    /// Map the vendor status onto the host security-system vocabulary.
    ///
    /// `Changing` reads as disarmed: the host has no transitional state to
    /// show while the panel settles. `Unknown` has no mapping.
    pub fn to_security_state(&self) -> Option<SecurityState> {
        match self {
            Self::Changing => Some(SecurityState::Disarm),
            Self::Home => Some(SecurityState::StayArm),
            Self::Away => Some(SecurityState::AwayArm),
            Self::Disarm => Some(SecurityState::Disarm),
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for HmsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// Host security-system state vocabulary, with the conventional
/// characteristic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityState {
    /// 0 - armed, occupants at home
    StayArm,
    /// 1 - armed, nobody home
    AwayArm,
    /// 2 - armed for the night
    NightArm,
    /// 3 - disarmed
    Disarm,
    /// 4 - alarm sounding (current-state only, never a valid target)
    AlarmTriggered,
}

impl SecurityState {
    /// The numeric characteristic code (0-4).
    pub fn as_code(&self) -> u8 {
        match self {
            Self::StayArm => 0,
            Self::AwayArm => 1,
            Self::NightArm => 2,
            Self::Disarm => 3,
            Self::AlarmTriggered => 4,
        }
    }

    /// Parse a numeric characteristic code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::StayArm),
            1 => Some(Self::AwayArm),
            2 => Some(Self::NightArm),
            3 => Some(Self::Disarm),
            4 => Some(Self::AlarmTriggered),
            _ => None,
        }
    }

    /// The symbolic name used in bus payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StayArm => "STAY_ARM",
            Self::AwayArm => "AWAY_ARM",
            Self::NightArm => "NIGHT_ARM",
            Self::Disarm => "DISARM",
            Self::AlarmTriggered => "ALARM_TRIGGERED",
        }
    }

    /// Parse a symbolic name (e.g. from a bus command).
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "STAY_ARM" => Some(Self::StayArm),
            "AWAY_ARM" => Some(Self::AwayArm),
            "NIGHT_ARM" => Some(Self::NightArm),
            "DISARM" => Some(Self::Disarm),
            "ALARM_TRIGGERED" => Some(Self::AlarmTriggered),
            _ => None,
        }
    }

    /// Map a host target state onto the vendor command vocabulary.
    ///
    /// `NightArm` shares the vendor "home" mode with `StayArm`; the panel
    /// has no separate night mode. `AlarmTriggered` has no outbound
    /// command.
    pub fn to_arm_command(&self) -> Option<ArmCommand> {
        match self {
            Self::StayArm | Self::NightArm => Some(ArmCommand::Home),
            Self::AwayArm => Some(ArmCommand::Away),
            Self::Disarm => Some(ArmCommand::Off),
            Self::AlarmTriggered => None,
        }
    }
}

impl fmt::Display for SecurityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arm/disarm command vocabulary accepted by the state-push endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmCommand {
    /// "home" - arm the perimeter only
    Home,
    /// "away" - arm everything
    Away,
    /// "off" - disarm
    Off,
}

impl ArmCommand {
    /// The wire string representation.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for ArmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// Cloud-reported connectivity of the physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl ConnectionState {
    /// Parse the vendor's integer `conn_state` field (0 = offline).
    pub fn from_conn_state(raw: i64) -> Self {
        if raw == CONN_STATE_OFFLINE {
            Self::Disconnected
        } else {
            Self::Connected
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Connectivity input handed to a refresh cycle by the driving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHealth {
    pub connection: ConnectionState,
}

impl DeviceHealth {
    pub fn new(connection: ConnectionState) -> Self {
        Self { connection }
    }
}

/// Opaque handle the cloud uses to address a monitoring profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HmsId(String);

impl HmsId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HmsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One point-in-time view of the panel. The adapter holds at most one,
/// overwritten wholesale on each refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub connection: ConnectionState,
    pub status: HmsStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_to_security_state_table() {
        assert_eq!(
            HmsStatus::Changing.to_security_state(),
            Some(SecurityState::Disarm)
        );
        assert_eq!(
            HmsStatus::Home.to_security_state(),
            Some(SecurityState::StayArm)
        );
        assert_eq!(
            HmsStatus::Away.to_security_state(),
            Some(SecurityState::AwayArm)
        );
        assert_eq!(
            HmsStatus::Disarm.to_security_state(),
            Some(SecurityState::Disarm)
        );
    }

    #[test]
    fn test_unknown_status_has_no_mapping() {
        // Only the four known wire strings may produce a host state.
        for raw in ["", "HOME", "armed", "night", "alarm", "offline"] {
            assert_eq!(HmsStatus::from_wire(raw).to_security_state(), None);
        }
    }

    #[test]
    fn test_security_state_to_command_table() {
        assert_eq!(
            SecurityState::StayArm.to_arm_command(),
            Some(ArmCommand::Home)
        );
        assert_eq!(
            SecurityState::NightArm.to_arm_command(),
            Some(ArmCommand::Home)
        );
        assert_eq!(
            SecurityState::AwayArm.to_arm_command(),
            Some(ArmCommand::Away)
        );
        assert_eq!(SecurityState::Disarm.to_arm_command(), Some(ArmCommand::Off));
        assert_eq!(SecurityState::AlarmTriggered.to_arm_command(), None);
    }

    #[test]
    fn test_command_wire_strings() {
        assert_eq!(ArmCommand::Home.as_wire_str(), "home");
        assert_eq!(ArmCommand::Away.as_wire_str(), "away");
        assert_eq!(ArmCommand::Off.as_wire_str(), "off");
    }

    #[test]
    fn test_status_wire_roundtrip() {
        for raw in ["home", "away", "disarm", "changing"] {
            let status = HmsStatus::from_wire(raw);
            assert!(!matches!(status, HmsStatus::Unknown(_)));
            assert_eq!(status.as_wire_str(), raw);
        }
        let unknown = HmsStatus::from_wire("vacation");
        assert_eq!(unknown, HmsStatus::Unknown("vacation".to_string()));
        assert_eq!(unknown.as_wire_str(), "vacation");
    }

    #[test]
    fn test_security_state_codes() {
        for (state, code) in [
            (SecurityState::StayArm, 0),
            (SecurityState::AwayArm, 1),
            (SecurityState::NightArm, 2),
            (SecurityState::Disarm, 3),
            (SecurityState::AlarmTriggered, 4),
        ] {
            assert_eq!(state.as_code(), code);
            assert_eq!(SecurityState::from_code(code), Some(state));
        }
        assert_eq!(SecurityState::from_code(5), None);
    }

    #[test]
    fn test_security_state_names() {
        for state in [
            SecurityState::StayArm,
            SecurityState::AwayArm,
            SecurityState::NightArm,
            SecurityState::Disarm,
            SecurityState::AlarmTriggered,
        ] {
            assert_eq!(SecurityState::from_name(state.as_str()), Some(state));
        }
        assert_eq!(SecurityState::from_name("stay_arm"), None);
        assert_eq!(SecurityState::from_name("ARMED"), None);
    }

    #[test]
    fn test_conn_state_parsing() {
        assert_eq!(
            ConnectionState::from_conn_state(0),
            ConnectionState::Disconnected
        );
        assert_eq!(
            ConnectionState::from_conn_state(1),
            ConnectionState::Connected
        );
        assert_eq!(
            ConnectionState::from_conn_state(2),
            ConnectionState::Connected
        );
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
    }
}
