//! Command dispatch. A request is classified into either a
//! silently-dropped no-ack case (malformed JSON, missing/wrong-type
//! fields, stale `sequence_id`, unknown `id`) or a recognized command,
//! which always gets an immediate ack followed by an async final
//! success/fail reply.

use m2_common::error::WireError;
use m2_common::power_state::PowerType;
use m2_common::wire::{AckEnvelope, AckKind, FinalEnvelope, FinalKind, PowerCommandPayload, RequestEnvelope};
use m2_power::power::PowerSystem;

fn ack(sequence_id: u64) -> AckEnvelope {
    AckEnvelope {
        id: AckKind::Ack,
        sequence_id,
        user_info: None,
    }
}

fn final_success(sequence_id: u64, fields: serde_json::Value) -> FinalEnvelope {
    FinalEnvelope {
        id: FinalKind::Success,
        sequence_id,
        fields,
    }
}

fn final_fail(sequence_id: u64, reason: &str) -> FinalEnvelope {
    FinalEnvelope {
        id: FinalKind::Fail,
        sequence_id,
        fields: serde_json::json!({ "reason": reason }),
    }
}

/// Result of dispatching one raw request. `ack`/`final_msg` are `None`
/// together exactly for the no-ack paths.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse {
    pub ack: Option<AckEnvelope>,
    pub final_msg: Option<FinalEnvelope>,
    pub request_shutdown: bool,
}

impl CommandResponse {
    fn dropped() -> Self {
        Self {
            ack: None,
            final_msg: None,
            request_shutdown: false,
        }
    }
}

/// Parses and validates a raw request, distinguishing malformed JSON from
/// missing/wrong-type required fields from a stale `sequence_id`, so the
/// no-ack cause can be logged precisely.
fn parse_request(raw: &str, last_seen_sequence_id: u64) -> Result<RequestEnvelope, WireError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| WireError::MalformedJson(e.to_string()))?;

    let id = match value.get("id") {
        None => return Err(WireError::MissingField("id")),
        Some(v) => v
            .as_str()
            .ok_or(WireError::WrongFieldType {
                field: "id",
                expected: "string",
            })?
            .to_string(),
    };

    let sequence_id = match value.get("sequence_id") {
        None => return Err(WireError::MissingField("sequence_id")),
        Some(v) => v.as_u64().ok_or(WireError::WrongFieldType {
            field: "sequence_id",
            expected: "unsigned integer",
        })?,
    };

    if sequence_id <= last_seen_sequence_id {
        return Err(WireError::StaleSequenceId {
            got: sequence_id,
            last_seen: last_seen_sequence_id,
        });
    }

    Ok(RequestEnvelope {
        id,
        sequence_id,
        payload: value,
    })
}

/// Per-connection dispatch state: last accepted `sequence_id` and the
/// remote/local command-source switch.
pub struct CommandDispatcher {
    last_seen_sequence_id: u64,
    is_remote: bool,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            last_seen_sequence_id: 0,
            is_remote: false,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Classify and, for recognized commands, execute `raw` against the
    /// live `PowerSystem`.
    pub fn handle(&mut self, raw: &str, power: &mut PowerSystem) -> CommandResponse {
        let envelope = match parse_request(raw, self.last_seen_sequence_id) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(%err, "dropping command, no ack sent");
                return CommandResponse::dropped();
            }
        };
        self.last_seen_sequence_id = envelope.sequence_id;

        match envelope.id.as_str() {
            "cmd_ack" => CommandResponse {
                ack: Some(ack(envelope.sequence_id)),
                final_msg: Some(final_success(envelope.sequence_id, serde_json::json!({}))),
                request_shutdown: false,
            },
            "cmd_noack" => CommandResponse {
                ack: None,
                final_msg: Some(final_success(envelope.sequence_id, serde_json::json!({}))),
                request_shutdown: false,
            },
            "cmd_echo" => {
                let msg = envelope.payload.get("msg").cloned().unwrap_or(serde_json::Value::Null);
                CommandResponse {
                    ack: Some(ack(envelope.sequence_id)),
                    final_msg: Some(final_success(envelope.sequence_id, serde_json::json!({ "msg": msg }))),
                    request_shutdown: false,
                }
            }
            "cmd_switchCommandSource" => {
                let is_remote = envelope
                    .payload
                    .get("isRemote")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(self.is_remote);
                self.is_remote = is_remote;
                tracing::info!(is_remote, "command source switched");
                CommandResponse {
                    ack: Some(ack(envelope.sequence_id)),
                    final_msg: Some(final_success(
                        envelope.sequence_id,
                        serde_json::json!({ "isRemote": is_remote }),
                    )),
                    request_shutdown: false,
                }
            }
            "cmd_power" => {
                let ack_msg = ack(envelope.sequence_id);
                let payload: Result<PowerCommandPayload, _> = serde_json::from_value(envelope.payload.clone());
                let final_msg = match payload {
                    Ok(p) => match p.power_type() {
                        Some(PowerType::Motor) => {
                            let accepted = power.power_motor(p.status);
                            if accepted {
                                final_success(envelope.sequence_id, serde_json::json!({ "powerType": 1 }))
                            } else {
                                final_fail(envelope.sequence_id, "MOTOR refused: COMM is not On")
                            }
                        }
                        Some(PowerType::Comm) => {
                            power.power_comm(p.status);
                            final_success(envelope.sequence_id, serde_json::json!({ "powerType": 2 }))
                        }
                        None => final_fail(envelope.sequence_id, "unknown powerType"),
                    },
                    Err(e) => final_fail(envelope.sequence_id, &e.to_string()),
                };
                CommandResponse {
                    ack: Some(ack_msg),
                    final_msg: Some(final_msg),
                    request_shutdown: false,
                }
            }
            "cmd_systemShutdown" => CommandResponse {
                ack: Some(ack(envelope.sequence_id)),
                final_msg: Some(final_success(envelope.sequence_id, serde_json::json!({}))),
                request_shutdown: true,
            },
            other => {
                tracing::warn!(id = %other, "unknown command id, no ack sent");
                CommandResponse::dropped()
            }
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use m2_common::config::CoreConfig;

    fn power() -> PowerSystem {
        PowerSystem::new(&CoreConfig::default())
    }

    #[test]
    fn malformed_json_is_dropped() {
        let mut d = CommandDispatcher::new();
        let resp = d.handle("{not json", &mut power());
        assert_eq!(resp, CommandResponse::dropped());
    }

    #[test]
    fn missing_sequence_id_is_dropped() {
        let mut d = CommandDispatcher::new();
        let resp = d.handle(r#"{"id":"cmd_ack"}"#, &mut power());
        assert_eq!(resp, CommandResponse::dropped());
    }

    #[test]
    fn stale_sequence_id_is_dropped() {
        let mut d = CommandDispatcher::new();
        d.handle(r#"{"id":"cmd_ack","sequence_id":5}"#, &mut power());
        let resp = d.handle(r#"{"id":"cmd_ack","sequence_id":5}"#, &mut power());
        assert_eq!(resp, CommandResponse::dropped());
    }

    #[test]
    fn unknown_id_is_dropped() {
        let mut d = CommandDispatcher::new();
        let resp = d.handle(r#"{"id":"cmd_bogus","sequence_id":1}"#, &mut power());
        assert_eq!(resp, CommandResponse::dropped());
    }

    #[test]
    fn echo_roundtrips_msg() {
        let mut d = CommandDispatcher::new();
        let resp = d.handle(r#"{"id":"cmd_echo","sequence_id":1,"msg":"hello"}"#, &mut power());
        let final_msg = resp.final_msg.unwrap();
        assert_eq!(final_msg.fields["msg"], "hello");
    }

    #[test]
    fn power_motor_refused_when_comm_off_returns_fail() {
        let mut d = CommandDispatcher::new();
        let resp = d.handle(
            r#"{"id":"cmd_power","sequence_id":1,"powerType":1,"status":true}"#,
            &mut power(),
        );
        assert_eq!(resp.final_msg.unwrap().id, FinalKind::Fail);
    }

    #[test]
    fn power_comm_on_succeeds() {
        let mut d = CommandDispatcher::new();
        let resp = d.handle(
            r#"{"id":"cmd_power","sequence_id":1,"powerType":2,"status":true}"#,
            &mut power(),
        );
        assert_eq!(resp.final_msg.unwrap().id, FinalKind::Success);
    }

    #[test]
    fn shutdown_sets_request_flag() {
        let mut d = CommandDispatcher::new();
        let resp = d.handle(r#"{"id":"cmd_systemShutdown","sequence_id":1}"#, &mut power());
        assert!(resp.request_shutdown);
    }
}
