//! Telemetry broadcast. Named items, each with a fixed schema and
//! cardinality, framed as line-delimited JSON over
//! `m2_common::wire::WIRE_DELIMITER`. The actuator/force/encoder items
//! carry placeholder fixed-shape values: the closed-loop force model and
//! actuator kinematics that would populate them are not built here.

use std::collections::BTreeMap;

use m2_common::power_state::{PowerState, PowerType};
use m2_common::wire::{PowerSystemStateBroadcast, WIRE_DELIMITER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TelemetryItem {
    PowerStatus,
    PowerStatusRaw,
    TangentForce,
    ForceBalance,
    Position,
    PositionIms,
    Temperature,
    ZenithAngle,
    AxialEncoderPositions,
    TangentEncoderPositions,
    AxialActuatorSteps,
    TangentActuatorSteps,
    ForceErrorTangent,
    InclinometerAngleTma,
    DisplacementSensors,
    IlcData,
    NetForcesTotal,
    NetMomentsTotal,
    AxialForce,
}

impl TelemetryItem {
    pub const fn wire_id(self) -> &'static str {
        use TelemetryItem::*;
        match self {
            PowerStatus => "powerStatus",
            PowerStatusRaw => "powerStatusRaw",
            TangentForce => "tangentForce",
            ForceBalance => "forceBalance",
            Position => "position",
            PositionIms => "positionIMS",
            Temperature => "temperature",
            ZenithAngle => "zenithAngle",
            AxialEncoderPositions => "axialEncoderPositions",
            TangentEncoderPositions => "tangentEncoderPositions",
            AxialActuatorSteps => "axialActuatorSteps",
            TangentActuatorSteps => "tangentActuatorSteps",
            ForceErrorTangent => "forceErrorTangent",
            InclinometerAngleTma => "inclinometerAngleTma",
            DisplacementSensors => "displacementSensors",
            IlcData => "ilcData",
            NetForcesTotal => "netForcesTotal",
            NetMomentsTotal => "netMomentsTotal",
            AxialForce => "axialForce",
        }
    }

    fn default_value(self) -> serde_json::Value {
        match self {
            // 72 axial actuators; lutGravity is the one cardinality the
            // source documents explicitly.
            TelemetryItem::AxialForce => serde_json::json!({ "lutGravity": [0.0; 72] }),
            _ => serde_json::Value::Null,
        }
    }
}

pub const TELEMETRY_ITEMS: [TelemetryItem; 19] = [
    TelemetryItem::PowerStatus,
    TelemetryItem::PowerStatusRaw,
    TelemetryItem::TangentForce,
    TelemetryItem::ForceBalance,
    TelemetryItem::Position,
    TelemetryItem::PositionIms,
    TelemetryItem::Temperature,
    TelemetryItem::ZenithAngle,
    TelemetryItem::AxialEncoderPositions,
    TelemetryItem::TangentEncoderPositions,
    TelemetryItem::AxialActuatorSteps,
    TelemetryItem::TangentActuatorSteps,
    TelemetryItem::ForceErrorTangent,
    TelemetryItem::InclinometerAngleTma,
    TelemetryItem::DisplacementSensors,
    TelemetryItem::IlcData,
    TelemetryItem::NetForcesTotal,
    TelemetryItem::NetMomentsTotal,
    TelemetryItem::AxialForce,
];

fn item_by_wire_id(id: &str) -> Option<TelemetryItem> {
    TELEMETRY_ITEMS.iter().copied().find(|i| i.wire_id() == id)
}

/// Holds the current value of every telemetry item, seeded with
/// placeholders, and assembles the line-delimited JSON stream.
pub struct TelemetryBroadcaster {
    values: BTreeMap<TelemetryItem, serde_json::Value>,
}

impl TelemetryBroadcaster {
    pub fn new() -> Self {
        let values = TELEMETRY_ITEMS
            .iter()
            .map(|item| (*item, item.default_value()))
            .collect();
        Self { values }
    }

    /// Reflects the current bus states into `powerStatus`/`powerStatusRaw`.
    pub fn update_power_status(
        &mut self,
        motor_actual: PowerState,
        motor_status: bool,
        comm_actual: PowerState,
        comm_status: bool,
    ) {
        let motor = PowerSystemStateBroadcast::new(PowerType::Motor, motor_actual, motor_status);
        let comm = PowerSystemStateBroadcast::new(PowerType::Comm, comm_actual, comm_status);
        let value = serde_json::json!({ "motor": motor, "comm": comm });
        self.values.insert(TelemetryItem::PowerStatus, value.clone());
        self.values.insert(TelemetryItem::PowerStatusRaw, value);
    }

    /// Client push-back: replace the value of one named item.
    pub fn apply_push_back(&mut self, wire_id: &str, value: serde_json::Value) -> Result<(), m2_common::error::WireError> {
        let item = item_by_wire_id(wire_id)
            .ok_or_else(|| m2_common::error::WireError::UnknownId(wire_id.to_string()))?;
        self.values.insert(item, value);
        Ok(())
    }

    /// One line per item, in the fixed order, `id` plus the item's current
    /// value, each terminated by `WIRE_DELIMITER`.
    pub fn emit_all(&self) -> Vec<String> {
        TELEMETRY_ITEMS
            .iter()
            .map(|item| {
                let value = self.values.get(item).cloned().unwrap_or(serde_json::Value::Null);
                let mut frame = serde_json::json!({ "id": item.wire_id() });
                if let Some(obj) = frame.as_object_mut() {
                    if let serde_json::Value::Object(fields) = value {
                        obj.extend(fields);
                    } else if !value.is_null() {
                        obj.insert("value".to_string(), value);
                    }
                }
                let mut line = serde_json::to_string(&frame).expect("telemetry frame is always serializable");
                line.push_str(WIRE_DELIMITER);
                line
            })
            .collect()
    }
}

impl Default for TelemetryBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_line_per_item_in_fixed_order() {
        let broadcaster = TelemetryBroadcaster::new();
        let lines = broadcaster.emit_all();
        assert_eq!(lines.len(), TELEMETRY_ITEMS.len());
        assert!(lines[0].contains("\"powerStatus\""));
        assert!(lines.last().unwrap().contains("\"axialForce\""));
    }

    #[test]
    fn every_line_ends_with_wire_delimiter() {
        let broadcaster = TelemetryBroadcaster::new();
        for line in broadcaster.emit_all() {
            assert!(line.ends_with(WIRE_DELIMITER));
        }
    }

    #[test]
    fn axial_force_has_72_element_lut_gravity() {
        let broadcaster = TelemetryBroadcaster::new();
        let lines = broadcaster.emit_all();
        let axial = lines.iter().find(|l| l.contains("axialForce")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(axial.trim_end_matches(WIRE_DELIMITER)).unwrap();
        assert_eq!(parsed["lutGravity"].as_array().unwrap().len(), 72);
    }

    #[test]
    fn update_power_status_reflects_bus_state() {
        let mut broadcaster = TelemetryBroadcaster::new();
        broadcaster.update_power_status(PowerState::On, true, PowerState::Off, false);
        let lines = broadcaster.emit_all();
        let power_status = lines.iter().find(|l| l.contains("\"powerStatus\"")).unwrap();
        assert!(power_status.contains("\"status\":true"));
    }

    #[test]
    fn push_back_rejects_unknown_item() {
        let mut broadcaster = TelemetryBroadcaster::new();
        let err = broadcaster.apply_push_back("notARealItem", serde_json::json!(1)).unwrap_err();
        assert!(matches!(err, m2_common::error::WireError::UnknownId(_)));
    }

    #[test]
    fn push_back_replaces_item_value() {
        let mut broadcaster = TelemetryBroadcaster::new();
        broadcaster
            .apply_push_back("temperature", serde_json::json!({ "value": 21.5 }))
            .unwrap();
        let lines = broadcaster.emit_all();
        let temp = lines.iter().find(|l| l.contains("\"temperature\"")).unwrap();
        assert!(temp.contains("21.5"));
    }
}
