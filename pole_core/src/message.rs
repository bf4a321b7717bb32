//! Wire messages: topics, delivery levels and JSON payloads.
//!
//! | Message    | Topic                                | QoS   |
//! |------------|--------------------------------------|-------|
//! | telemetry  | `hospital/pole/{pole_id}/telemetry`  | 1     |
//! | status     | `hospital/pole/{pole_id}/status`     | 0     |
//! | alert      | `hospital/alert/{severity}/{pole_id}`| 1 / 2 |
//! | nurse call | `hospital/nurse/call/{pole_id}`      | 2     |

use chrono::{DateTime, Utc};
use pole_traits::Qos;
use serde::Serialize;

use crate::alerts::{Alert, AlertKind, Severity};
use crate::error::PoleError;
use crate::session::Session;
use crate::telemetry::TelemetrySnapshot;

/// A fully built message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub qos: Qos,
    pub payload: Vec<u8>,
}

impl Message {
    fn encode<T: Serialize>(topic: String, qos: Qos, body: &T) -> Result<Self, PoleError> {
        let payload = serde_json::to_vec(body).map_err(|e| PoleError::Encode(e.to_string()))?;
        Ok(Self {
            topic,
            qos,
            payload,
        })
    }

    /// Decode the payload as generic JSON (diagnostics and tests).
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.payload)
    }
}

pub fn telemetry_topic(pole_id: &str) -> String {
    format!("hospital/pole/{pole_id}/telemetry")
}

pub fn status_topic(pole_id: &str) -> String {
    format!("hospital/pole/{pole_id}/status")
}

pub fn alert_topic(severity: Severity, pole_id: &str) -> String {
    format!("hospital/alert/{}/{pole_id}", severity.topic_segment())
}

pub fn nurse_call_topic(pole_id: &str) -> String {
    format!("hospital/nurse/call/{pole_id}")
}

/// Critical alerts go out at the highest guarantee level.
pub fn alert_qos(severity: Severity) -> Qos {
    match severity {
        Severity::Warning => Qos::AtLeastOnce,
        Severity::Critical => Qos::ExactlyOnce,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TelemetryBody<'a> {
    pole_id: &'a str,
    timestamp: DateTime<Utc>,
    telemetry: &'a TelemetrySnapshot,
    session: &'a Session,
}

pub fn telemetry(
    pole_id: &str,
    at: DateTime<Utc>,
    snapshot: &TelemetrySnapshot,
    session: &Session,
) -> Result<Message, PoleError> {
    Message::encode(
        telemetry_topic(pole_id),
        Qos::AtLeastOnce,
        &TelemetryBody {
            pole_id,
            timestamp: at,
            telemetry: snapshot,
            session,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareHealth {
    pub load_cell: &'static str,
    pub display: &'static str,
    pub wifi: &'static str,
    pub signal_strength: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub online: bool,
    /// Whole percent, floored.
    pub battery: u32,
    pub charging: bool,
    pub hardware: HardwareHealth,
}

impl StatusReport {
    pub fn new(battery_pct: f64, signal_strength: i32) -> Self {
        Self {
            online: true,
            battery: battery_pct.clamp(0.0, 100.0).floor() as u32,
            charging: false,
            hardware: HardwareHealth {
                load_cell: "OK",
                display: "OK",
                wifi: "CONNECTED",
                signal_strength,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    pole_id: &'a str,
    timestamp: DateTime<Utc>,
    status: &'a StatusReport,
}

pub fn status(
    pole_id: &str,
    at: DateTime<Utc>,
    report: &StatusReport,
) -> Result<Message, PoleError> {
    Message::encode(
        status_topic(pole_id),
        Qos::AtMostOnce,
        &StatusBody {
            pole_id,
            timestamp: at,
            status: report,
        },
    )
}

/// Context attached to every alert.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertData {
    pub bed: String,
    pub session_id: Option<String>,
    pub patient_id: Option<String>,
    pub remaining: Option<f64>,
    pub flow_rate: Option<f64>,
    pub battery: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertBody<'a> {
    alert_id: &'a str,
    pole_id: &'a str,
    severity: Severity,
    #[serde(rename = "type")]
    kind: AlertKind,
    message: &'a str,
    timestamp: DateTime<Utc>,
    data: &'a AlertData,
}

pub fn alert(
    pole_id: &str,
    alert_id: &str,
    at: DateTime<Utc>,
    alert: &Alert,
    data: &AlertData,
) -> Result<Message, PoleError> {
    Message::encode(
        alert_topic(alert.severity, pole_id),
        alert_qos(alert.severity),
        &AlertBody {
            alert_id,
            pole_id,
            severity: alert.severity,
            kind: alert.kind,
            message: &alert.message,
            timestamp: at,
            data,
        },
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NurseCallBody<'a> {
    pole_id: &'a str,
    bed: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: AlertKind,
}

pub fn nurse_call(pole_id: &str, bed: &str, at: DateTime<Utc>) -> Result<Message, PoleError> {
    Message::encode(
        nurse_call_topic(pole_id),
        Qos::ExactlyOnce,
        &NurseCallBody {
            pole_id,
            bed,
            timestamp: at,
            kind: AlertKind::EmergencyCall,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_follow_hierarchy() {
        assert_eq!(telemetry_topic("P1"), "hospital/pole/P1/telemetry");
        assert_eq!(status_topic("P1"), "hospital/pole/P1/status");
        assert_eq!(
            alert_topic(Severity::Critical, "P1"),
            "hospital/alert/critical/P1"
        );
        assert_eq!(nurse_call_topic("P1"), "hospital/nurse/call/P1");
    }

    #[test]
    fn alert_payload_uses_wire_names() {
        let a = Alert {
            severity: Severity::Warning,
            kind: AlertKind::BatteryLow,
            message: "battery low: 19%".into(),
        };
        let data = AlertData {
            bed: "301A-1".into(),
            battery: 19.7,
            ..AlertData::default()
        };
        let msg = alert("P1", "ALERT-1-1", DateTime::<Utc>::UNIX_EPOCH, &a, &data).unwrap();
        assert_eq!(msg.qos, Qos::AtLeastOnce);
        assert_eq!(msg.topic, "hospital/alert/warning/P1");
        let v = msg.json().unwrap();
        assert_eq!(v["type"], "BATTERY_LOW");
        assert_eq!(v["severity"], "WARNING");
        assert_eq!(v["alertId"], "ALERT-1-1");
        assert_eq!(v["data"]["bed"], "301A-1");
        assert!(v["data"]["sessionId"].is_null());
    }

    #[test]
    fn nurse_call_is_exactly_once() {
        let msg = nurse_call("P1", "301A-1", DateTime::<Utc>::UNIX_EPOCH).unwrap();
        assert_eq!(msg.qos, Qos::ExactlyOnce);
        assert_eq!(msg.json().unwrap()["type"], "EMERGENCY_CALL");
    }

    #[test]
    fn status_floors_battery() {
        let r = StatusReport::new(19.99, -60);
        assert_eq!(r.battery, 19);
        let msg = status("P1", DateTime::<Utc>::UNIX_EPOCH, &r).unwrap();
        assert_eq!(msg.qos, Qos::AtMostOnce);
        let v = msg.json().unwrap();
        assert_eq!(v["status"]["hardware"]["signalStrength"], -60);
        assert_eq!(v["status"]["charging"], false);
    }
}
