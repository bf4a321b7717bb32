//! Stand-in transport: every published message becomes one JSON line.

use pole_traits::{Publisher, Qos};
use serde_json::json;
use std::io::Write;

pub struct JsonLinesPublisher<W: Write> {
    out: W,
}

impl JsonLinesPublisher<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish(
        &mut self,
        topic: &str,
        qos: Qos,
        payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let payload: serde_json::Value = serde_json::from_slice(payload)?;
        let line = json!({ "topic": topic, "qos": qos.level(), "payload": payload });
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_message() {
        let mut p = JsonLinesPublisher::new(Vec::new());
        p.publish("a/b", Qos::AtLeastOnce, br#"{"x":1}"#).unwrap();
        p.publish("a/c", Qos::AtMostOnce, br#"{"y":2}"#).unwrap();
        let text = String::from_utf8(p.out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(v["topic"], "a/b");
        assert_eq!(v["qos"], 1);
        assert_eq!(v["payload"]["x"], 1);
    }

    #[test]
    fn rejects_non_json_payload() {
        let mut p = JsonLinesPublisher::new(Vec::new());
        assert!(p.publish("a", Qos::AtMostOnce, b"not json").is_err());
        assert!(p.out.is_empty());
    }
}
