//! Test and helper publishers for pole_core

use crate::message::Message;
use pole_traits::{Publisher, Qos};
use std::sync::{Arc, Mutex};

/// Publisher that keeps every message in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    log: Arc<Mutex<Vec<Message>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn messages(&self) -> Vec<Message> {
        self.log.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Messages whose topic ends with `suffix` (e.g. `"/telemetry"`).
    pub fn on(&self, suffix: &str) -> Vec<Message> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic.ends_with(suffix))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut g) = self.log.lock() {
            g.clear();
        }
    }
}

impl Publisher for RecordingPublisher {
    fn publish(
        &mut self,
        topic: &str,
        qos: Qos,
        payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut g = self
            .log
            .lock()
            .map_err(|_| std::io::Error::other("recording log poisoned"))?;
        g.push(Message {
            topic: topic.to_string(),
            qos,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

/// A transport that is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingPublisher;

impl Publisher for FailingPublisher {
    fn publish(
        &mut self,
        _topic: &str,
        _qos: Qos,
        _payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("transport unavailable")))
    }
}
