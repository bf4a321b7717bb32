pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Requested delivery guarantee for a published message, mirroring the usual
/// pub/sub QoS tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Qos {
    /// Best-effort, may be dropped.
    AtMostOnce = 0,
    /// Delivered at least once, duplicates possible.
    AtLeastOnce = 1,
    /// Delivered once (as far as the transport can promise).
    ExactlyOnce = 2,
}

impl Qos {
    #[inline]
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Transport boundary. The core hands over a fully built message and does not
/// wait for delivery; retries and reconnection belong to the implementor.
pub trait Publisher {
    fn publish(
        &mut self,
        topic: &str,
        qos: Qos,
        payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(
        &mut self,
        topic: &str,
        qos: Qos,
        payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).publish(topic, qos, payload)
    }
}
