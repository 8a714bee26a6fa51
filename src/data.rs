use crate::{
    ident::EndpointId,
    time::{Delta, Time},
};

/// A message that reached its receiver.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record<P> {
    /// The sender.
    pub source: EndpointId,
    /// The receiver.
    pub dest: EndpointId,
    /// When the send was initiated.
    pub origin: Time,
    /// When the last element on the route released the message.
    pub delivered: Time,
    pub payload: P,
}

impl<P> Record<P> {
    /// End-to-end latency through every element on the route.
    pub fn latency(&self) -> Delta {
        self.delivered.saturating_since(self.origin)
    }
}
