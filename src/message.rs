use typed_builder::TypedBuilder;

use crate::{
    ident::{EndpointId, VlinkName},
    time::Time,
    units::Bits,
};

/// A message in transit through one or more network elements.
///
/// The payload is opaque to the engine. `source` and `origin` together identify one logical send:
/// two messages with equal `source` and `origin` are replicas of the same multicast frame.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct Message<P> {
    pub payload: P,
    pub source: EndpointId,
    /// When the send was initiated.
    pub origin: Time,
    /// Virtual-link metadata, stamped by an AFDX end system.
    #[builder(default, setter(strip_option))]
    pub frame: Option<FrameTag>,
}

impl<P> Message<P> {
    pub fn new(source: EndpointId, origin: Time, payload: P) -> Self {
        Self {
            payload,
            source,
            origin,
            frame: None,
        }
    }

    /// Whether `self` and `other` are replicas of one logical send.
    pub(crate) fn is_replica_of<Q>(&self, other: &Message<Q>) -> bool {
        self.source == other.source && self.origin == other.origin
    }
}

/// Identifies the virtual link a frame travels on and the frame's size on the wire.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct FrameTag {
    pub vlink: VlinkName,
    pub frame_size: Bits,
}

/// A message handed to its destination endpoint (or to the next element on its route).
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct Delivery<P> {
    pub dest: EndpointId,
    pub msg: Message<P>,
}

/// A message waiting inside an element, together with the endpoint it is addressed to.
#[derive(Debug, Clone, derive_new::new)]
pub(crate) struct Transit<P> {
    pub(crate) dest: EndpointId,
    pub(crate) msg: Message<P>,
}

impl<P> Transit<P> {
    pub(crate) fn into_delivery(self) -> Delivery<P> {
        Delivery::new(self.dest, self.msg)
    }
}
