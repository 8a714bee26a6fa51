use crate::{
    ident::{EndpointId, MuxName, VlinkName},
    time::{Delta, Time},
    units::{Bits, Nanosecs},
};

/// Declares that frames addressed to `endpoint` travel on virtual link `vlink`.
///
/// Several endpoints may declare the same link; that is how a multicast link reaches more than one
/// receiver. All declarations of one link must agree on its parameters.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct VlinkPort {
    pub endpoint: EndpointId,
    #[builder(setter(into))]
    pub vlink: VlinkName,
    /// Minimum spacing between two frame departures.
    #[builder(setter(into))]
    pub bag: Nanosecs,
    pub frame_size: Bits,
    /// The scheduler multiplexer that serializes this link's frames.
    #[builder(setter(into))]
    pub group: MuxName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Departure {
    at: Time,
    source: EndpointId,
    origin: Time,
}

/// Rate-limiting state of one virtual link.
#[derive(Debug, Clone)]
pub struct VirtualLink {
    name: VlinkName,
    bag: Delta,
    frame_size: Bits,
    group: MuxName,
    last: Option<Departure>,
}

impl VirtualLink {
    pub(crate) fn new(port: &VlinkPort) -> Self {
        Self {
            name: port.vlink.clone(),
            bag: port.bag.into_delta(),
            frame_size: port.frame_size,
            group: port.group.clone(),
            last: None,
        }
    }

    pub fn name(&self) -> &VlinkName {
        &self.name
    }

    pub fn frame_size(&self) -> Bits {
        self.frame_size
    }

    pub fn group(&self) -> &MuxName {
        &self.group
    }

    /// The most recent departure time handed out, if any.
    pub fn last_departure(&self) -> Option<Time> {
        self.last.map(|d| d.at)
    }

    /// Whether `port` declares the same link parameters as `self`.
    pub(crate) fn agrees_with(&self, port: &VlinkPort) -> bool {
        self.bag == port.bag.into_delta()
            && self.frame_size == port.frame_size
            && self.group == port.group
    }

    /// Assigns a departure time to a frame accepted at `now` and records it.
    ///
    /// A replica of the previous frame (same source, same origin) leaves with it, or at `now` if
    /// it arrives after that frame has already left. Any other frame leaves no earlier than one bag
    /// after the previous departure.
    pub(crate) fn schedule(&mut self, source: EndpointId, origin: Time, now: Time) -> Time {
        let at = match self.last {
            None => now,
            Some(last) if last.source == source && last.origin == origin => last.at.max(now),
            Some(last) => (last.at + self.bag).max(now),
        };
        self.last = Some(Departure { at, source, origin });
        at
    }

    pub(crate) fn reset(&mut self) {
        self.last = None;
    }
}
