use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::{
    elements::{
        check_missed,
        vlink::{VirtualLink, VlinkPort},
        Context, Effects, NetworkElement,
    },
    ident::{ElementId, EndpointId, MuxName, VlinkName},
    message::{FrameTag, Message, Transit},
    queue::{self, TimedQueue},
    time::Time,
    units::{BitsPerSec, Mbps, Nanosecs},
    Error,
};

/// Configuration of an [`AfdxEndSystem`].
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct EndSystemConfig {
    pub bit_rate: Mbps,
    pub vlinks: Vec<VlinkPort>,
}

impl EndSystemConfig {
    pub(crate) fn validate(&self, id: ElementId) -> Result<(), Error> {
        let name = format!("end system {id}");
        if self.bit_rate == Mbps::ZERO {
            return Err(Error::config(name, "bit rate must be positive"));
        }
        let mut seen: FxHashMap<&VlinkName, VirtualLink> = FxHashMap::default();
        for port in &self.vlinks {
            if port.bag == Nanosecs::ZERO {
                return Err(Error::config(
                    name,
                    format!("bag of virtual link {} must be positive", port.vlink),
                ));
            }
            match seen.get(&port.vlink) {
                Some(link) if !link.agrees_with(port) => {
                    return Err(Error::config(
                        name,
                        format!("conflicting declarations of virtual link {}", port.vlink),
                    ));
                }
                Some(_) => {}
                None => {
                    seen.insert(&port.vlink, VirtualLink::new(port));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn build<P>(&self, id: ElementId) -> Result<AfdxEndSystem<P>, Error> {
        self.validate(id)?;
        let mut es = AfdxEndSystem {
            id,
            bit_rate: self.bit_rate.into_bps(),
            links: Vec::new(),
            link_index: FxHashMap::default(),
            port_to_link: FxHashMap::default(),
            muxes: Vec::new(),
        };
        for port in &self.vlinks {
            let link = es.declare(port);
            es.port_to_link.insert(port.endpoint, link);
        }
        Ok(es)
    }
}

#[derive(Debug)]
struct LinkSlot<P> {
    link: VirtualLink,
    queue: TimedQueue<Transit<P>>,
    mux: usize,
}

#[derive(Debug)]
struct Multiplexer<P> {
    name: MuxName,
    queue: TimedQueue<Transit<P>>,
}

/// An AFDX end system.
///
/// Each virtual link holds its frames back until its bag allows them out; the link's scheduler
/// multiplexer then serializes them onto the wire at the configured bit rate. Frames leave tagged
/// with their virtual link so that downstream AFDX switches know their size.
#[derive(Debug)]
pub struct AfdxEndSystem<P> {
    id: ElementId,
    bit_rate: BitsPerSec,
    // Declaration order
    links: Vec<LinkSlot<P>>,
    link_index: FxHashMap<VlinkName, usize>,
    port_to_link: FxHashMap<EndpointId, usize>,
    muxes: Vec<Multiplexer<P>>,
}

impl<P> AfdxEndSystem<P> {
    fn declare(&mut self, port: &VlinkPort) -> usize {
        if let Some(&idx) = self.link_index.get(&port.vlink) {
            return idx;
        }
        let mux = match self.muxes.iter().position(|m| m.name == port.group) {
            Some(mux) => mux,
            None => {
                self.muxes.push(Multiplexer {
                    name: port.group.clone(),
                    queue: TimedQueue::default(),
                });
                self.muxes.len() - 1
            }
        };
        self.links.push(LinkSlot {
            link: VirtualLink::new(port),
            queue: TimedQueue::default(),
            mux,
        });
        let idx = self.links.len() - 1;
        self.link_index.insert(port.vlink.clone(), idx);
        idx
    }

    /// The virtual link named `name`, if declared.
    pub fn vlink(&self, name: &VlinkName) -> Option<&VirtualLink> {
        self.link_index.get(name).map(|&idx| &self.links[idx].link)
    }

    fn queues(&self) -> impl Iterator<Item = &TimedQueue<Transit<P>>> {
        self.links
            .iter()
            .map(|slot| &slot.queue)
            .chain(self.muxes.iter().map(|mux| &mux.queue))
    }
}

impl<P> NetworkElement<P> for AfdxEndSystem<P> {
    fn id(&self) -> ElementId {
        self.id
    }

    fn accept(
        &mut self,
        dest: EndpointId,
        msg: Message<P>,
        now: Time,
    ) -> Result<Effects<P>, Error> {
        let ctx = Context::new(now);
        let idx = *self
            .port_to_link
            .get(&dest)
            .ok_or(Error::UnresolvedRouting { endpoint: dest })?;
        let slot = &mut self.links[idx];
        let departure = slot.link.schedule(msg.source, msg.origin, now);
        debug!(
            element = %self.id,
            vlink = %slot.link.name(),
            %dest,
            departure = %departure,
            "frame accepted"
        );
        slot.queue.push(departure, Transit::new(dest, msg));
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn process(&mut self, now: Time) -> Result<Effects<P>, Error> {
        check_missed(self.id, self.next_wakeup(), now);
        let mut ctx = Context::new(now);

        // Virtual links to their scheduler multiplexers
        for slot in self.links.iter_mut() {
            while let Some(mut transit) = slot.queue.pop_due(now) {
                let mux = &mut self.muxes[slot.mux].queue;
                let due = match mux.last() {
                    Some((due, last)) if last.msg.is_replica_of(&transit.msg) => due,
                    _ => {
                        let wire = self.bit_rate.transmit(slot.link.frame_size());
                        mux.tail_or(now) + wire.into_delta()
                    }
                };
                trace!(element = %self.id, vlink = %slot.link.name(), due = %due, "into multiplexer");
                transit.msg.frame = Some(FrameTag::new(
                    slot.link.name().clone(),
                    slot.link.frame_size(),
                ));
                mux.push(due, transit);
            }
        }

        // Multiplexers onto the wire
        for mux in self.muxes.iter_mut() {
            while let Some(transit) = mux.queue.pop_due(now) {
                debug!(element = %self.id, mux = %mux.name, dest = %transit.dest, at = %now, "frame sent");
                ctx.deliver(transit);
            }
        }

        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn reset(&mut self) {
        for slot in self.links.iter_mut() {
            slot.link.reset();
            slot.queue.clear();
        }
        self.muxes.iter_mut().for_each(|mux| mux.queue.clear());
    }

    fn next_wakeup(&self) -> Option<Time> {
        queue::next_wakeup(self.queues())
    }
}
