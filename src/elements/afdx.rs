use tracing::{debug, trace};

use crate::{
    elements::{basic::check_port_map, check_missed, Context, Effects, NetworkElement},
    ident::{ElementId, EndpointId},
    message::{Message, Transit},
    port::{PortBinding, PortMap, Ports},
    queue::{self, TimedQueue},
    time::{Delta, Time},
    units::{BitsPerSec, Mbps, Nanosecs},
    Error,
};

/// Configuration of an [`AfdxSwitch`].
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct AfdxSwitchConfig {
    pub nr_ports: usize,
    pub bit_rate: Mbps,
    /// Fixed latency of the switching fabric. May be zero.
    #[builder(default, setter(into))]
    #[serde(default)]
    pub technological_delay: Nanosecs,
    pub inputs: Vec<PortBinding>,
    pub outputs: Vec<PortBinding>,
}

impl AfdxSwitchConfig {
    pub(crate) fn validate(&self, name: &str) -> Result<(), Error> {
        if self.nr_ports == 0 {
            return Err(Error::config(name, "number of ports must be positive"));
        }
        if self.bit_rate == Mbps::ZERO {
            return Err(Error::config(name, "bit rate must be positive"));
        }
        check_port_map(name, self.nr_ports, &self.port_map())
    }

    fn port_map(&self) -> PortMap {
        PortMap::new(&self.inputs, &self.outputs)
    }

    pub(crate) fn build<P>(&self, id: ElementId) -> Result<AfdxSwitch<P>, Error> {
        self.validate(&format!("AFDX switch {id}"))?;
        Ok(AfdxSwitch {
            id,
            ports: self.port_map(),
            bit_rate: self.bit_rate.into_bps(),
            technological_delay: self.technological_delay.into_delta(),
            inputs: Ports::new(self.nr_ports),
            fabric: TimedQueue::default(),
            outputs: Ports::new(self.nr_ports),
        })
    }
}

/// An AFDX switch.
///
/// Frames cross the fabric after the technological delay and are then serialized on their output
/// port at the port's bit rate, using the frame size carried by their virtual-link tag. Replicas of
/// one multicast frame are not serialized twice.
#[derive(Debug)]
pub struct AfdxSwitch<P> {
    id: ElementId,
    ports: PortMap,
    bit_rate: BitsPerSec,
    technological_delay: Delta,

    inputs: Ports<TimedQueue<Transit<P>>>,
    fabric: TimedQueue<Transit<P>>,
    outputs: Ports<TimedQueue<Transit<P>>>,
}

impl<P> AfdxSwitch<P> {
    fn queues(&self) -> impl Iterator<Item = &TimedQueue<Transit<P>>> {
        self.inputs
            .iter()
            .chain(std::iter::once(&self.fabric))
            .chain(self.outputs.iter())
    }

    pub fn backlog(&self) -> usize {
        self.queues().map(TimedQueue::len).sum()
    }
}

/// The due time of `transit` when appended to `queue`: with its predecessor if it is a replica of
/// it, otherwise `fresh`.
fn replica_or<P>(queue: &TimedQueue<Transit<P>>, transit: &Transit<P>, fresh: Time) -> Time {
    match queue.last() {
        Some((due, last)) if last.msg.is_replica_of(&transit.msg) => due,
        _ => fresh,
    }
}

impl<P> NetworkElement<P> for AfdxSwitch<P> {
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
        if msg.frame.is_none() {
            return Err(Error::UnknownVirtualLink {
                endpoint: msg.source,
            });
        }
        let port = self.ports.input(msg.source)?;
        let queue = &mut self.inputs[port];
        let due = queue.tail_or(now);
        debug!(element = %self.id, %port, %dest, due = %due, "AFDX switch accepted");
        queue.push(due, Transit::new(dest, msg));
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn process(&mut self, now: Time) -> Result<Effects<P>, Error> {
        check_missed(self.id, self.next_wakeup(), now);
        let mut ctx = Context::new(now);

        for input in self.inputs.iter_mut() {
            while let Some(transit) = input.pop_due(now) {
                let due = replica_or(&self.fabric, &transit, now + self.technological_delay);
                trace!(element = %self.id, dest = %transit.dest, due = %due, "into fabric");
                self.fabric.push(due, transit);
            }
        }

        while let Some(transit) = self.fabric.peek_due(now) {
            let port = self.ports.output(transit.dest)?;
            let Some(transit) = self.fabric.pop_due(now) else {
                break;
            };
            let output = &mut self.outputs[port];
            let frame_size = transit
                .msg
                .frame
                .as_ref()
                .map(|tag| tag.frame_size)
                .unwrap_or_default();
            let serialized = output.tail_or(now) + self.bit_rate.transmit(frame_size).into_delta();
            let due = replica_or(output, &transit, serialized);
            trace!(element = %self.id, %port, dest = %transit.dest, due = %due, "into output port");
            output.push(due, transit);
        }

        for output in self.outputs.iter_mut() {
            while let Some(transit) = output.pop_due(now) {
                debug!(element = %self.id, dest = %transit.dest, at = %now, "AFDX switch delivered");
                ctx.deliver(transit);
            }
        }

        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn reset(&mut self) {
        self.inputs.iter_mut().for_each(TimedQueue::clear);
        self.fabric.clear();
        self.outputs.iter_mut().for_each(TimedQueue::clear);
    }

    fn next_wakeup(&self) -> Option<Time> {
        queue::next_wakeup(self.queues())
    }
}
