pub(crate) mod event;
mod schedule;

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, error};

use crate::{
    data::Record,
    elements::{Effects, Element, NetworkElement},
    ident::{ElementId, EndpointId},
    message::{Delivery, Message},
    time::Time,
    Error,
};

use self::schedule::Schedule;

/// Hops of a (source, destination) pair, in traversal order.
pub(crate) type RouteTable = FxHashMap<(EndpointId, EndpointId), Vec<ElementId>>;

#[derive(Debug)]
pub(crate) struct Slot<P> {
    element: Element<P>,
    // Bumped whenever the pending wake-up is superseded
    version: u64,
    wake: Option<Time>,
}

impl<P> Slot<P> {
    pub(crate) fn new(element: Element<P>) -> Self {
        Self {
            element,
            version: 0,
            wake: None,
        }
    }
}

#[derive(Debug, typed_builder::TypedBuilder)]
pub(crate) struct Simulation<P> {
    // Run-time
    #[builder(default, setter(skip))]
    cur_time: Time,
    #[builder(default, setter(skip))]
    schedule: Schedule<P>,
    #[builder(default, setter(skip))]
    records: Vec<Record<P>>,

    // Topology
    elements: FxHashMap<ElementId, Slot<P>>,
    routes: RouteTable,

    // Used for termination
    timeout: Option<Time>,
}

impl<P> Simulation<P> {
    /// Schedules `payload` to be sent from `source` to `dest` at `at`.
    pub(crate) fn inject(&mut self, source: EndpointId, dest: EndpointId, at: Time, payload: P) {
        let msg = Message::new(source, at, payload);
        self.schedule.push(at, Command::Send { dest, msg });
    }

    pub(crate) fn run(mut self) -> Result<Vec<Record<P>>, Error> {
        while !self.should_stop() {
            if let Err(e) = self.step() {
                error!(at = %self.cur_time, error = %e, "simulation step aborted");
                return Err(e);
            }
        }
        Ok(self.records)
    }

    fn step(&mut self) -> Result<(), Error> {
        let Some(next) = self.schedule.pop() else {
            return Ok(());
        };
        let (time, cmd) = (next.time(), next.cmd);
        debug_assert!(self.cur_time <= time);
        self.cur_time = time;

        let mut pending = VecDeque::new();
        match cmd {
            Command::Send { dest, msg } => self.send(dest, msg, &mut pending)?,
            Command::Wake { element, version } => self.wake(element, version, &mut pending)?,
        }
        // Deliveries reach their next hop at the instant they leave the previous one
        let now = self.cur_time;
        while let Some((element, delivery)) = pending.pop_front() {
            let fx = self
                .slot(element)?
                .element
                .accept(delivery.dest, delivery.msg, now)?;
            self.apply(element, fx, &mut pending)?;
        }
        Ok(())
    }

    fn should_stop(&self) -> bool {
        self.schedule.is_empty()
            || self
                .schedule
                .peek_time()
                .is_some_and(|next| next > self.timeout.unwrap_or(Time::MAX))
    }

    fn slot(&mut self, id: ElementId) -> Result<&mut Slot<P>, Error> {
        self.elements.get_mut(&id).ok_or(Error::UnknownElement(id))
    }

    fn send(
        &mut self,
        dest: EndpointId,
        msg: Message<P>,
        pending: &mut Pending<P>,
    ) -> Result<(), Error> {
        let first = self
            .routes
            .get(&(msg.source, dest))
            .ok_or(Error::UnresolvedRouting { endpoint: dest })?
            .first()
            .copied();
        match first {
            Some(first) => pending.push_back((first, Delivery::new(dest, msg))),
            None => self.record(Delivery::new(dest, msg)),
        }
        Ok(())
    }

    fn wake(
        &mut self,
        id: ElementId,
        version: u64,
        pending: &mut Pending<P>,
    ) -> Result<(), Error> {
        let now = self.cur_time;
        let slot = self.slot(id)?;
        if slot.version != version {
            return Ok(());
        }
        slot.wake = None;
        let fx = slot.element.process(now)?;
        self.apply(id, fx, pending)
    }

    /// Forwards the deliveries in `fx` and books the wake-up it asks for.
    fn apply(
        &mut self,
        id: ElementId,
        fx: Effects<P>,
        pending: &mut Pending<P>,
    ) -> Result<(), Error> {
        for delivery in fx.deliveries {
            match self.next_hop(id, &delivery)? {
                Some(next) => pending.push_back((next, delivery)),
                None => self.record(delivery),
            }
        }

        let now = self.cur_time;
        let slot = self.slot(id)?;
        match fx.wakeup {
            Some(at) if at < now => {
                return Err(Error::MissedWakeup {
                    element: id,
                    at,
                    now,
                });
            }
            Some(at) if slot.wake != Some(at) => {
                slot.version += 1;
                slot.wake = Some(at);
                let version = slot.version;
                debug!(element = %id, at = %at, version, "wake-up booked");
                self.schedule.push(at, Command::Wake { element: id, version });
            }
            Some(_) => {}
            None => {
                if slot.wake.take().is_some() {
                    slot.version += 1;
                }
            }
        }
        Ok(())
    }

    fn next_hop(
        &self,
        current: ElementId,
        delivery: &Delivery<P>,
    ) -> Result<Option<ElementId>, Error> {
        let unresolved = || Error::UnresolvedRouting {
            endpoint: delivery.dest,
        };
        let hops = self
            .routes
            .get(&(delivery.msg.source, delivery.dest))
            .ok_or_else(unresolved)?;
        let pos = hops
            .iter()
            .position(|&hop| hop == current)
            .ok_or_else(unresolved)?;
        Ok(hops.get(pos + 1).copied())
    }

    fn record(&mut self, delivery: Delivery<P>) {
        let Delivery { dest, msg } = delivery;
        debug!(source = %msg.source, %dest, at = %self.cur_time, "delivered to receiver");
        self.records.push(Record {
            source: msg.source,
            dest,
            origin: msg.origin,
            delivered: self.cur_time,
            payload: msg.payload,
        });
    }
}

type Pending<P> = VecDeque<(ElementId, Delivery<P>)>;

#[derive(Debug)]
pub(crate) enum Command<P> {
    /// A sender hands `msg` to the first element on its route.
    Send { dest: EndpointId, msg: Message<P> },
    /// Reactivates an element, unless a later request superseded this one.
    Wake { element: ElementId, version: u64 },
}

#[cfg(test)]
mod tests {
    use crate::{elements::bus::BusConfig, units::Millisecs};

    use super::*;

    fn ms(n: u64) -> Time {
        Millisecs::new(n).into_time()
    }

    fn bus_simulation() -> anyhow::Result<Simulation<char>> {
        let bus = BusConfig::builder()
            .service_time_factor(Millisecs::new(10).into_ns())
            .build()
            .build(ElementId::ZERO)?;
        let mut elements = FxHashMap::default();
        elements.insert(ElementId::ZERO, Slot::new(Element::Bus(bus)));
        let mut routes = RouteTable::default();
        routes.insert((EndpointId::ZERO, EndpointId::ONE), vec![ElementId::ZERO]);
        Ok(Simulation::builder()
            .elements(elements)
            .routes(routes)
            .timeout(None)
            .build())
    }

    #[test]
    fn forwards_along_the_route() -> anyhow::Result<()> {
        let mut sim = bus_simulation()?;
        sim.inject(EndpointId::ZERO, EndpointId::ONE, ms(0), 'a');
        sim.inject(EndpointId::ZERO, EndpointId::ONE, ms(0), 'b');
        let records = sim.run()?;
        let got: Vec<_> = records.iter().map(|r| (r.payload, r.delivered)).collect();
        assert_eq!(got, vec![('a', ms(10)), ('b', ms(20))]);
        Ok(())
    }

    #[test]
    fn wake_up_in_the_past_aborts_the_run() -> anyhow::Result<()> {
        let mut sim = bus_simulation()?;
        // Occupy the bus until 10 ms without booking its wake-up
        let msg = Message::new(EndpointId::ZERO, ms(0), 'a');
        let slot = sim.slot(ElementId::ZERO)?;
        slot.element.accept(EndpointId::ONE, msg, ms(0))?;
        sim.inject(EndpointId::ZERO, EndpointId::ONE, ms(20), 'b');
        let err = sim.run();
        assert!(matches!(
            err,
            Err(Error::MissedWakeup { element, at, now })
                if element == ElementId::ZERO && at == ms(10) && now == ms(20)
        ));
        Ok(())
    }
}
