use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    elements::{check_missed, Context, Effects, NetworkElement},
    ident::{ElementId, EndpointId},
    message::{Message, Transit},
    queue::TimedQueue,
    time::{Delta, Time},
    units::Nanosecs,
    Error,
};

/// Configuration of a [`Bus`].
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct BusConfig {
    /// Service time of a message of length one.
    #[builder(setter(into))]
    pub service_time_factor: Nanosecs,
    /// Message length per destination; destinations not listed have length 1.
    #[builder(default)]
    #[serde(default)]
    pub message_lengths: Vec<MessageLength>,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct MessageLength {
    pub dest: EndpointId,
    pub length: u64,
}

impl BusConfig {
    pub(crate) fn validate(&self, id: ElementId) -> Result<(), Error> {
        let name = format!("bus {id}");
        if self.service_time_factor == Nanosecs::ZERO {
            return Err(Error::config(name, "service time factor must be positive"));
        }
        if let Some(l) = self.message_lengths.iter().find(|l| l.length == 0) {
            return Err(Error::config(
                name,
                format!("message length for {} must be positive", l.dest),
            ));
        }
        Ok(())
    }

    pub(crate) fn build<P>(&self, id: ElementId) -> Result<Bus<P>, Error> {
        self.validate(id)?;
        Ok(Bus {
            id,
            factor: self.service_time_factor.into_delta(),
            lengths: self
                .message_lengths
                .iter()
                .map(|l| (l.dest, l.length))
                .collect(),
            in_flight: TimedQueue::default(),
            waiting: VecDeque::new(),
        })
    }
}

/// A shared medium that carries one message at a time, first come first served.
#[derive(Debug)]
pub struct Bus<P> {
    id: ElementId,
    factor: Delta,
    lengths: FxHashMap<EndpointId, u64>,
    // Holds at most one message
    in_flight: TimedQueue<Transit<P>>,
    waiting: VecDeque<Transit<P>>,
}

impl<P> Bus<P> {
    fn service_time(&self, dest: EndpointId) -> Delta {
        let length = self.lengths.get(&dest).copied().unwrap_or(1);
        Delta::new(self.factor.into_u128() * u128::from(length))
    }

    fn start_next(&mut self, now: Time) {
        if let Some(transit) = self.waiting.pop_front() {
            let done = now + self.service_time(transit.dest);
            debug!(element = %self.id, dest = %transit.dest, done = %done, "bus transmission started");
            self.in_flight.push(done, transit);
        }
    }

    /// Number of messages on or waiting for the medium.
    pub fn backlog(&self) -> usize {
        self.in_flight.len() + self.waiting.len()
    }
}

impl<P> NetworkElement<P> for Bus<P> {
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
        self.waiting.push_back(Transit::new(dest, msg));
        if self.in_flight.is_empty() {
            self.start_next(now);
        }
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn process(&mut self, now: Time) -> Result<Effects<P>, Error> {
        check_missed(self.id, self.next_wakeup(), now);
        let mut ctx = Context::new(now);
        if let Some(transit) = self.in_flight.pop_due(now) {
            debug!(element = %self.id, dest = %transit.dest, at = %now, "bus delivered");
            ctx.deliver(transit);
            self.start_next(now);
        }
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn reset(&mut self) {
        self.in_flight.clear();
        self.waiting.clear();
    }

    fn next_wakeup(&self) -> Option<Time> {
        self.in_flight.earliest()
    }
}

#[cfg(test)]
mod tests {
    use crate::units::Millisecs;

    use super::*;

    fn bus(lengths: Vec<MessageLength>) -> anyhow::Result<Bus<&'static str>> {
        let cfg = BusConfig::builder()
            .service_time_factor(Millisecs::new(10).into_ns())
            .message_lengths(lengths)
            .build();
        Ok(cfg.build(ElementId::ZERO)?)
    }

    fn msg(payload: &'static str, at: Time) -> Message<&'static str> {
        Message::new(EndpointId::ZERO, at, payload)
    }

    #[test]
    fn one_message_in_flight_at_a_time() -> anyhow::Result<()> {
        let mut bus = bus(vec![])?;
        let dest = EndpointId::ONE;
        let t0 = Time::ZERO;
        let fx = bus.accept(dest, msg("a", t0), t0)?;
        assert_eq!(fx.wakeup, Some(Millisecs::new(10).into_time()));
        // The second message queues behind the first without moving the wake-up
        let fx = bus.accept(dest, msg("b", t0), t0)?;
        assert_eq!(fx.wakeup, Some(Millisecs::new(10).into_time()));
        assert_eq!(bus.backlog(), 2);

        let fx = bus.process(Millisecs::new(10).into_time())?;
        assert_eq!(fx.deliveries.len(), 1);
        assert_eq!(fx.deliveries[0].msg.payload, "a");
        assert_eq!(fx.wakeup, Some(Millisecs::new(20).into_time()));

        let fx = bus.process(Millisecs::new(20).into_time())?;
        assert_eq!(fx.deliveries[0].msg.payload, "b");
        assert_eq!(fx.wakeup, None);
        Ok(())
    }

    #[test]
    fn service_time_scales_with_destination_length() -> anyhow::Result<()> {
        let far = EndpointId::new(7);
        let mut bus = bus(vec![MessageLength::new(far, 3)])?;
        let fx = bus.accept(far, msg("a", Time::ZERO), Time::ZERO)?;
        assert_eq!(fx.wakeup, Some(Millisecs::new(30).into_time()));
        Ok(())
    }

    #[test]
    fn rejects_zero_factor_and_length() {
        let cfg = BusConfig::builder()
            .service_time_factor(Nanosecs::ZERO)
            .build();
        assert!(matches!(
            cfg.build::<()>(ElementId::ZERO),
            Err(Error::Configuration { .. })
        ));
        let cfg = BusConfig::builder()
            .service_time_factor(Nanosecs::ONE)
            .message_lengths(vec![MessageLength::new(EndpointId::ONE, 0)])
            .build();
        assert!(cfg.build::<()>(ElementId::ZERO).is_err());
    }
}
