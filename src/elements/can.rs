use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::{
    elements::{check_missed, Context, Effects, NetworkElement},
    ident::{ElementId, EndpointId},
    message::{Message, Transit},
    queue::TimedQueue,
    time::{Delta, Time},
    units::{Bits, Kbps},
    Error,
};

/// CAN frame format, which fixes the number of bits on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    derivative::Derivative,
)]
#[derivative(Default)]
pub enum FrameFormat {
    #[derivative(Default)]
    Standard,
    Extended,
}

impl FrameFormat {
    pub const fn bits(self) -> Bits {
        match self {
            FrameFormat::Standard => Bits::new(108),
            FrameFormat::Extended => Bits::new(128),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    derivative::Derivative,
)]
#[derivative(Default)]
pub enum FramePolicy {
    /// Every accepted frame is transmitted.
    #[derivative(Default)]
    SendAll,
    /// A waiting frame is overwritten by a newer one for the same destination.
    MostRecent,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct CanPriority {
    pub dest: EndpointId,
    /// Lower values win arbitration.
    pub priority: u32,
}

/// Configuration of a [`CanBus`].
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct CanConfig {
    pub bit_rate: Kbps,
    #[builder(default)]
    #[serde(default)]
    pub frame_format: FrameFormat,
    #[builder(default)]
    #[serde(default)]
    pub policy: FramePolicy,
    #[builder(default)]
    #[serde(default)]
    pub priorities: Vec<CanPriority>,
}

impl CanConfig {
    pub(crate) fn validate(&self, id: ElementId) -> Result<(), Error> {
        let name = format!("CAN bus {id}");
        if self.bit_rate == Kbps::ZERO {
            return Err(Error::config(name, "bit rate must be positive"));
        }
        if let Some(p) = self.priorities.iter().find(|p| p.priority == 0) {
            return Err(Error::config(
                name,
                format!("priority for {} must be positive", p.dest),
            ));
        }
        Ok(())
    }

    pub(crate) fn build<P>(&self, id: ElementId) -> Result<CanBus<P>, Error> {
        self.validate(id)?;
        Ok(CanBus {
            id,
            frame_time: self
                .bit_rate
                .into_bps()
                .transmit(self.frame_format.bits())
                .into_delta(),
            policy: self.policy,
            priorities: self
                .priorities
                .iter()
                .map(|p| (p.dest, p.priority))
                .collect(),
            waiting: BTreeMap::new(),
            in_flight: TimedQueue::default(),
            started: None,
        })
    }
}

/// A priority-arbitrated shared bus.
///
/// While the bus is busy frames wait in one FIFO per priority level. When it frees up, the
/// highest-priority waiting frame wins. A frame that arrives at the very instant a transmission
/// started still takes part in that arbitration.
#[derive(Debug)]
pub struct CanBus<P> {
    id: ElementId,
    frame_time: Delta,
    policy: FramePolicy,
    priorities: FxHashMap<EndpointId, u32>,

    waiting: BTreeMap<u32, VecDeque<Transit<P>>>,
    in_flight: TimedQueue<(u32, Transit<P>)>,
    started: Option<Time>,
}

impl<P> CanBus<P> {
    fn priority(&self, dest: EndpointId) -> u32 {
        self.priorities.get(&dest).copied().unwrap_or(1)
    }

    fn enqueue(&mut self, priority: u32, transit: Transit<P>) {
        let queue = self.waiting.entry(priority).or_default();
        if self.policy == FramePolicy::MostRecent {
            queue.retain(|t| t.dest != transit.dest);
        }
        queue.push_back(transit);
    }

    fn start_next(&mut self, now: Time) {
        let Some(mut entry) = self.waiting.first_entry() else {
            return;
        };
        let priority = *entry.key();
        let queue = entry.get_mut();
        let next = queue.pop_front();
        if queue.is_empty() {
            entry.remove();
        }
        if let Some(transit) = next {
            trace!(element = %self.id, priority, dest = %transit.dest, "won arbitration");
            self.in_flight.push(now + self.frame_time, (priority, transit));
            self.started = Some(now);
        }
    }

    /// Whether a frame of `priority` arriving at `now` takes the bus from the current one.
    fn preempts(&self, priority: u32, now: Time) -> bool {
        self.started == Some(now)
            && self
                .in_flight
                .last()
                .is_some_and(|(_, &(current, _))| priority < current)
    }
}

impl<P> NetworkElement<P> for CanBus<P> {
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
        let priority = self.priority(dest);
        debug!(element = %self.id, %dest, priority, at = %now, "CAN frame accepted");
        if self.in_flight.is_empty() {
            self.enqueue(priority, Transit::new(dest, msg));
            self.start_next(now);
        } else if self.preempts(priority, now) {
            if let Some((_, (lost, transit))) = self.in_flight.pop_front() {
                self.waiting.entry(lost).or_default().push_front(transit);
            }
            self.enqueue(priority, Transit::new(dest, msg));
            self.start_next(now);
        } else {
            self.enqueue(priority, Transit::new(dest, msg));
        }
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn process(&mut self, now: Time) -> Result<Effects<P>, Error> {
        check_missed(self.id, self.next_wakeup(), now);
        let mut ctx = Context::new(now);
        if let Some((priority, transit)) = self.in_flight.pop_due(now) {
            // Replicas of a multicast frame share its transmission
            if let Some(queue) = self.waiting.get_mut(&priority) {
                let (replicas, rest): (VecDeque<_>, VecDeque<_>) = queue
                    .drain(..)
                    .partition(|t| t.msg.is_replica_of(&transit.msg));
                *queue = rest;
                if queue.is_empty() {
                    self.waiting.remove(&priority);
                }
                debug!(element = %self.id, dest = %transit.dest, replicas = replicas.len(), at = %now, "CAN frame delivered");
                ctx.deliver(transit);
                replicas.into_iter().for_each(|t| ctx.deliver(t));
            } else {
                debug!(element = %self.id, dest = %transit.dest, at = %now, "CAN frame delivered");
                ctx.deliver(transit);
            }
            self.started = None;
            self.start_next(now);
        }
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn reset(&mut self) {
        self.waiting.clear();
        self.in_flight.clear();
        self.started = None;
    }

    fn next_wakeup(&self) -> Option<Time> {
        self.in_flight.earliest()
    }
}
