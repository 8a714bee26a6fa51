use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::{debug, error, trace};

use crate::{
    elements::{check_missed, Context, Effects, NetworkElement},
    ident::{ElementId, EndpointId},
    message::{Message, Transit},
    queue::TimedQueue,
    time::{Delta, Time},
    units::Nanosecs,
    Error,
};

/// Configuration of a [`TtEtArbiter`].
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct TtEtConfig {
    #[builder(setter(into))]
    pub service_time: Nanosecs,
    /// Senders whose traffic follows the offline time-triggered schedule. Everything else is
    /// event-triggered.
    #[builder(default)]
    #[serde(default)]
    pub time_triggered: Vec<EndpointId>,
}

impl TtEtConfig {
    pub(crate) fn validate(&self, id: ElementId) -> Result<(), Error> {
        if self.service_time == Nanosecs::ZERO {
            return Err(Error::config(
                format!("TT/ET arbiter {id}"),
                "service time must be positive",
            ));
        }
        Ok(())
    }

    pub(crate) fn build<P>(&self, id: ElementId) -> Result<TtEtArbiter<P>, Error> {
        self.validate(id)?;
        Ok(TtEtArbiter {
            id,
            service_time: self.service_time.into_delta(),
            time_triggered: self.time_triggered.iter().copied().collect(),
            in_service: TimedQueue::default(),
            pending_tt: None,
            pending_et: VecDeque::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TrafficClass {
    #[display(fmt = "TT")]
    TimeTriggered,
    #[display(fmt = "ET")]
    EventTriggered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterState {
    Idle,
    ServicingTt,
    ServicingEt,
}

/// Arbitrates between time-triggered and event-triggered traffic on one shared resource.
///
/// One frame is serviced at a time. When the resource frees up a pending time-triggered frame goes
/// first, then event-triggered frames in arrival order. At most one time-triggered frame may wait;
/// a second one means the offline schedule is broken and is reported as
/// [`Error::ScheduleViolation`].
#[derive(Debug)]
pub struct TtEtArbiter<P> {
    id: ElementId,
    service_time: Delta,
    time_triggered: FxHashSet<EndpointId>,

    // Holds at most one frame
    in_service: TimedQueue<(TrafficClass, Transit<P>)>,
    pending_tt: Option<Transit<P>>,
    pending_et: VecDeque<Transit<P>>,
}

impl<P> TtEtArbiter<P> {
    pub fn classify(&self, source: EndpointId) -> TrafficClass {
        if self.time_triggered.contains(&source) {
            TrafficClass::TimeTriggered
        } else {
            TrafficClass::EventTriggered
        }
    }

    pub fn state(&self) -> ArbiterState {
        match self.in_service.iter().next() {
            None => ArbiterState::Idle,
            Some((_, (TrafficClass::TimeTriggered, _))) => ArbiterState::ServicingTt,
            Some((_, (TrafficClass::EventTriggered, _))) => ArbiterState::ServicingEt,
        }
    }

    /// Whether a time-triggered frame arriving at `now` collides with one already held.
    fn violates_schedule(&self, now: Time) -> bool {
        if self.pending_tt.is_some() {
            return true;
        }
        // A frame finishing exactly at `now` has left the resource
        self.in_service
            .iter()
            .any(|(done, (class, _))| *class == TrafficClass::TimeTriggered && done > now)
    }

    fn start(&mut self, class: TrafficClass, transit: Transit<P>, now: Time) {
        let done = now + self.service_time;
        trace!(element = %self.id, %class, dest = %transit.dest, done = %done, "servicing");
        self.in_service.push(done, (class, transit));
    }

    fn start_next(&mut self, now: Time) {
        if let Some(transit) = self.pending_tt.take() {
            self.start(TrafficClass::TimeTriggered, transit, now);
        } else if let Some(transit) = self.pending_et.pop_front() {
            self.start(TrafficClass::EventTriggered, transit, now);
        }
    }

    pub fn backlog(&self) -> usize {
        self.in_service.len() + usize::from(self.pending_tt.is_some()) + self.pending_et.len()
    }
}

impl<P> NetworkElement<P> for TtEtArbiter<P> {
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
        let class = self.classify(msg.source);
        if class == TrafficClass::TimeTriggered && self.violates_schedule(now) {
            error!(element = %self.id, source = %msg.source, at = %now, "time-triggered schedule violated");
            return Err(Error::ScheduleViolation {
                element: self.id,
                at: now,
            });
        }
        debug!(element = %self.id, %class, %dest, at = %now, "arbiter accepted");
        let transit = Transit::new(dest, msg);
        if self.in_service.is_empty() {
            self.start(class, transit, now);
        } else {
            match class {
                TrafficClass::TimeTriggered => self.pending_tt = Some(transit),
                TrafficClass::EventTriggered => self.pending_et.push_back(transit),
            }
        }
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn process(&mut self, now: Time) -> Result<Effects<P>, Error> {
        check_missed(self.id, self.next_wakeup(), now);
        let mut ctx = Context::new(now);
        if let Some((class, transit)) = self.in_service.pop_due(now) {
            debug!(element = %self.id, %class, dest = %transit.dest, at = %now, "arbiter delivered");
            ctx.deliver(transit);
            self.start_next(now);
        }
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn reset(&mut self) {
        self.in_service.clear();
        self.pending_tt = None;
        self.pending_et.clear();
    }

    fn next_wakeup(&self) -> Option<Time> {
        self.in_service.earliest()
    }
}
