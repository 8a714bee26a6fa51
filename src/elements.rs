use smallvec::SmallVec;

use crate::{
    ident::{ElementId, EndpointId},
    message::{Delivery, Message, Transit},
    time::Time,
    Error,
};

pub mod afdx;
pub mod basic;
pub mod bus;
pub mod can;
pub mod crossbar;
pub mod end_system;
pub mod ttet;
pub mod vlink;

use self::{
    afdx::AfdxSwitch, basic::BasicSwitch, bus::Bus, can::CanBus, crossbar::CrossbarSwitch,
    end_system::AfdxEndSystem, ttet::TtEtArbiter,
};

// Most calls release very few messages
pub type DeliveryList<P> = SmallVec<[Delivery<P>; 4]>;

/// What a call into an element produced.
#[derive(Debug)]
pub struct Effects<P> {
    /// Messages that completed their last stage, in release order.
    pub deliveries: DeliveryList<P>,
    /// The instant the element asks to be reactivated at, if it has pending work.
    pub wakeup: Option<Time>,
}

impl<P> Effects<P> {
    pub fn is_idle(&self) -> bool {
        self.deliveries.is_empty() && self.wakeup.is_none()
    }
}

/// The contract shared by every network element.
///
/// An element never advances time on its own. The caller passes the current time into every call
/// and must call [`NetworkElement::process`] at each instant reported through
/// [`Effects::wakeup`]; an entry is only ever released at the exact instant it is due.
pub trait NetworkElement<P> {
    fn id(&self) -> ElementId;

    /// Takes `msg`, addressed to `dest`, into the element.
    fn accept(&mut self, dest: EndpointId, msg: Message<P>, now: Time)
        -> Result<Effects<P>, Error>;

    /// Moves every entry due at `now` to its next stage, delivering those that leave the element.
    fn process(&mut self, now: Time) -> Result<Effects<P>, Error>;

    /// Drops all queued messages and per-flow state. Configuration is kept.
    fn reset(&mut self);

    /// The earliest instant at which the element has work pending.
    fn next_wakeup(&self) -> Option<Time>;
}

#[derive(Debug)]
pub(crate) struct Context<P> {
    now: Time,
    deliveries: DeliveryList<P>,
}

impl<P> Context<P> {
    pub(crate) fn new(now: Time) -> Self {
        Self {
            now,
            deliveries: DeliveryList::new(),
        }
    }

    pub(crate) fn deliver(&mut self, transit: Transit<P>) {
        self.deliveries.push(transit.into_delivery());
    }

    pub(crate) fn into_effects(self, wakeup: Option<Time>) -> Effects<P> {
        if let Some(at) = wakeup {
            tracing::debug!(now = %self.now, at = %at, "requesting wake-up");
        }
        Effects {
            deliveries: self.deliveries,
            wakeup,
        }
    }
}

/// Logs entries that should have been released before `now`. They stay queued for good.
pub(crate) fn check_missed(element: ElementId, earliest: Option<Time>, now: Time) {
    if let Some(due) = earliest.filter(|&due| due < now) {
        tracing::warn!(%element, due = %due, now = %now, "missed wake-up");
    }
}

/// Any network element.
#[derive(Debug, derive_more::From)]
pub enum Element<P> {
    Bus(Bus<P>),
    CanBus(CanBus<P>),
    Basic(BasicSwitch<P>),
    Crossbar(CrossbarSwitch<P>),
    AfdxSwitch(AfdxSwitch<P>),
    AfdxEndSystem(AfdxEndSystem<P>),
    TtEt(TtEtArbiter<P>),
}

macro_rules! dispatch {
    ($self: expr, $inner: ident => $call: expr) => {
        match $self {
            Element::Bus($inner) => $call,
            Element::CanBus($inner) => $call,
            Element::Basic($inner) => $call,
            Element::Crossbar($inner) => $call,
            Element::AfdxSwitch($inner) => $call,
            Element::AfdxEndSystem($inner) => $call,
            Element::TtEt($inner) => $call,
        }
    };
}

impl<P> NetworkElement<P> for Element<P> {
    fn id(&self) -> ElementId {
        dispatch!(self, e => e.id())
    }

    fn accept(
        &mut self,
        dest: EndpointId,
        msg: Message<P>,
        now: Time,
    ) -> Result<Effects<P>, Error> {
        dispatch!(self, e => e.accept(dest, msg, now))
    }

    fn process(&mut self, now: Time) -> Result<Effects<P>, Error> {
        dispatch!(self, e => e.process(now))
    }

    fn reset(&mut self) {
        dispatch!(self, e => e.reset())
    }

    fn next_wakeup(&self) -> Option<Time> {
        dispatch!(self, e => e.next_wakeup())
    }
}
