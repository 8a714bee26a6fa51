use std::collections::BinaryHeap;

use delegate::delegate;

use crate::time::Time;

use super::{event::Event, Command};

#[derive(Debug, derivative::Derivative)]
#[derivative(Default(bound = ""))]
pub(crate) struct Schedule<P> {
    inner: BinaryHeap<Event<P>>,
    seq: u64,
}

impl<P> Schedule<P> {
    pub(crate) fn push(&mut self, time: Time, cmd: impl Into<Command<P>>) {
        let seq = self.seq;
        self.seq += 1;
        self.inner.push(Event::new(time, seq, cmd));
    }

    pub(crate) fn peek_time(&self) -> Option<Time> {
        self.inner.peek().map(Event::time)
    }

    delegate! {
        to self.inner {
            pub(crate) fn pop(&mut self) -> Option<Event<P>>;
            pub(crate) fn is_empty(&self) -> bool;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ident::ElementId;

    use super::*;

    #[test]
    fn pops_in_time_then_fifo_order() {
        let mut schedule = Schedule::<()>::default();
        for (time, version) in [(5, 0), (1, 1), (5, 2), (1, 3)] {
            let cmd = Command::Wake {
                element: ElementId::ZERO,
                version,
            };
            schedule.push(Time::new(time), cmd);
        }
        assert_eq!(schedule.peek_time(), Some(Time::new(1)));
        let mut order = Vec::new();
        while let Some(ev) = schedule.pop() {
            if let Command::Wake { version, .. } = ev.cmd {
                order.push(version);
            }
        }
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
