#![allow(clippy::non_canonical_partial_ord_impl)]

use std::cmp::Reverse;

use crate::time::Time;

use super::Command;

#[derive(Debug, derivative::Derivative)]
#[derivative(
    PartialEq(bound = ""),
    Eq(bound = ""),
    PartialOrd(bound = ""),
    Ord(bound = "")
)]
pub(crate) struct Event<P> {
    // Equal times pop in the order they were scheduled
    key: Reverse<(Time, u64)>,
    #[derivative(PartialEq = "ignore", PartialOrd = "ignore", Ord = "ignore")]
    pub(crate) cmd: Command<P>,
}

impl<P> Event<P> {
    pub(crate) fn new(time: Time, seq: u64, cmd: impl Into<Command<P>>) -> Self {
        Self {
            key: Reverse((time, seq)),
            cmd: cmd.into(),
        }
    }

    pub(crate) fn time(&self) -> Time {
        self.key.0 .0
    }
}
