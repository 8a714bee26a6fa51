use std::collections::BTreeMap;

use crate::time::Time;

/// A buffer of entries ordered by due time.
///
/// Entries with equal due times keep their insertion order. The front entry is only released at
/// the exact instant it is due.
#[derive(Debug, Clone, derivative::Derivative)]
#[derivative(Default(bound = ""))]
pub(crate) struct TimedQueue<T> {
    inner: BTreeMap<(Time, u64), T>,
    seq: u64,
}

impl<T> TimedQueue<T> {
    pub(crate) fn push(&mut self, due: Time, item: T) {
        self.inner.insert((due, self.seq), item);
        self.seq += 1;
    }

    /// Removes and returns the front entry iff it is due at exactly `now`.
    pub(crate) fn pop_due(&mut self, now: Time) -> Option<T> {
        if self.earliest()? != now {
            return None;
        }
        self.inner.pop_first().map(|(_, item)| item)
    }

    /// The front entry, if it is due at exactly `now`.
    pub(crate) fn peek_due(&self, now: Time) -> Option<&T> {
        match self.inner.first_key_value() {
            Some((&(due, _), item)) if due == now => Some(item),
            _ => None,
        }
    }

    /// Removes the front entry regardless of its due time.
    pub(crate) fn pop_front(&mut self) -> Option<(Time, T)> {
        self.inner.pop_first().map(|((due, _), item)| (due, item))
    }

    /// The earliest due time in the queue, if any.
    pub(crate) fn earliest(&self) -> Option<Time> {
        self.inner.first_key_value().map(|(&(due, _), _)| due)
    }

    /// The entry that sorts last, with its due time.
    pub(crate) fn last(&self) -> Option<(Time, &T)> {
        self.inner.last_key_value().map(|(&(due, _), item)| (due, item))
    }

    /// The time from which a newly queued entry starts its own delay: the later of `now` and the
    /// due time of the current tail.
    pub(crate) fn tail_or(&self, now: Time) -> Time {
        self.last().map_or(now, |(due, _)| due.max(now))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Time, &T)> {
        self.inner.iter().map(|(&(due, _), item)| (due, item))
    }

    delegate::delegate! {
        to self.inner {
            pub(crate) fn len(&self) -> usize;
            pub(crate) fn is_empty(&self) -> bool;
            pub(crate) fn clear(&mut self);
        }
    }
}

/// Computes the single next instant an element must be reactivated at: the earliest due time
/// across all of its queues, or `None` when every queue is empty.
pub(crate) fn next_wakeup<'a, T: 'a>(
    queues: impl IntoIterator<Item = &'a TimedQueue<T>>,
) -> Option<Time> {
    queues.into_iter().filter_map(TimedQueue::earliest).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_due_time() {
        let mut q = TimedQueue::default();
        q.push(Time::new(30), 'c');
        q.push(Time::new(10), 'a');
        q.push(Time::new(20), 'b');
        assert_eq!(q.earliest(), Some(Time::new(10)));
        assert_eq!(q.last(), Some((Time::new(30), &'c')));
        let order: Vec<_> = q.iter().map(|(_, c)| *c).collect();
        assert_eq!(order, vec!['a', 'b', 'c']);
    }

    #[test]
    fn equal_due_times_are_fifo() {
        let mut q = TimedQueue::default();
        let t = Time::new(7);
        for i in 0..5 {
            q.push(t, i);
        }
        let mut out = Vec::new();
        while let Some(i) = q.pop_due(t) {
            out.push(i);
        }
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
        assert!(q.is_empty());
    }

    #[test]
    fn releases_only_at_exact_due_time() {
        let mut q = TimedQueue::default();
        q.push(Time::new(10), ());
        assert_eq!(q.pop_due(Time::new(9)), None);
        // Late processing does not catch up
        assert_eq!(q.pop_due(Time::new(11)), None);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(Time::new(10)), Some(()));
    }

    #[test]
    fn peek_due_does_not_remove() {
        let mut q = TimedQueue::default();
        q.push(Time::new(3), "x");
        assert_eq!(q.peek_due(Time::new(2)), None);
        assert_eq!(q.peek_due(Time::new(3)), Some(&"x"));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_front(), Some((Time::new(3), "x")));
        assert!(q.is_empty());
    }

    #[test]
    fn tail_or_takes_the_later_time() {
        let mut q = TimedQueue::default();
        assert_eq!(q.tail_or(Time::new(5)), Time::new(5));
        q.push(Time::new(8), ());
        assert_eq!(q.tail_or(Time::new(5)), Time::new(8));
        assert_eq!(q.tail_or(Time::new(9)), Time::new(9));
    }

    #[test]
    fn wakeup_is_min_over_queues() {
        let mut a = TimedQueue::default();
        let mut b = TimedQueue::default();
        let empty = TimedQueue::<u8>::default();
        assert_eq!(next_wakeup([&a, &b, &empty]), None);
        a.push(Time::new(40), 1);
        b.push(Time::new(15), 2);
        b.push(Time::new(50), 3);
        assert_eq!(next_wakeup([&a, &b, &empty]), Some(Time::new(15)));
    }
}
