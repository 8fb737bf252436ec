//! Virtual clock for delayed continuations.
//!
//! Animation delays are not waited on. The board registers what must happen
//! once a delay has elapsed and the caller drives the clock forward, either
//! with real frame times or all at once.

use std::time::Duration;

#[derive(Clone, Debug)]
struct Pending<E> {
    due: Duration,
    seq: u64,
    event: E,
}

/// Events scheduled against a monotonic virtual time.
#[derive(Clone, Debug)]
pub struct Timeline<E> {
    now: Duration,
    next_seq: u64,
    pending: Vec<Pending<E>>,
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Timeline {
            now: Duration::ZERO,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<E> Timeline<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Registers `event` to fire `delay` after the current time.
    pub fn schedule(&mut self, delay: Duration, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending {
            due: self.now.saturating_add(delay),
            seq,
            event,
        });
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Moves the clock forward by `elapsed` and returns every event now due,
    /// earliest first. Events due at the same time come out in the order they
    /// were scheduled.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<E> {
        self.now = self.now.saturating_add(elapsed);
        let now = self.now;
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = rest;
        due.sort_by_key(|p| (p.due, p.seq));
        due.into_iter().map(|p| p.event).collect()
    }

    /// Jumps to the latest due time and returns everything that was pending.
    pub fn drain(&mut self) -> Vec<E> {
        let remaining = self
            .pending
            .iter()
            .map(|p| p.due.saturating_sub(self.now))
            .max()
            .unwrap_or(Duration::ZERO);
        self.advance(remaining)
    }

    /// Drops every pending event without firing it.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_advance_fires_only_due_events() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(100), "move");
        timeline.schedule(ms(90), "merge");

        assert!(timeline.advance(ms(50)).is_empty());
        assert_eq!(timeline.advance(ms(40)), vec!["merge"]);
        assert_eq!(timeline.pending_len(), 1);
        assert_eq!(timeline.advance(ms(10)), vec!["move"]);
        assert!(timeline.is_idle());
        assert_eq!(timeline.now(), ms(100));
    }

    #[test]
    fn test_events_ordered_by_due_then_insertion() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(10), 3);
        timeline.schedule(ms(5), 1);
        timeline.schedule(ms(5), 2);
        assert_eq!(timeline.advance(ms(10)), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_delay_fires_on_next_advance() {
        let mut timeline = Timeline::new();
        timeline.schedule(Duration::ZERO, 'a');
        assert_eq!(timeline.advance(Duration::ZERO), vec!['a']);
    }

    #[test]
    fn test_drain_and_clear() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(30), 'b');
        timeline.schedule(ms(20), 'a');
        assert_eq!(timeline.drain(), vec!['a', 'b']);
        assert_eq!(timeline.now(), ms(30));

        timeline.schedule(ms(5), 'c');
        timeline.clear();
        assert!(timeline.is_idle());
        assert!(timeline.drain().is_empty());
    }
}
