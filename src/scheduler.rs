//! Delayed actions on the simulation clock: schedule, cancel, drain what is due.

use std::fmt::Debug;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Pending<K> {
    key: K,
    fire_at: Duration,
    seq: u64,
}

/// Pending-action list processed once per tick.
///
/// The key doubles as the logical name: scheduling a key that is already
/// pending replaces the old entry. Due entries are handed out one at a time by
/// [`Scheduler::pop_due`], so whatever the caller cancels while handling one
/// entry can no longer come out of the same drain.
#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    pending: Vec<Pending<K>>,
    next_seq: u64,
}

impl<K: Copy + Eq + Debug> Scheduler<K> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    /// Run `key` once `delay` has elapsed after `now`, replacing any pending `key`.
    pub fn schedule(&mut self, key: K, now: Duration, delay: Duration) {
        self.cancel(key);
        self.pending.push(Pending {
            key,
            fire_at: now + delay,
            seq: self.next_seq,
        });
        self.next_seq = self.next_seq.wrapping_add(1);
    }

    /// Drop the pending `key`. Returns whether anything was pending.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.key != key);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn deadline(&self, key: K) -> Option<Duration> {
        self.pending.iter().find(|p| p.key == key).map(|p| p.fire_at)
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.pending.iter().any(|p| p.key == key)
    }

    /// Remove and return the earliest entry whose fire time is `<= now`.
    /// Ties go to whichever was scheduled first.
    pub fn pop_due(&mut self, now: Duration) -> Option<K> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.fire_at <= now)
            .min_by_key(|(_, p)| (p.fire_at, p.seq))
            .map(|(i, _)| i)?;
        Some(self.pending.swap_remove(idx).key)
    }
}

impl<K: Copy + Eq + Debug> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Job {
        Spawn,
        Move,
        EndCombo,
    }

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn test_nothing_fires_early() {
        let mut s = Scheduler::new();
        s.schedule(Job::Spawn, Duration::ZERO, secs(1.0));
        assert_eq!(s.pop_due(secs(0.99)), None);
        assert_eq!(s.pop_due(secs(1.0)), Some(Job::Spawn));
        assert_eq!(s.deadline(Job::Spawn), None);
    }

    #[test]
    fn test_same_key_replaces_instead_of_stacking() {
        let mut s = Scheduler::new();
        s.schedule(Job::EndCombo, Duration::ZERO, secs(3.0));
        s.schedule(Job::EndCombo, secs(2.0), secs(3.0));
        assert_eq!(s.deadline(Job::EndCombo), Some(secs(5.0)));
        assert_eq!(s.pop_due(secs(3.5)), None);
        assert_eq!(s.pop_due(secs(5.0)), Some(Job::EndCombo));
        assert_eq!(s.pop_due(secs(9.0)), None);
    }

    #[test]
    fn test_due_entries_come_out_in_fire_order() {
        let mut s = Scheduler::new();
        s.schedule(Job::Move, Duration::ZERO, secs(1.5));
        s.schedule(Job::Spawn, Duration::ZERO, secs(0.5));
        s.schedule(Job::EndCombo, Duration::ZERO, secs(0.5));
        let now = secs(2.0);
        assert_eq!(s.pop_due(now), Some(Job::Spawn));
        assert_eq!(s.pop_due(now), Some(Job::EndCombo));
        assert_eq!(s.pop_due(now), Some(Job::Move));
        assert_eq!(s.pop_due(now), None);
    }

    #[test]
    fn test_cancel_during_drain_wins_even_when_already_due() {
        let mut s = Scheduler::new();
        s.schedule(Job::Spawn, Duration::ZERO, secs(0.5));
        s.schedule(Job::Move, Duration::ZERO, secs(1.0));
        let now = secs(2.0);
        let first = s.pop_due(now);
        assert_eq!(first, Some(Job::Spawn));
        // Handler for the first entry cancels everything.
        s.cancel_all();
        assert_eq!(s.pop_due(now), None);
    }

    #[test]
    fn test_cancel_reports_whether_pending() {
        let mut s = Scheduler::new();
        assert!(!s.cancel(Job::Spawn));
        s.schedule(Job::Spawn, Duration::ZERO, secs(1.0));
        assert!(s.is_pending(Job::Spawn));
        assert!(s.cancel(Job::Spawn));
        assert!(!s.is_pending(Job::Spawn));
        assert_eq!(s.deadline(Job::Spawn), None);
    }
}
