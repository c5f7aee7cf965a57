//! Deadline bookkeeping.
//!
//! Every wait in the protocol is a `(TimerKey, Instant)` pair. Nothing sleeps:
//! the session polls the queue on each tick and dispatches what has expired.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Identifies one pending deadline.
///
/// Arming a key that is already armed replaces its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Participant midpoint resend of `CLIENT_MODS`.
    ExchangeRetry,
    /// Participant wait for the owner's verdict.
    ExchangeTimeout,
    /// Delayed self-removal after a fatal outcome.
    SelfRemoval,
    /// Owner midpoint resend of `REQUEST_MODS` to one participant.
    PeerRetry(String),
    /// Owner response deadline for one participant.
    PeerDeadline(String),
    /// Owner's single eviction retry.
    EvictRetry(String),
    /// Outbox resend while the channel is unavailable.
    SendRetry,
}

impl TimerKey {
    /// Whether this timer keeps running while gameplay is active.
    ///
    /// Only the participant's terminal timers do; every other protocol wait
    /// is frozen until gameplay ends.
    pub fn fires_during_gameplay(&self) -> bool {
        matches!(self, TimerKey::ExchangeTimeout | TimerKey::SelfRemoval)
    }

    /// Participant name for per-peer timers.
    pub fn peer(&self) -> Option<&str> {
        match self {
            TimerKey::PeerRetry(name) | TimerKey::PeerDeadline(name) | TimerKey::EvictRetry(name) => {
                Some(name)
            }
            _ => None,
        }
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKey::ExchangeRetry => f.write_str("exchange-retry"),
            TimerKey::ExchangeTimeout => f.write_str("exchange-timeout"),
            TimerKey::SelfRemoval => f.write_str("self-removal"),
            TimerKey::PeerRetry(name) => write!(f, "peer-retry({name})"),
            TimerKey::PeerDeadline(name) => write!(f, "peer-deadline({name})"),
            TimerKey::EvictRetry(name) => write!(f, "evict-retry({name})"),
            TimerKey::SendRetry => f.write_str("send-retry"),
        }
    }
}

/// Set of armed deadlines.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    deadlines: HashMap<TimerKey, Instant>,
}

impl TimerQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key` to expire at `now + after`.
    pub fn schedule(&mut self, key: TimerKey, now: Instant, after: Duration) {
        self.deadlines.insert(key, now + after);
    }

    /// Disarm `key`. Returns whether it was armed.
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        self.deadlines.remove(key).is_some()
    }

    /// Disarm every timer concerning `peer`.
    pub fn cancel_peer(&mut self, peer: &str) {
        self.deadlines.retain(|key, _| key.peer() != Some(peer));
    }

    /// Disarm everything.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    /// Whether `key` is armed.
    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Remove and return every timer due at `now` that `eligible` accepts,
    /// earliest first. Ineligible timers stay armed and fire later.
    pub fn poll_expired(
        &mut self,
        now: Instant,
        eligible: impl Fn(&TimerKey) -> bool,
    ) -> Vec<TimerKey> {
        let mut due: Vec<(Instant, TimerKey)> = self
            .deadlines
            .iter()
            .filter(|(key, deadline)| **deadline <= now && eligible(*key))
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.to_string().cmp(&b.1.to_string())));

        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_expired_in_deadline_order() {
        let start = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKey::ExchangeTimeout, start, Duration::from_secs(10));
        queue.schedule(TimerKey::ExchangeRetry, start, Duration::from_secs(5));

        assert!(queue.poll_expired(start + Duration::from_secs(4), |_| true).is_empty());

        let fired = queue.poll_expired(start + Duration::from_secs(10), |_| true);
        assert_eq!(fired, vec![TimerKey::ExchangeRetry, TimerKey::ExchangeTimeout]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let start = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKey::SendRetry, start, Duration::from_secs(1));
        queue.schedule(TimerKey::SendRetry, start, Duration::from_secs(3));

        assert_eq!(queue.len(), 1);
        assert!(queue.poll_expired(start + Duration::from_secs(2), |_| true).is_empty());
        assert_eq!(
            queue.poll_expired(start + Duration::from_secs(3), |_| true),
            vec![TimerKey::SendRetry]
        );
    }

    #[test]
    fn test_ineligible_timers_stay_armed() {
        let start = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKey::PeerDeadline("Bob".into()), start, Duration::from_secs(8));
        queue.schedule(TimerKey::SelfRemoval, start, Duration::from_secs(3));

        let later = start + Duration::from_secs(9);
        let fired = queue.poll_expired(later, TimerKey::fires_during_gameplay);
        assert_eq!(fired, vec![TimerKey::SelfRemoval]);
        assert!(queue.is_armed(&TimerKey::PeerDeadline("Bob".into())));

        let fired = queue.poll_expired(later, |_| true);
        assert_eq!(fired, vec![TimerKey::PeerDeadline("Bob".into())]);
    }

    #[test]
    fn test_cancel_peer() {
        let start = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKey::PeerRetry("Bob".into()), start, Duration::from_secs(4));
        queue.schedule(TimerKey::PeerDeadline("Bob".into()), start, Duration::from_secs(8));
        queue.schedule(TimerKey::PeerDeadline("Eve".into()), start, Duration::from_secs(8));

        queue.cancel_peer("Bob");
        assert_eq!(queue.len(), 1);
        assert!(queue.is_armed(&TimerKey::PeerDeadline("Eve".into())));
    }
}
