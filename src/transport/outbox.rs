//! Outbound line queue and echo suppression.
//!
//! The chat channel may not be ready when the protocol first speaks. Lines
//! that hit [`TransportError::Unavailable`] are held here and resent on a
//! fixed backoff until the retry budget runs out.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::core::{ChatTransport, ECHO_WINDOW, SEND_MAX_RETRIES, TransportError};

/// Result of handing a line to the [`Outbox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the channel.
    Sent,
    /// Held for a later retry.
    Queued,
    /// Refused by the channel and discarded.
    Dropped,
}

/// Result of one retry round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Nothing was pending.
    Idle,
    /// Every pending line went out.
    Flushed,
    /// Channel still unavailable, lines remain queued.
    Pending,
    /// Retry budget exhausted, pending lines discarded.
    GaveUp {
        /// Number of lines discarded.
        dropped: usize,
        /// Whether this is the first give-up since the last reset.
        first: bool,
    },
}

/// FIFO of lines waiting for the channel.
#[derive(Debug, Clone)]
pub struct Outbox {
    pending: VecDeque<String>,
    attempts: u32,
    max_retries: u32,
    gave_up: bool,
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new(SEND_MAX_RETRIES)
    }
}

impl Outbox {
    /// Create an outbox that retries up to `max_retries` times.
    pub fn new(max_retries: u32) -> Self {
        Self {
            pending: VecDeque::new(),
            attempts: 0,
            max_retries,
            gave_up: false,
        }
    }

    /// Send `line`, or queue it if the channel is unavailable.
    ///
    /// Lines queue behind earlier pending lines to keep per-sender order.
    pub fn send<T: ChatTransport + ?Sized>(&mut self, transport: &mut T, line: String) -> Delivery {
        if !self.pending.is_empty() {
            self.pending.push_back(line);
            return Delivery::Queued;
        }

        match transport.send(&line) {
            Ok(()) => Delivery::Sent,
            Err(TransportError::Unavailable) => {
                debug!("chat channel unavailable, queueing line");
                self.attempts = 0;
                self.pending.push_back(line);
                Delivery::Queued
            }
            Err(err) => {
                warn!("dropping line: {err}");
                Delivery::Dropped
            }
        }
    }

    /// Resend pending lines in order.
    pub fn retry<T: ChatTransport + ?Sized>(&mut self, transport: &mut T) -> RetryOutcome {
        if self.pending.is_empty() {
            return RetryOutcome::Idle;
        }

        while let Some(line) = self.pending.front() {
            match transport.send(line) {
                Ok(()) => {
                    self.pending.pop_front();
                }
                Err(TransportError::Unavailable) => {
                    self.attempts += 1;
                    if self.attempts < self.max_retries {
                        debug!(
                            "chat channel still unavailable (attempt {}/{})",
                            self.attempts, self.max_retries
                        );
                        return RetryOutcome::Pending;
                    }
                    let dropped = self.pending.len();
                    warn!("chat channel unavailable after {} retries, dropping {dropped} line(s)", self.attempts);
                    self.pending.clear();
                    self.attempts = 0;
                    let first = !self.gave_up;
                    self.gave_up = true;
                    return RetryOutcome::GaveUp { dropped, first };
                }
                Err(err) => {
                    warn!("dropping line: {err}");
                    self.pending.pop_front();
                }
            }
        }

        self.attempts = 0;
        RetryOutcome::Flushed
    }

    /// Whether lines are waiting for a retry.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of waiting lines.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Discard pending lines and forget the give-up warning.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.attempts = 0;
        self.gave_up = false;
    }
}

/// Recognizes inbound copies of lines we sent ourselves.
///
/// Some channels loop a sender's own lines back to it. A copy seen within
/// the window is consumed once.
#[derive(Debug, Clone)]
pub struct EchoGuard {
    window: Duration,
    recent: VecDeque<(Instant, String)>,
}

impl Default for EchoGuard {
    fn default() -> Self {
        Self::new(ECHO_WINDOW)
    }
}

impl EchoGuard {
    /// Create a guard with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            recent: VecDeque::new(),
        }
    }

    /// Remember a line we just sent.
    pub fn record(&mut self, line: &str, now: Instant) {
        self.prune(now);
        self.recent.push_back((now, line.to_string()));
    }

    /// Whether `line` is a copy of one of our recent lines. Consumes the match.
    pub fn is_echo(&mut self, line: &str, now: Instant) -> bool {
        self.prune(now);
        match self.recent.iter().position(|(_, sent)| sent == line) {
            Some(index) => {
                self.recent.remove(index);
                true
            }
            None => false,
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.recent.clear();
    }

    fn prune(&mut self, now: Instant) {
        while let Some((sent_at, _)) = self.recent.front() {
            if now.saturating_duration_since(*sent_at) <= self.window {
                break;
            }
            self.recent.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Channel that is unavailable for the first `down` calls.
    struct FlakyChannel {
        down: usize,
        calls: usize,
        sent: Vec<String>,
    }

    impl FlakyChannel {
        fn new(down: usize) -> Self {
            Self {
                down,
                calls: 0,
                sent: Vec::new(),
            }
        }
    }

    impl ChatTransport for FlakyChannel {
        fn send(&mut self, line: &str) -> Result<(), TransportError> {
            self.calls += 1;
            if self.calls <= self.down {
                return Err(TransportError::Unavailable);
            }
            self.sent.push(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_send_direct() {
        let mut channel = FlakyChannel::new(0);
        let mut outbox = Outbox::default();
        assert_eq!(outbox.send(&mut channel, "a".into()), Delivery::Sent);
        assert_eq!(channel.sent, vec!["a"]);
        assert_eq!(outbox.retry(&mut channel), RetryOutcome::Idle);
    }

    #[test]
    fn test_queue_until_available_preserves_order() {
        let mut channel = FlakyChannel::new(2);
        let mut outbox = Outbox::default();

        assert_eq!(outbox.send(&mut channel, "a".into()), Delivery::Queued);
        assert_eq!(outbox.send(&mut channel, "b".into()), Delivery::Queued);
        assert_eq!(outbox.pending_len(), 2);

        assert_eq!(outbox.retry(&mut channel), RetryOutcome::Pending);
        assert_eq!(outbox.retry(&mut channel), RetryOutcome::Flushed);
        assert_eq!(channel.sent, vec!["a", "b"]);
        assert!(!outbox.has_pending());
    }

    #[test]
    fn test_give_up_after_budget() {
        let mut channel = FlakyChannel::new(usize::MAX);
        let mut outbox = Outbox::new(5);

        assert_eq!(outbox.send(&mut channel, "a".into()), Delivery::Queued);
        for _ in 0..4 {
            assert_eq!(outbox.retry(&mut channel), RetryOutcome::Pending);
        }
        assert_eq!(
            outbox.retry(&mut channel),
            RetryOutcome::GaveUp { dropped: 1, first: true }
        );
        assert!(!outbox.has_pending());

        outbox.send(&mut channel, "b".into());
        for _ in 0..4 {
            outbox.retry(&mut channel);
        }
        assert_eq!(
            outbox.retry(&mut channel),
            RetryOutcome::GaveUp { dropped: 1, first: false }
        );
    }

    #[test]
    fn test_rejected_line_is_dropped() {
        struct Refusing;
        impl ChatTransport for Refusing {
            fn send(&mut self, _line: &str) -> Result<(), TransportError> {
                Err(TransportError::Rejected("too long".into()))
            }
        }

        let mut outbox = Outbox::default();
        assert_eq!(outbox.send(&mut Refusing, "a".into()), Delivery::Dropped);
        assert!(!outbox.has_pending());
    }

    #[test]
    fn test_echo_guard() {
        let start = Instant::now();
        let mut guard = EchoGuard::new(Duration::from_secs(2));
        guard.record("[MODSYNC]TEST:Me:hi", start);

        assert!(!guard.is_echo("[MODSYNC]TEST:Other:hi", start));
        assert!(guard.is_echo("[MODSYNC]TEST:Me:hi", start + Duration::from_secs(1)));
        // consumed
        assert!(!guard.is_echo("[MODSYNC]TEST:Me:hi", start + Duration::from_secs(1)));

        guard.record("[MODSYNC]TEST:Me:late", start);
        assert!(!guard.is_echo("[MODSYNC]TEST:Me:late", start + Duration::from_secs(3)));
    }
}
