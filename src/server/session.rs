//! Per-participant bookkeeping on the owner side.
//!
//! Handles:
//! - The cached add-on list of each participant
//! - Response deadlines and the midpoint resend
//! - Duplicate suppression (`processed`) and the eviction latch
//! - Roster join/leave detection, and expiry of reports from names the
//!   roster never showed

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::core::{AddOnDescriptor, PEER_RESPONSE_TIMEOUT};

/// What the owner knows about one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    /// Display name.
    pub name: String,

    /// Last list reported by the participant. Replaced wholesale.
    pub received_list: Option<Vec<AddOnDescriptor>>,

    /// Deadline of an outstanding `REQUEST_MODS`.
    pub response_deadline: Option<Instant>,

    /// Whether the current list has been judged and answered.
    pub processed: bool,

    /// Whether the midpoint resend has gone out.
    pub retry_sent: bool,

    /// Whether an eviction has been issued and not yet confirmed.
    pub evicted: bool,

    /// Whether the participant has appeared in the roster.
    pub in_roster: bool,

    /// When the record was created.
    pub first_seen: Instant,
}

impl PeerRecord {
    /// Create an empty record.
    pub fn new(name: impl Into<String>, now: Instant) -> Self {
        Self {
            name: name.into(),
            received_list: None,
            response_deadline: None,
            processed: false,
            retry_sent: false,
            evicted: false,
            in_roster: false,
            first_seen: now,
        }
    }

    /// Whether a `REQUEST_MODS` is outstanding.
    pub fn is_awaiting(&self) -> bool {
        self.response_deadline.is_some()
    }

    /// Mark a request as sent.
    pub fn begin_request(&mut self, now: Instant, timeout: Duration) {
        self.response_deadline = Some(now + timeout);
        self.retry_sent = false;
    }

    /// Forget an outstanding request. Returns whether one was outstanding.
    pub fn clear_request(&mut self) -> bool {
        self.retry_sent = false;
        self.response_deadline.take().is_some()
    }
}

/// Result of comparing a roster snapshot against the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    /// Names seen in the roster for the first time.
    pub joined: Vec<String>,
    /// Names whose record was dropped: they left the roster, or reported
    /// but never showed up in it within the grace period.
    pub left: Vec<String>,
}

impl RosterDiff {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// A participant whose eviction was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Departure {
    at: Instant,
    left_roster: bool,
}

/// Records keyed by display name.
#[derive(Debug, Clone)]
pub struct PeerTable {
    peers: BTreeMap<String, PeerRecord>,
    departed: BTreeMap<String, Departure>,
    early_grace: Duration,
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new(PEER_RESPONSE_TIMEOUT)
    }
}

impl PeerTable {
    /// Create an empty table. Records of names that report before the roster
    /// shows them are kept for `early_grace`.
    pub fn new(early_grace: Duration) -> Self {
        Self {
            peers: BTreeMap::new(),
            departed: BTreeMap::new(),
            early_grace,
        }
    }

    /// Reconcile with a roster snapshot, ignoring `own_name`.
    ///
    /// Joined names get a fresh record unless one already exists (a list can
    /// arrive before the roster shows its sender). An early record carrying
    /// an unconfirmed eviction belongs to an earlier stay and is reset.
    /// Left names lose their record, as do early records the roster has not
    /// caught up with after the grace period.
    ///
    /// An evicted name still listed is not a join; once it has dropped out of
    /// the roster, its next appearance is.
    pub fn observe(&mut self, roster: &[String], own_name: &str, now: Instant) -> RosterDiff {
        let mut diff = RosterDiff::default();

        let grace = self.early_grace;
        self.departed.retain(|name, departure| {
            let listed = roster.contains(name);
            if !listed {
                departure.left_roster = true;
            }
            !(listed && departure.left_roster) && now < departure.at + grace
        });

        for name in roster.iter().filter(|n| n.as_str() != own_name) {
            if self.departed.contains_key(name) {
                continue;
            }
            let record = self
                .peers
                .entry(name.clone())
                .or_insert_with(|| PeerRecord::new(name.clone(), now));
            if !record.in_roster {
                if record.evicted {
                    *record = PeerRecord::new(name.clone(), now);
                }
                record.in_roster = true;
                diff.joined.push(name.clone());
            }
        }

        let gone: Vec<String> = self
            .peers
            .values()
            .filter(|r| !roster.contains(&r.name))
            .filter(|r| r.in_roster || now >= r.first_seen + grace)
            .map(|r| r.name.clone())
            .collect();
        for name in gone {
            self.peers.remove(&name);
            diff.left.push(name);
        }

        diff
    }

    /// Record for `name`, created if absent.
    pub fn ensure(&mut self, name: &str, now: Instant) -> &mut PeerRecord {
        self.peers
            .entry(name.to_string())
            .or_insert_with(|| PeerRecord::new(name, now))
    }

    /// Record for `name`.
    pub fn get(&self, name: &str) -> Option<&PeerRecord> {
        self.peers.get(name)
    }

    /// Mutable record for `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PeerRecord> {
        self.peers.get_mut(name)
    }

    /// Drop the record of an evicted participant. Lists still in flight from
    /// them are ignored until they rejoin or the grace period ends.
    pub fn forget_evicted(&mut self, name: &str, now: Instant) -> Option<PeerRecord> {
        self.departed.insert(
            name.to_string(),
            Departure {
                at: now,
                left_roster: false,
            },
        );
        self.peers.remove(name)
    }

    /// Whether `name` was evicted and has not rejoined.
    pub fn is_departed(&self, name: &str) -> bool {
        self.departed.contains_key(name)
    }

    /// Names in order.
    pub fn names(&self) -> Vec<String> {
        self.peers.keys().cloned().collect()
    }

    /// Records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.values()
    }

    /// Mutable records in name order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PeerRecord> {
        self.peers.values_mut()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_observe_join_and_leave() {
        let now = Instant::now();
        let mut table = PeerTable::default();

        let diff = table.observe(&names(&["Host", "Alice", "Bob"]), "Host", now);
        assert_eq!(diff.joined, names(&["Alice", "Bob"]));
        assert!(diff.left.is_empty());
        assert_eq!(table.len(), 2);

        let diff = table.observe(&names(&["Host", "Alice", "Bob"]), "Host", now);
        assert!(diff.is_empty());

        let diff = table.observe(&names(&["Host", "Bob"]), "Host", now);
        assert_eq!(diff.left, names(&["Alice"]));
        assert!(table.get("Alice").is_none());
    }

    #[test]
    fn test_record_created_before_roster_is_kept() {
        let now = Instant::now();
        let mut table = PeerTable::default();
        table.ensure("Carol", now).processed = true;

        let diff = table.observe(&names(&["Host"]), "Host", now);
        assert!(diff.is_empty());
        assert!(table.get("Carol").is_some());

        let diff = table.observe(&names(&["Host", "Carol"]), "Host", now);
        assert_eq!(diff.joined, names(&["Carol"]));
        assert!(table.get("Carol").is_some_and(|r| r.processed));
    }

    #[test]
    fn test_early_record_expires_when_roster_never_shows_it() {
        let now = Instant::now();
        let mut table = PeerTable::new(Duration::from_secs(8));
        table.ensure("Ghost", now).processed = true;

        assert!(table.observe(&names(&["Host"]), "Host", now + Duration::from_secs(7)).is_empty());
        assert_eq!(table.len(), 1);

        let diff = table.observe(&names(&["Host"]), "Host", now + Duration::from_secs(8));
        assert_eq!(diff.left, names(&["Ghost"]));
        assert!(table.is_empty());
    }

    #[test]
    fn test_unconfirmed_eviction_is_reset_on_join() {
        let now = Instant::now();
        let mut table = PeerTable::default();
        let record = table.ensure("Alice", now);
        record.received_list = Some(Vec::new());
        record.processed = true;
        record.evicted = true;

        let later = now + Duration::from_secs(1);
        let diff = table.observe(&names(&["Host", "Alice"]), "Host", later);
        assert_eq!(diff.joined, names(&["Alice"]));

        let record = table.get("Alice").unwrap();
        assert!(record.in_roster);
        assert!(!record.processed && !record.evicted);
        assert!(record.received_list.is_none());
        assert_eq!(record.first_seen, later);
    }

    #[test]
    fn test_evicted_name_rejoins_after_leaving_roster() {
        let now = Instant::now();
        let mut table = PeerTable::default();
        table.observe(&names(&["Host", "Alice"]), "Host", now);

        assert!(table.forget_evicted("Alice", now).is_some());
        assert!(table.is_departed("Alice"));

        // kick not yet reflected in the roster
        let diff = table.observe(&names(&["Host", "Alice"]), "Host", now + Duration::from_secs(1));
        assert!(diff.is_empty());
        assert!(table.get("Alice").is_none());

        table.observe(&names(&["Host"]), "Host", now + Duration::from_secs(2));
        assert!(table.is_departed("Alice"));

        let diff = table.observe(&names(&["Host", "Alice"]), "Host", now + Duration::from_secs(3));
        assert_eq!(diff.joined, names(&["Alice"]));
        assert!(!table.is_departed("Alice"));
    }

    #[test]
    fn test_departure_expires() {
        let now = Instant::now();
        let mut table = PeerTable::new(Duration::from_secs(8));
        table.forget_evicted("Alice", now);

        table.observe(&names(&["Host"]), "Host", now + Duration::from_secs(7));
        assert!(table.is_departed("Alice"));
        table.observe(&names(&["Host"]), "Host", now + Duration::from_secs(8));
        assert!(!table.is_departed("Alice"));
    }

    #[test]
    fn test_request_bookkeeping() {
        let now = Instant::now();
        let mut record = PeerRecord::new("Alice", now);
        assert!(!record.is_awaiting());

        record.begin_request(now, Duration::from_secs(8));
        assert_eq!(record.response_deadline, Some(now + Duration::from_secs(8)));
        record.retry_sent = true;

        assert!(record.clear_request());
        assert!(!record.is_awaiting());
        assert!(!record.retry_sent);
        assert!(!record.clear_request());
    }
}
