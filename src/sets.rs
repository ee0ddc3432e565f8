//! Time-windowed id membership.
//!
//! [`ExpiringSet`] tracks string ids that fall out of membership once their
//! most recent insertion ages past a configured window. Eviction is lazy:
//! mutations purge an insertion-order queue from the front, and reads
//! evaluate liveness against the authoritative per-id insertion time without
//! restructuring anything, so queries borrow the set immutably.

use std::collections::VecDeque;
use std::rc::Rc;
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use crate::clock::Clock;
use crate::units::Minutes;

/// One insertion event, in arrival order.
#[derive(Debug, Clone)]
struct InsertionRecord {
    id: String,
    inserted_at: SystemTime,
}

/// A set of string ids whose members expire a fixed number of minutes after
/// their most recent insertion.
///
/// Re-inserting an id refreshes it. The purge that runs at the start of
/// every mutation pops expired records off the front of the insertion-order
/// queue, but a popped record only evicts its id when its timestamp still
/// equals the id's authoritative last-insertion time; a record made stale by
/// a later refresh is discarded without touching membership. Keying eviction
/// on insertion order alone would wrongly delete a just-refreshed id whose
/// original record is still near the front of the queue.
///
/// An insertion has expired once the whole-minute part of its age strictly
/// exceeds the window.
pub struct ExpiringSet {
    /// Authoritative membership: id → most recent insertion time.
    last_inserted: FxHashMap<String, SystemTime>,
    insertion_order: VecDeque<InsertionRecord>,
    expiration: Minutes,
    clock: Rc<dyn Clock>,
}

impl ExpiringSet {
    pub fn new(expiration: Minutes, clock: Rc<dyn Clock>) -> Self {
        ExpiringSet {
            last_inserted: FxHashMap::default(),
            insertion_order: VecDeque::new(),
            expiration,
            clock,
        }
    }

    pub fn expiration(&self) -> Minutes {
        self.expiration
    }

    fn has_expired(&self, inserted_at: SystemTime) -> bool {
        let age = self
            .clock
            .now()
            .duration_since(inserted_at)
            .unwrap_or_default();
        age.as_secs() / 60 > self.expiration.get()
    }

    /// Pop expired records off the queue front, evicting ids whose
    /// authoritative insertion time matches the popped record. Returns the
    /// evicted ids so owners can clean their side tables.
    fn purge(&mut self) -> Vec<String> {
        let mut evicted = Vec::new();

        while let Some(front) = self.insertion_order.front() {
            if !self.has_expired(front.inserted_at) {
                // The queue is time-ordered; nothing behind the front can
                // be expired either.
                break;
            }
            let record = match self.insertion_order.pop_front() {
                Some(record) => record,
                None => break,
            };
            // A record only evicts while it is still the authoritative
            // insertion; one made stale by a later refresh (or an outright
            // removal) is dropped without touching membership.
            if self.last_inserted.get(&record.id) == Some(&record.inserted_at) {
                self.last_inserted.remove(&record.id);
                evicted.push(record.id);
            }
        }

        evicted
    }

    /// Insert or refresh an id. Returns ids evicted by the purge.
    pub fn insert(&mut self, id: &str) -> Vec<String> {
        let evicted = self.purge();

        let now = self.clock.now();
        self.last_inserted.insert(id.to_string(), now);
        self.insertion_order.push_back(InsertionRecord {
            id: id.to_string(),
            inserted_at: now,
        });

        evicted
    }

    /// Remove an id outright. Returns ids evicted by the purge.
    ///
    /// Queue records left behind for the removed id become stale and are
    /// discarded when they reach the front.
    pub fn remove(&mut self, id: &str) -> Vec<String> {
        let evicted = self.purge();
        self.last_inserted.remove(id);
        evicted
    }

    pub fn contains(&self, id: &str) -> bool {
        match self.last_inserted.get(id) {
            Some(&inserted_at) => !self.has_expired(inserted_at),
            None => false,
        }
    }

    /// Live ids, in arbitrary order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.last_inserted
            .iter()
            .filter(|&(_, &inserted_at)| !self.has_expired(inserted_at))
            .map(|(id, _)| id.as_str())
    }

    /// Number of live ids.
    pub fn len(&self) -> usize {
        self.ids().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
