//! # Message Channel
//!
//! Per-superstep mailboxes keyed by destination vertex.
//!
//! During a superstep every messaging task appends into the same mailbox
//! concurrently. The mailbox is split into shards by destination hash, each
//! behind its own lock, so producers writing to different destinations rarely
//! contend. After the barrier the driver drains the mailbox once and the
//! result (`Inbox`) is read-only.
//!
//! ## Draining contract
//!
//! - `drain(k)` consumes mailbox `k`. Draining `k` again is `MailboxDrained`.
//! - Draining a superstep nobody published to yields an empty inbox.
//! - Publishing into an already drained superstep is `MailboxDrained`.

use std::hash::{BuildHasher, RandomState};

use hashbrown::{HashMap, HashSet};
use parking_lot::{Mutex, RwLock};

use crate::model::VertexKey;
use crate::{Error, Result};

/// Shard count used by `MessageChannel::new`.
pub const DEFAULT_SHARDS: usize = 32;

// ============================================================================
// MessageChannel
// ============================================================================

/// Concurrent per-superstep message transport.
pub struct MessageChannel<K, M> {
    state: RwLock<ChannelState<K, M>>,
    shard_count: usize,
    hasher: RandomState,
}

struct ChannelState<K, M> {
    open: HashMap<u64, Mailbox<K, M>>,
    drained: HashSet<u64>,
}

struct Mailbox<K, M> {
    shards: Box<[Mutex<HashMap<K, Vec<M>>>]>,
}

impl<K, M> Mailbox<K, M> {
    fn new(shard_count: usize) -> Self {
        Self {
            shards: (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }
}

impl<K: VertexKey, M> MessageChannel<K, M> {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Channel with `shards` lock shards per mailbox (at least one).
    pub fn with_shards(shards: usize) -> Self {
        Self {
            state: RwLock::new(ChannelState {
                open: HashMap::new(),
                drained: HashSet::new(),
            }),
            shard_count: shards.max(1),
            hasher: RandomState::new(),
        }
    }

    fn shard_of(&self, destination: &K) -> usize {
        (self.hasher.hash_one(destination) % self.shard_count as u64) as usize
    }

    /// Append `message` to the mailbox of `destination` for `superstep`.
    pub fn publish(&self, superstep: u64, destination: K, message: M) -> Result<()> {
        let shard = self.shard_of(&destination);

        {
            let state = self.state.read();
            if state.drained.contains(&superstep) {
                return Err(Error::MailboxDrained(superstep));
            }
            if let Some(mailbox) = state.open.get(&superstep) {
                mailbox.shards[shard].lock().entry(destination).or_default().push(message);
                return Ok(());
            }
        }

        // First message of this superstep: open the mailbox.
        let mut state = self.state.write();
        if state.drained.contains(&superstep) {
            return Err(Error::MailboxDrained(superstep));
        }
        let shard_count = self.shard_count;
        state
            .open
            .entry(superstep)
            .or_insert_with(|| Mailbox::new(shard_count))
            .shards[shard]
            .get_mut()
            .entry(destination)
            .or_default()
            .push(message);
        Ok(())
    }

    /// Consume the mailbox of `superstep`.
    pub fn drain(&self, superstep: u64) -> Result<Inbox<K, M>> {
        let mut state = self.state.write();
        if !state.drained.insert(superstep) {
            return Err(Error::MailboxDrained(superstep));
        }

        let mut messages = HashMap::new();
        if let Some(mailbox) = state.open.remove(&superstep) {
            for shard in mailbox.shards.into_vec() {
                messages.extend(shard.into_inner());
            }
        }

        Ok(Inbox { superstep, messages })
    }

    /// Number of messages waiting in the (undrained) mailbox of `superstep`.
    pub fn pending(&self, superstep: u64) -> usize {
        let state = self.state.read();
        state.open.get(&superstep).map_or(0, |mailbox| {
            mailbox
                .shards
                .iter()
                .map(|shard| shard.lock().values().map(Vec::len).sum::<usize>())
                .sum()
        })
    }

    pub fn is_drained(&self, superstep: u64) -> bool {
        self.state.read().drained.contains(&superstep)
    }
}

impl<K: VertexKey, M> Default for MessageChannel<K, M> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Inbox
// ============================================================================

/// The drained, read-only mailbox of one superstep.
#[derive(Debug)]
pub struct Inbox<K, M> {
    superstep: u64,
    messages: HashMap<K, Vec<M>>,
}

impl<K: VertexKey, M> Inbox<K, M> {
    /// The superstep these messages were sent in.
    pub fn superstep(&self) -> u64 {
        self.superstep
    }

    /// Number of distinct destinations with at least one message.
    pub fn destinations(&self) -> usize {
        self.messages.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages for `id`, removed from the inbox. Empty if none were sent.
    pub fn take(&mut self, id: &K) -> MessageIterator<M> {
        self.messages
            .remove(id)
            .map(MessageIterator::new)
            .unwrap_or_else(MessageIterator::empty)
    }
}

impl<K, M> IntoIterator for Inbox<K, M> {
    type Item = (K, Vec<M>);
    type IntoIter = hashbrown::hash_map::IntoIter<K, Vec<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

// ============================================================================
// MessageIterator
// ============================================================================

/// Finite, single-pass sequence of messages delivered to one vertex.
///
/// Handed to the update function by value: once consumed it is gone, and it
/// cannot be cloned to iterate twice.
#[derive(Debug)]
pub struct MessageIterator<M> {
    inner: std::vec::IntoIter<M>,
}

impl<M> MessageIterator<M> {
    pub fn new(messages: Vec<M>) -> Self {
        Self { inner: messages.into_iter() }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl<M> Iterator for MessageIterator<M> {
    type Item = M;

    fn next(&mut self) -> Option<M> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<M> ExactSizeIterator for MessageIterator<M> {}

// ============================================================================
// Tests
// ============================================================================
