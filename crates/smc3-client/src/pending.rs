use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use smc3_frame::Packet;
use tokio::sync::oneshot;
use tracing::warn;

/// One outstanding read, keyed by its wait tag.
#[derive(Debug)]
struct PendingEntry {
    id: u64,
    tx: oneshot::Sender<Packet>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<u8, PendingEntry>,
    next_id: u64,
    closed: bool,
}

/// A waiter's half of a registration.
#[derive(Debug)]
pub(crate) struct Registration {
    pub tag: u8,
    pub id: u64,
    pub rx: oneshot::Receiver<Packet>,
}

/// Pending-request table: at most one waiter per tag.
///
/// Resolution is first-writer-wins. Whichever of "matching frame" and
/// "deadline" removes the entry first decides the outcome; the other side
/// finds nothing to do.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    inner: Mutex<Inner>,
}

impl PendingTable {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter for `tag`, superseding any existing one.
    ///
    /// Returns `None` once the table has been closed by a disconnect.
    pub fn register(&self, tag: u8) -> Option<Registration> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let (tx, rx) = oneshot::channel();

        if let Some(previous) = inner.entries.insert(tag, PendingEntry { id, tx }) {
            warn!(
                tag = %std::ascii::escape_default(tag),
                superseded = previous.id,
                "pending read superseded, previous waiter will time out"
            );
        }

        Some(Registration { tag, id, rx })
    }

    /// Hand `packet` to the waiter on its tag.
    ///
    /// Gives the packet back when nobody is waiting for it, including a
    /// waiter that already gave up.
    pub fn resolve(&self, packet: Packet) -> Option<Packet> {
        let Some(entry) = self.lock().entries.remove(&packet.tag) else {
            return Some(packet);
        };
        entry.tx.send(packet).err()
    }

    /// Remove the entry for `tag` only if it still belongs to registration `id`.
    pub fn remove(&self, tag: u8, id: u64) -> bool {
        let mut inner = self.lock();
        match inner.entries.get(&tag) {
            Some(entry) if entry.id == id => {
                inner.entries.remove(&tag);
                true
            }
            _ => false,
        }
    }

    /// Drop every waiter and refuse new registrations.
    pub fn close(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;
        let dropped = inner.entries.len();
        inner.entries.clear();
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Tags with an outstanding waiter, sorted.
    pub fn tags(&self) -> Vec<u8> {
        let mut tags: Vec<u8> = self.lock().entries.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}
