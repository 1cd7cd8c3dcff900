use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::record::{Fingerprint, NewRecord, ProcessingState, Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted(RecordId),
    /// The policy link set was already seen, nothing was stored.
    Duplicate,
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub records: usize,
    pub queued: usize,
    pub processed: usize,
    pub fingerprints: usize,
}

/// Admitted records, their dedup index and the queue of records awaiting a scrape.
///
/// Every operation is a single critical section, so two admissions of the same link
/// set can't both succeed and two drains can't claim the same record.
#[derive(Debug, Default)]
pub struct RecordStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    seen: HashSet<Fingerprint>,
    log: Vec<Record>,
    pending: VecDeque<RecordId>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn admit(&self, new: NewRecord) -> Admission {
        let fingerprint = new.fingerprint();
        let mut inner = self.lock();

        if !inner.seen.insert(fingerprint) {
            return Admission::Duplicate;
        }

        let id = RecordId(inner.log.len());
        let record = Record::admit(id, new);
        if record.state() == ProcessingState::Queued {
            inner.pending.push_back(id);
        }
        inner.log.push(record);

        Admission::Accepted(id)
    }

    /// Claims every queued record, leaving the queue empty.
    pub fn drain_unprocessed(&self) -> Vec<Record> {
        let mut inner = self.lock();
        let claimed = inner.pending.drain(..).collect::<Vec<_>>();
        claimed
            .into_iter()
            .filter_map(|id| inner.log.get(id.0))
            .filter(|record| record.state() == ProcessingState::Queued)
            .cloned()
            .collect()
    }

    /// Writes a scraped record back into the log.
    ///
    /// Only the state and text are taken from `record`, returns false when it doesn't
    /// belong to this store.
    pub fn requeue(&self, record: Record) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.log.get_mut(record.id().0) {
            Some(slot) if slot.policy_links() == record.policy_links() => {
                let state = record.state();
                let text = record.extracted_text().to_string();
                match state {
                    ProcessingState::Processed => slot.complete(text),
                    // An unprocessed record goes back in line
                    _ => inner.pending.push_back(record.id()),
                }
                true
            }
            _ => {
                log::warn!("Ignoring unknown record {}", record.id());
                false
            }
        }
    }

    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.lock().log.get(id.0).cloned()
    }

    /// Snapshot of every admitted record, in admission order.
    pub fn records(&self) -> Vec<Record> {
        self.lock().log.clone()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.lock();
        StoreStats {
            records: inner.log.len(),
            queued: inner.pending.len(),
            processed: inner.log.iter().filter(|r| r.is_processed()).count(),
            fingerprints: inner.seen.len(),
        }
    }
}
