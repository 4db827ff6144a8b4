//! Pixel budget accounting and the least-recently-used eviction sweep.
//!
//! Every decoded entry is charged its pixel area against a single ledger.
//! Decoded entries are also tracked by their last-used stamp so the sweep
//! can pick the globally oldest one without walking the whole index.

use std::collections::BTreeMap;

use crate::entry::EntryId;

/// Running total of decoded pixel area against a configurable limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MemoryLedger {
    used: usize,
    limit: usize,
}

impl MemoryLedger {
    pub(crate) fn new(limit: usize) -> Self {
        Self { used: 0, limit }
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    pub(crate) fn charge(&mut self, area: usize) {
        self.used += area;
    }

    pub(crate) fn release(&mut self, area: usize) {
        debug_assert!(area <= self.used, "released {} with only {} charged", area, self.used);
        self.used = self.used.saturating_sub(area);
    }

    /// True while the budget is exceeded. A zero limit is never exceeded.
    pub(crate) fn over_budget(&self) -> bool {
        self.limit != 0 && self.used >= self.limit
    }
}

/// Decoded entries ordered by last-used stamp (oldest first).
///
/// Stamps come from a strictly increasing counter, so each key is unique.
#[derive(Debug, Default)]
pub(crate) struct LruIndex {
    by_stamp: BTreeMap<u64, EntryId>,
}

impl LruIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, stamp: u64, id: EntryId) {
        let previous = self.by_stamp.insert(stamp, id);
        debug_assert!(previous.is_none(), "stamp {} reused", stamp);
    }

    pub(crate) fn remove(&mut self, stamp: u64) -> Option<EntryId> {
        self.by_stamp.remove(&stamp)
    }

    /// Moves an entry from `old` to `new`.
    pub(crate) fn touch(&mut self, old: u64, new: u64) {
        if let Some(id) = self.by_stamp.remove(&old) {
            self.by_stamp.insert(new, id);
        }
    }

    pub(crate) fn oldest(&self) -> Option<(u64, EntryId)> {
        self.by_stamp.iter().next().map(|(stamp, id)| (*stamp, *id))
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, stamp: u64) -> bool {
        self.by_stamp.contains_key(&stamp)
    }

    pub(crate) fn len(&self) -> usize {
        self.by_stamp.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_stamp.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.by_stamp.clear();
    }
}

/// Evicts least-recently-used entries until the ledger is under its limit
/// or nothing decoded is left.
///
/// `evict` drops the pixels of the given entry and returns the area it
/// freed. Returns the number of entries evicted.
pub(crate) fn sweep<F>(ledger: &mut MemoryLedger, lru: &mut LruIndex, mut evict: F) -> usize
where
    F: FnMut(EntryId) -> usize,
{
    if !ledger.over_budget() || lru.is_empty() {
        return 0;
    }

    let mut evicted = 0;
    while ledger.over_budget() {
        let Some((stamp, id)) = lru.oldest() else {
            // Nothing left to evict; the budget stays exceeded.
            break;
        };
        lru.remove(stamp);
        let freed = evict(id);
        ledger.release(freed);
        evicted += 1;
        log::debug!(
            "eviction: freed {} pixels from entry {:?}, {} of {} used",
            freed,
            id,
            ledger.used(),
            ledger.limit()
        );
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_zero_limit_is_never_over_budget() {
        let mut ledger = MemoryLedger::new(0);
        ledger.charge(usize::MAX / 2);
        assert!(!ledger.over_budget());
    }

    #[test]
    fn test_limit_is_inclusive() {
        let mut ledger = MemoryLedger::new(100);
        ledger.charge(99);
        assert!(!ledger.over_budget());
        ledger.charge(1);
        assert!(ledger.over_budget());
    }

    #[test]
    fn test_oldest_and_touch() {
        let mut lru = LruIndex::new();
        lru.insert(5, EntryId(1));
        lru.insert(3, EntryId(2));
        lru.insert(8, EntryId(3));

        assert_eq!(lru.oldest(), Some((3, EntryId(2))));
        lru.touch(3, 9);
        assert_eq!(lru.oldest(), Some((5, EntryId(1))));
        assert!(lru.contains(9));
        assert!(!lru.contains(3));
        assert_eq!(lru.len(), 3);
    }

    #[test]
    fn test_sweep_evicts_oldest_first() {
        let mut ledger = MemoryLedger::new(100);
        let mut lru = LruIndex::new();
        let areas: HashMap<EntryId, usize> =
            [(EntryId(1), 40), (EntryId(2), 40), (EntryId(3), 40)].into_iter().collect();
        lru.insert(1, EntryId(1));
        lru.insert(2, EntryId(2));
        lru.insert(3, EntryId(3));
        ledger.charge(120);

        let mut order = Vec::new();
        let evicted = sweep(&mut ledger, &mut lru, |id| {
            order.push(id);
            areas[&id]
        });

        assert_eq!(evicted, 1);
        assert_eq!(order, vec![EntryId(1)]);
        assert_eq!(ledger.used(), 80);
        assert_eq!(lru.oldest(), Some((2, EntryId(2))));
    }

    #[test]
    fn test_sweep_stops_when_nothing_decoded() {
        let mut ledger = MemoryLedger::new(10);
        let mut lru = LruIndex::new();
        lru.insert(1, EntryId(1));
        ledger.charge(50);

        // Projected charge for an entry that is not yet decoded
        ledger.charge(30);
        let evicted = sweep(&mut ledger, &mut lru, |_| 50);

        assert_eq!(evicted, 1);
        assert!(lru.is_empty());
        assert_eq!(ledger.used(), 30);
        assert!(ledger.over_budget());
    }

    #[test]
    fn test_sweep_is_noop_under_budget() {
        let mut ledger = MemoryLedger::new(100);
        let mut lru = LruIndex::new();
        lru.insert(1, EntryId(1));
        ledger.charge(60);

        let evicted = sweep(&mut ledger, &mut lru, |_| panic!("nothing should be evicted"));
        assert_eq!(evicted, 0);
        assert_eq!(lru.len(), 1);
    }
}
