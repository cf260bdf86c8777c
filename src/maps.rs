//! Code to action tables with a fixed capacity
//!
//! Remotes have a few dozen buttons at most, so both tables are an ordered
//! sequence with a linear scan. Insertion order is the settings file order
//! and the first matching entry wins.

use log::warn;

pub struct CodeTable<T> {
    entries: Vec<(u32, T)>,
    capacity: usize,
}

impl<T: Copy> CodeTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        CodeTable {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry. Once the table is at capacity the entry is dropped
    /// and false is returned; the caller decides how loudly to complain.
    pub fn insert(&mut self, code: u32, action: T) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }

        self.entries.push((code, action));

        true
    }

    /// The action of the first entry matching code, if any.
    pub fn lookup(&self, code: u32) -> Option<T> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == code)
            .map(|(_, action)| *action)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u32, T)> {
        self.entries.iter()
    }
}

/// Build a table from configured entries, dropping anything beyond capacity
/// with a single boot-time warning.
pub fn build_table<T: Copy>(name: &str, entries: &[(u32, T)], capacity: usize) -> CodeTable<T> {
    let mut table = CodeTable::with_capacity(capacity);
    let mut dropped = 0;

    for (code, action) in entries {
        if !table.insert(*code, *action) {
            dropped += 1;
        }
    }

    if dropped > 0 {
        warn!("{name}: table holds {capacity} mappings, dropped the last {dropped}");
    }

    table
}

#[test]
fn capacity_truncates_in_order() {
    let entries: Vec<(u32, u8)> = (0..5).map(|n| (0x1000 + n, n as u8)).collect();

    let table = build_table("keyboard", &entries, 3);

    assert_eq!(table.len(), 3);
    assert_eq!(table.lookup(0x1000), Some(0));
    assert_eq!(table.lookup(0x1002), Some(2));
    assert_eq!(table.lookup(0x1003), None);
    assert_eq!(table.lookup(0x1004), None);

    let retained: Vec<u32> = table.iter().map(|(code, _)| *code).collect();
    assert_eq!(retained, vec![0x1000, 0x1001, 0x1002]);
}

#[test]
fn first_match_wins() {
    let mut table = CodeTable::with_capacity(4);

    assert!(table.insert(0xcafe, 1u8));
    assert!(table.insert(0xcafe, 2u8));

    assert_eq!(table.lookup(0xcafe), Some(1));
    assert_eq!(table.lookup(0xbeef), None);
}
