use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{Id, IdError};

/// A stored value together with the ring identifier of its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Id,
    pub value: Value,
}

impl Entry {
    pub fn new(id: Id, value: Value) -> Self {
        Entry { id, value }
    }

    /// Builds an entry whose id is the hash of `key` truncated to `id_size` bytes.
    pub fn from_key(key: &str, value: Value, id_size: usize) -> Result<Self, IdError> {
        Ok(Entry {
            id: Id::create_with_size(key, id_size)?,
            value,
        })
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.value)
    }
}

/// Entries held by one node, bucketed by id.
///
/// A bucket never holds the same value twice and empty buckets are dropped, so
/// `has` is true exactly when at least one value is stored under the id.
#[derive(Debug, Clone, Default)]
pub struct EntryList {
    buckets: BTreeMap<Id, Vec<Value>>,
}

impl EntryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: Entry) {
        let bucket = self.buckets.entry(entry.id).or_default();
        if !bucket.contains(&entry.value) {
            bucket.push(entry.value);
        }
    }

    pub fn add_all(&mut self, entries: impl IntoIterator<Item = Entry>) {
        for entry in entries {
            self.add(entry);
        }
    }

    pub fn remove(&mut self, entry: &Entry) {
        let Some(bucket) = self.buckets.get_mut(&entry.id) else {
            return;
        };
        bucket.retain(|value| value != &entry.value);
        if bucket.is_empty() {
            self.buckets.remove(&entry.id);
        }
    }

    pub fn remove_all<'a>(&mut self, entries: impl IntoIterator<Item = &'a Entry>) {
        for entry in entries {
            self.remove(entry);
        }
    }

    pub fn has(&self, id: &Id) -> bool {
        self.buckets.contains_key(id)
    }

    pub fn get_entries(&self, id: &Id) -> Vec<Entry> {
        self.buckets
            .get(id)
            .map(|values| {
                values
                    .iter()
                    .map(|value| Entry::new(id.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entries whose id lies in the open ring interval `(from, to)`.
    pub fn get_entries_in_interval(&self, from: &Id, to: &Id) -> Vec<Entry> {
        self.buckets
            .iter()
            .filter(|(id, _)| id.is_in_interval(from, to))
            .flat_map(|(id, values)| {
                values
                    .iter()
                    .map(move |value| Entry::new(id.clone(), value.clone()))
            })
            .collect()
    }

    pub fn dump(&self) -> Vec<Entry> {
        self.buckets
            .iter()
            .flat_map(|(id, values)| {
                values
                    .iter()
                    .map(move |value| Entry::new(id.clone(), value.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl fmt::Display for EntryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Entries]")?;
        for entry in self.dump() {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}
