//! In-memory keyspace: strings with optional expiration and append-only
//! streams, kept in two separate maps the way the storage layer of a Redis
//! server distinguishes value types.

use std::collections::HashMap;
use std::fmt;

use jiff::Timestamp;

/// A string value together with its optional absolute expiration.
#[derive(Debug, PartialEq, Clone)]
pub struct StringEntry {
    pub value: String,
    pub expiration: Option<Timestamp>,
}

impl StringEntry {
    pub fn new(value: String, expiration: Option<Timestamp>) -> Self {
        StringEntry { value, expiration }
    }

    pub fn is_expired(&self) -> bool {
        match self.expiration {
            Some(expiration) => Timestamp::now() > expiration,
            None => false,
        }
    }
}

/// A stream entry ID, ordered lexicographically as a `(ms, seq)` pair.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub fn new(ms: u64, seq: u64) -> Self {
        StreamId { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// One immutable stream entry: an ID plus field/value pairs in arrival order.
#[derive(Debug, PartialEq, Clone)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(String, String)>,
}

/// An append-only sequence of entries with strictly increasing IDs.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Stream {
    pub entries: Vec<StreamEntry>,
}

impl Stream {
    pub fn last_id(&self) -> Option<StreamId> {
        self.entries.last().map(|entry| entry.id)
    }

    pub fn append(&mut self, entry: StreamEntry) {
        self.entries.push(entry);
    }
}

/// The shared keyspace. Callers guard it with a `tokio::sync::Mutex`; every
/// handler holds the lock for the duration of its command.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    strings: HashMap<String, StringEntry>,
    streams: HashMap<String, Stream>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        KeyValueStore {
            strings: HashMap::new(),
            streams: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: String, entry: StringEntry) {
        self.strings.insert(key, entry);
    }

    /// Looks up a string entry, lazily removing it when its expiration has
    /// elapsed so that the key also disappears from `KEYS` output.
    pub fn get(&mut self, key: &str) -> Option<&StringEntry> {
        if let Some(entry) = self.strings.get(key) {
            if entry.is_expired() {
                self.strings.remove(key);
                return None;
            }
        }

        self.strings.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StringEntry> {
        if let Some(entry) = self.strings.get(key) {
            if entry.is_expired() {
                self.strings.remove(key);
                return None;
            }
        }

        self.strings.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) {
        self.strings.remove(key);
    }

    /// All live string keys, in unspecified order. Stream keys are not
    /// enumerated.
    pub fn string_keys(&self) -> Vec<String> {
        self.strings
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Bulk-inserts string entries, used when warming up from an RDB file.
    pub fn extend_strings(&mut self, entries: HashMap<String, StringEntry>) {
        self.strings.extend(entries);
    }

    pub fn stream(&self, key: &str) -> Option<&Stream> {
        self.streams.get(key)
    }

    pub fn stream_entry_or_default(&mut self, key: &str) -> &mut Stream {
        self.streams.entry(key.to_string()).or_default()
    }

    pub fn contains_stream(&self, key: &str) -> bool {
        self.streams.contains_key(key)
    }
}
