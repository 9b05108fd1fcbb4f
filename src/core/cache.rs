use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::facts::FileFacts;

/// Source of file facts for paths that fell out of the in-memory cache.
pub trait FileLoader: Send + Sync {
    /// `Ok(None)` means the store has never seen `path`.
    fn load(&self, path: &str) -> Result<Option<FileFacts>>;
}

const NIL: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Intrusive doubly linked list over a slab, plus a key index.
/// `head` is the most recently fetched entry, `tail` the eviction victim.
struct LruState<K, V> {
    capacity: usize,
    index: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl<K, V> LruState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            index: HashMap::with_capacity(capacity.min(1024)),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    fn slot(&self, idx: usize) -> &Slot<K, V> {
        match &self.slots[idx] {
            Some(slot) => slot,
            None => unreachable!("linked slot {idx} is vacant"),
        }
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot<K, V> {
        match &mut self.slots[idx] {
            Some(slot) => slot,
            None => unreachable!("linked slot {idx} is vacant"),
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slot(idx);
            (slot.prev, slot.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.slot_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slot_mut(next).prev = prev;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slot_mut(idx);
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head != NIL {
            self.slot_mut(old_head).prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn promote(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn remove_slot(&mut self, idx: usize) -> Option<(K, V)> {
        self.unlink(idx);
        let slot = self.slots[idx].take()?;
        self.free.push(idx);
        self.index.remove(&slot.key);
        Some((slot.key, slot.value))
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }
        self.remove_slot(self.tail)
    }

    fn insert(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            self.slot_mut(idx).value = value;
            self.promote(idx);
            return;
        }
        if self.capacity == 0 {
            return;
        }
        while self.index.len() >= self.capacity {
            if self.evict_lru().is_none() {
                break;
            }
        }

        let slot = Slot {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_front(idx);
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }
}

/// Capacity-bounded, thread-safe least-recently-used cache.
///
/// `get` counts as a use and promotes the entry; `peek` does not. All
/// operations are O(1).
pub struct FileCache<K, V> {
    state: Mutex<LruState<K, V>>,
}

impl<K, V> FileCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState::new(capacity)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        let idx = *state.index.get(key)?;
        state.promote(idx);
        Some(state.slot(idx).value.clone())
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        let state = self.state.lock();
        let idx = *state.index.get(key)?;
        Some(state.slot(idx).value.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().index.contains_key(key)
    }

    /// Insert or replace `key`, evicting the least recently used entry first
    /// when the cache is full.
    pub fn put(&self, key: K, value: V) {
        self.state.lock().insert(key, value);
    }

    pub fn evict(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        let idx = *state.index.get(key)?;
        state.remove_slot(idx).map(|(_, value)| value)
    }

    pub fn clear(&self) {
        self.state.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Shrinking below the current occupancy evicts from the cold end.
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.state.lock();
        state.capacity = capacity;
        while state.index.len() > capacity {
            if state.evict_lru().is_none() {
                break;
            }
        }
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let state = self.state.lock();
        let mut keys = Vec::with_capacity(state.index.len());
        let mut cursor = state.head;
        while cursor != NIL {
            let slot = state.slot(cursor);
            keys.push(slot.key.clone());
            cursor = slot.next;
        }
        keys
    }
}

/// Directory of bincode-encoded [`FileFacts`], one blob per source path.
pub struct FactStore {
    dir: PathBuf,
}

impl FactStore {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create fact store at {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn store(&self, facts: &FileFacts) -> Result<()> {
        let data = bincode::serialize(facts)?;
        let blob = self.blob_path(&facts.path);
        fs::write(&blob, data).with_context(|| format!("Failed to write {}", blob.display()))?;
        Ok(())
    }

    pub fn remove(&self, path: &str) -> Result<bool> {
        let blob = self.blob_path(path);
        if !blob.exists() {
            return Ok(false);
        }
        fs::remove_file(&blob).with_context(|| format!("Failed to remove {}", blob.display()))?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| entries.filter_map(|e| e.ok()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn blob_path(&self, path: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        self.dir.join(format!("facts_{:x}.bincode", hasher.finish()))
    }
}

impl FileLoader for FactStore {
    fn load(&self, path: &str) -> Result<Option<FileFacts>> {
        let blob = self.blob_path(path);
        if !blob.exists() {
            return Ok(None);
        }
        let data = fs::read(&blob).with_context(|| format!("Failed to read {}", blob.display()))?;
        let facts: FileFacts = bincode::deserialize(&data)?;
        // Guard against hash collisions between distinct paths.
        if facts.path != path {
            return Ok(None);
        }
        Ok(Some(facts))
    }
}
