use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{Result, StoreError};

/// One stored value. Keys and payloads are arbitrary bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Str(Vec<u8>),
    List(VecDeque<Vec<u8>>),
}

/// Thread-safe in-memory keyspace.
///
/// One Mutex around the whole map: simple, and plenty for a store whose
/// writers are a scheduler loop and a handful of test threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<HashMap<Vec<u8>, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a string value, overwriting whatever was there.
    pub fn set(&self, key: &[u8], value: &[u8]) {
        let mut keys = self.keys.lock().unwrap();
        keys.insert(key.to_vec(), Value::Str(value.to_vec()));
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let keys = self.keys.lock().unwrap();
        match keys.get(key) {
            None => Ok(None),
            Some(Value::Str(v)) => Ok(Some(v.clone())),
            Some(Value::List(_)) => Err(wrong_type(key)),
        }
    }

    /// Delete the given keys; returns how many existed.
    pub fn del(&self, del_keys: &[&[u8]]) -> usize {
        let mut keys = self.keys.lock().unwrap();
        del_keys
            .iter()
            .filter(|key| keys.remove(**key).is_some())
            .count()
    }

    /// Prepend values to a list (each new value lands at the head, so the
    /// last pushed value ends up first). Creates the list if absent. Returns
    /// the new length.
    pub fn lpush(&self, key: &[u8], values: &[&[u8]]) -> Result<usize> {
        self.push(key, values, true)
    }

    /// Append values to a list tail. Creates the list if absent. Returns the
    /// new length.
    pub fn rpush(&self, key: &[u8], values: &[&[u8]]) -> Result<usize> {
        self.push(key, values, false)
    }

    fn push(&self, key: &[u8], values: &[&[u8]], front: bool) -> Result<usize> {
        let mut keys = self.keys.lock().unwrap();
        let value = keys
            .entry(key.to_vec())
            .or_insert_with(|| Value::List(VecDeque::new()));
        match value {
            Value::List(list) => {
                for v in values {
                    if front {
                        list.push_front(v.to_vec());
                    } else {
                        list.push_back(v.to_vec());
                    }
                }
                Ok(list.len())
            }
            Value::Str(_) => Err(wrong_type(key)),
        }
    }

    /// Pop the head of a list. An emptied list is removed from the keyspace.
    pub fn lpop(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut keys = self.keys.lock().unwrap();
        let popped = match keys.get_mut(key) {
            None => return Ok(None),
            Some(Value::List(list)) => list.pop_front(),
            Some(Value::Str(_)) => return Err(wrong_type(key)),
        };
        if matches!(keys.get(key), Some(Value::List(list)) if list.is_empty()) {
            keys.remove(key);
        }
        Ok(popped)
    }

    pub fn llen(&self, key: &[u8]) -> Result<usize> {
        let keys = self.keys.lock().unwrap();
        match keys.get(key) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(Value::Str(_)) => Err(wrong_type(key)),
        }
    }

    /// List slice with inclusive bounds; negative indices count from the
    /// tail, -1 being the last element.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let keys = self.keys.lock().unwrap();
        let list = match keys.get(key) {
            None => return Ok(Vec::new()),
            Some(Value::List(list)) => list,
            Some(Value::Str(_)) => return Err(wrong_type(key)),
        };

        let len = list.len() as i64;
        let start = clamp_index(start, len);
        let stop = clamp_index(stop, len);
        if start > stop || start >= len {
            return Ok(Vec::new());
        }
        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn clamp_index(i: i64, len: i64) -> i64 {
    let i = if i < 0 { len + i } else { i };
    i.clamp(0, len.max(0))
}

fn wrong_type(key: &[u8]) -> StoreError {
    StoreError::WrongType {
        key: String::from_utf8_lossy(key).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_del() {
        let store = MemoryStore::new();
        assert_eq!(store.get(b"k").unwrap(), None);

        store.set(b"k", b"v1");
        store.set(b"k", b"v2");
        assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()));

        assert_eq!(store.del(&[b"k", b"missing"]), 1);
        assert_eq!(store.get(b"k").unwrap(), None);
    }

    #[test]
    fn lpush_orders_newest_first() {
        let store = MemoryStore::new();
        store.lpush(b"l", &[b"a"]).unwrap();
        store.lpush(b"l", &[b"b"]).unwrap();
        store.lpush(b"l", &[b"c"]).unwrap();

        assert_eq!(
            store.lrange(b"l", 0, -1).unwrap(),
            vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]
        );
    }

    #[test]
    fn rpush_then_lpop_is_fifo() {
        let store = MemoryStore::new();
        store.rpush(b"q", &[b"one", b"two"]).unwrap();
        assert_eq!(store.llen(b"q").unwrap(), 2);

        assert_eq!(store.lpop(b"q").unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.lpop(b"q").unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.lpop(b"q").unwrap(), None);
        // Emptied list disappears from the keyspace.
        assert!(store.is_empty());
    }

    #[test]
    fn lrange_negative_indices() {
        let store = MemoryStore::new();
        store.rpush(b"l", &[b"a", b"b", b"c", b"d"]).unwrap();

        assert_eq!(
            store.lrange(b"l", -2, -1).unwrap(),
            vec![b"c".to_vec(), b"d".to_vec()]
        );
        assert_eq!(store.lrange(b"l", 2, 1).unwrap(), Vec::<Vec<u8>>::new());
        assert_eq!(store.lrange(b"l", 0, 100).unwrap().len(), 4);
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let store = MemoryStore::new();
        store.set(b"s", b"v");
        assert!(matches!(
            store.lpush(b"s", &[b"x"]),
            Err(StoreError::WrongType { .. })
        ));

        store.rpush(b"l", &[b"x"]).unwrap();
        assert!(matches!(store.get(b"l"), Err(StoreError::WrongType { .. })));
    }

    #[test]
    fn binary_keys_and_values() {
        let store = MemoryStore::new();
        store.set(b"\x00\xff", b"\x01\x02\x00");
        assert_eq!(store.get(b"\x00\xff").unwrap(), Some(b"\x01\x02\x00".to_vec()));
    }
}
