//! Namespaced key-value persistence
//!
//! Mirrors the shape of the ESP32 NVS "Preferences" API: values live under a
//! namespace, are addressed by short keys and are either `u32` scalars or raw
//! byte blobs. The firmware backs this with NVS, the simulator with files and
//! the tests with [`MemoryStore`].

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Stored value needs {needed} bytes but the buffer holds {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("Storage I/O failed: {0}")]
    Io(heapless::String<64>),
    #[error("Storage backend unavailable")]
    Unavailable,
}

impl StorageError {
    /// Build an [`StorageError::Io`] from a message, truncated to fit.
    pub fn io(message: &str) -> Self {
        let mut text = heapless::String::new();
        for c in message.chars() {
            if text.push(c).is_err() {
                break;
            }
        }
        Self::Io(text)
    }
}

pub trait KeyValueStore {
    /// Read a `u32` scalar, `None` if the key does not exist.
    fn get_u32(&mut self, namespace: &str, key: &str) -> Result<Option<u32>, StorageError>;

    fn put_u32(&mut self, namespace: &str, key: &str, value: u32) -> Result<(), StorageError>;

    /// Copy a blob into `buf` and return its length, `None` if the key does not exist.
    fn get_bytes(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, StorageError>;

    fn put_bytes(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Erase every key in `namespace`. Erasing an empty namespace is not an error.
    fn clear_namespace(&mut self, namespace: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get_u32(&mut self, namespace: &str, key: &str) -> Result<Option<u32>, StorageError> {
        (**self).get_u32(namespace, key)
    }

    fn put_u32(&mut self, namespace: &str, key: &str, value: u32) -> Result<(), StorageError> {
        (**self).put_u32(namespace, key, value)
    }

    fn get_bytes(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, StorageError> {
        (**self).get_bytes(namespace, key, buf)
    }

    fn put_bytes(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).put_bytes(namespace, key, data)
    }

    fn clear_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        (**self).clear_namespace(namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    U32(u32),
    Bytes(Vec<u8>),
}

/// Heap-backed store for tests and host builds
///
/// Counts writes so callers can check how much flash wear a workload would cause.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<(String, String), StoredValue>,
    write_count: usize,
    bytes_written: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put_*` calls so far
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Total payload bytes written so far (scalars count as 4)
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn contains(&self, namespace: &str, key: &str) -> bool {
        self.values
            .contains_key(&(namespace.to_string(), key.to_string()))
    }

    fn get(&self, namespace: &str, key: &str) -> Option<&StoredValue> {
        self.values.get(&(namespace.to_string(), key.to_string()))
    }

    fn put(&mut self, namespace: &str, key: &str, value: StoredValue, len: usize) {
        self.write_count += 1;
        self.bytes_written += len;
        self.values
            .insert((namespace.to_string(), key.to_string()), value);
    }
}

impl KeyValueStore for MemoryStore {
    fn get_u32(&mut self, namespace: &str, key: &str) -> Result<Option<u32>, StorageError> {
        // A blob stored under the key reads as missing, like NVS type mismatches
        match self.get(namespace, key) {
            Some(StoredValue::U32(value)) => Ok(Some(*value)),
            _ => Ok(None),
        }
    }

    fn put_u32(&mut self, namespace: &str, key: &str, value: u32) -> Result<(), StorageError> {
        self.put(namespace, key, StoredValue::U32(value), 4);
        Ok(())
    }

    fn get_bytes(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, StorageError> {
        let Some(StoredValue::Bytes(data)) = self.get(namespace, key) else {
            return Ok(None);
        };
        if data.len() > buf.len() {
            return Err(StorageError::BufferTooSmall {
                needed: data.len(),
                available: buf.len(),
            });
        }

        buf[..data.len()].copy_from_slice(data);
        Ok(Some(data.len()))
    }

    fn put_bytes(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.put(namespace, key, StoredValue::Bytes(data.to_vec()), data.len());
        Ok(())
    }

    fn clear_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        self.values.retain(|(ns, _), _| ns != namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_and_blobs() {
        let mut store = MemoryStore::new();
        store.put_u32("ns", "count", 7).unwrap();
        store.put_bytes("ns", "data", &[1, 2, 3]).unwrap();

        assert_eq!(store.get_u32("ns", "count"), Ok(Some(7)));
        assert_eq!(store.get_u32("other", "count"), Ok(None));

        let mut buf = [0u8; 8];
        assert_eq!(store.get_bytes("ns", "data", &mut buf), Ok(Some(3)));
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.bytes_written(), 7);
    }

    #[test]
    fn test_type_mismatch_reads_as_missing() {
        let mut store = MemoryStore::new();
        store.put_bytes("ns", "key", &[9]).unwrap();
        assert_eq!(store.get_u32("ns", "key"), Ok(None));

        store.put_u32("ns", "key", 1).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(store.get_bytes("ns", "key", &mut buf), Ok(None));
    }

    #[test]
    fn test_blob_larger_than_buffer() {
        let mut store = MemoryStore::new();
        store.put_bytes("ns", "data", &[0; 10]).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(
            store.get_bytes("ns", "data", &mut buf),
            Err(StorageError::BufferTooSmall {
                needed: 10,
                available: 4
            })
        );
    }

    #[test]
    fn test_clear_namespace_only_touches_that_namespace() {
        let mut store = MemoryStore::new();
        store.put_u32("a", "x", 1).unwrap();
        store.put_u32("b", "x", 2).unwrap();

        store.clear_namespace("a").unwrap();
        store.clear_namespace("missing").unwrap();

        assert!(!store.contains("a", "x"));
        assert_eq!(store.get_u32("b", "x"), Ok(Some(2)));
    }

    #[test]
    fn test_io_message_is_truncated() {
        let long = "x".repeat(100);
        let StorageError::Io(text) = StorageError::io(&long) else {
            panic!("expected an I/O error");
        };
        assert_eq!(text.len(), 64);
    }
}
