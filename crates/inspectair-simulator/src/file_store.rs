//! File-backed [`KeyValueStore`] standing in for NVS on the desktop.
//!
//! Layout: `<root>/<namespace>/<key>`. Scalars are 4 little-endian bytes,
//! blobs are stored verbatim.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use inspectair_core::storage::{KeyValueStore, StorageError};

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_error)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(key)
    }

    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path(namespace, key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(self.root.join(namespace)).map_err(io_error)?;
        fs::write(self.path(namespace, key), data).map_err(io_error)
    }
}

impl KeyValueStore for FileStore {
    fn get_u32(&mut self, namespace: &str, key: &str) -> Result<Option<u32>, StorageError> {
        let Some(data) = self.read(namespace, key)? else {
            return Ok(None);
        };
        // Anything that is not exactly a scalar reads as missing, like NVS type mismatches
        Ok(<[u8; 4]>::try_from(data.as_slice())
            .ok()
            .map(u32::from_le_bytes))
    }

    fn put_u32(&mut self, namespace: &str, key: &str, value: u32) -> Result<(), StorageError> {
        self.write(namespace, key, &value.to_le_bytes())
    }

    fn get_bytes(
        &mut self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, StorageError> {
        let Some(data) = self.read(namespace, key)? else {
            return Ok(None);
        };
        if data.len() > buf.len() {
            return Err(StorageError::BufferTooSmall {
                needed: data.len(),
                available: buf.len(),
            });
        }

        buf[..data.len()].copy_from_slice(&data);
        Ok(Some(data.len()))
    }

    fn put_bytes(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.write(namespace, key, data)
    }

    fn clear_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        match fs::remove_dir_all(self.root.join(namespace)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }
}

fn io_error(e: std::io::Error) -> StorageError {
    StorageError::io(&e.to_string())
}
