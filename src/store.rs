//! Key-value persistence of serialised JSON documents
use crate::error::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Minimal document store: whole values in, whole values out.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store for a single session.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

/// Persistent store backed by sled. Every write is flushed before returning.
#[derive(Clone)]
pub struct SledStore {
    instance: Arc<sled::Db>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Arc::new(sled::open(path)?)))
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.instance.get(key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| crate::WorkflowError::Storage(format!("{key} is not utf-8: {e}"))),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.instance.insert(key.as_bytes(), value.into_bytes())?;
        self.instance.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.instance.remove(key.as_bytes())?;
        self.instance.flush()?;
        Ok(())
    }
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl KvStore for Box<dyn KvStore> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
