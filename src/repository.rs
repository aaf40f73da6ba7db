//! Request repository over a key-value store.
//!
//! Collections are read whole and written whole: `save` replaces the stored
//! array. Lookups are linear scans by id.
use crate::config::{MalformedPolicy, WorkflowConfig};
use crate::error::{Result, WorkflowError};
use crate::prefs::{Session, Theme};
use crate::request::Request;
use crate::store::KvStore;
use crate::types::{RequestKind, User};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use tracing::{debug, warn};

const USERS: &str = "users";
const THEME: &str = "theme";
const SESSION: &str = "session";

pub struct RequestRepository<S: KvStore> {
    store: S,
    key_prefix: String,
    on_malformed: MalformedPolicy,
}

/// Result of reading a collection: the valid records and, under the skip
/// policy, the raw text of the ones that failed validation keyed by their
/// stored position.
struct Loaded<T> {
    records: Vec<T>,
    quarantined: Vec<(usize, Box<RawValue>)>,
}

impl<S: KvStore> RequestRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, &WorkflowConfig::default())
    }

    pub fn with_config(store: S, config: &WorkflowConfig) -> Self {
        Self {
            store,
            key_prefix: config.storage.key_prefix.clone(),
            on_malformed: config.load.on_malformed,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }

    pub fn list(&self, kind: RequestKind) -> Result<Vec<Request>> {
        let pipeline = kind.pipeline();
        Ok(self
            .load(kind.collection(), |r: &Request| r.validate(pipeline))?
            .records)
    }

    /// Replaces the stored collection with `requests`.
    pub fn save(&self, kind: RequestKind, requests: &[Request]) -> Result<()> {
        let pipeline = kind.pipeline();
        self.write(kind.collection(), requests, |r: &Request| r.validate(pipeline))
    }

    pub fn find(&self, kind: RequestKind, id: &str) -> Result<Request> {
        self.list(kind)?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| WorkflowError::not_found("request", id))
    }

    pub fn users(&self) -> Result<Vec<User>> {
        Ok(self.load(USERS, |_: &User| Ok(()))?.records)
    }

    pub fn save_users(&self, users: &[User]) -> Result<()> {
        self.write(USERS, users, |_: &User| Ok(()))
    }

    pub fn find_user(&self, id: &str) -> Result<User> {
        self.users()?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| WorkflowError::not_found("user", id))
    }

    pub fn theme(&self) -> Result<Theme> {
        let Some(raw) = self.store.get(&self.key(THEME))? else {
            return Ok(Theme::default());
        };

        raw.parse().map_err(|reason| WorkflowError::MalformedRecord {
            collection: THEME.to_string(),
            index: 0,
            reason,
        })
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.store.set(&self.key(THEME), theme.as_str().to_string())
    }

    pub fn session(&self) -> Result<Option<Session>> {
        self.load_scalar(SESSION)
    }

    pub fn set_session(&self, session: &Session) -> Result<()> {
        self.write_scalar(SESSION, session)
    }

    pub fn clear_session(&self) -> Result<()> {
        self.store.remove(&self.key(SESSION))
    }

    fn load<T, F>(&self, collection: &str, validate: F) -> Result<Loaded<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> std::result::Result<(), String>,
    {
        let mut loaded = Loaded {
            records: vec![],
            quarantined: vec![],
        };
        let Some(raw) = self.store.get(&self.key(collection))? else {
            return Ok(loaded);
        };

        let items: Vec<Box<RawValue>> =
            serde_json::from_str(&raw).map_err(|e| WorkflowError::MalformedRecord {
                collection: collection.to_string(),
                index: 0,
                reason: format!("collection is not a JSON array: {e}"),
            })?;

        for (index, item) in items.into_iter().enumerate() {
            let parsed = serde_json::from_str::<T>(item.get())
                .map_err(|e| e.to_string())
                .and_then(|record| validate(&record).map(|()| record));

            match (parsed, self.on_malformed) {
                (Ok(record), _) => loaded.records.push(record),
                (Err(reason), MalformedPolicy::Reject) => {
                    return Err(WorkflowError::MalformedRecord {
                        collection: collection.to_string(),
                        index,
                        reason,
                    });
                }
                (Err(reason), MalformedPolicy::Skip) => {
                    warn!(collection, index, %reason, "quarantined malformed record");
                    loaded.quarantined.push((index, item));
                }
            }
        }

        Ok(loaded)
    }

    fn write<T, F>(&self, collection: &str, records: &[T], validate: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> std::result::Result<(), String>,
    {
        let encode = |e: serde_json::Error| WorkflowError::Storage(e.to_string());

        // quarantined records go back to the slots they were read from
        let quarantined = match self.on_malformed {
            MalformedPolicy::Skip => self.load(collection, &validate)?.quarantined,
            MalformedPolicy::Reject => vec![],
        };

        let raw = if quarantined.is_empty() {
            serde_json::to_string(records).map_err(encode)?
        } else {
            let mut items = records
                .iter()
                .map(serde_json::value::to_raw_value)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(encode)?;
            for (index, item) in quarantined {
                items.insert(index.min(items.len()), item);
            }
            serde_json::to_string(&items).map_err(encode)?
        };

        debug!(collection, records = records.len(), "writing collection");
        self.store.set(&self.key(collection), raw)
    }

    fn load_scalar<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.store
            .get(&self.key(name))?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| WorkflowError::MalformedRecord {
                    collection: name.to_string(),
                    index: 0,
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn write_scalar<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let raw =
            serde_json::to_string(value).map_err(|e| WorkflowError::Storage(e.to_string()))?;
        self.store.set(&self.key(name), raw)
    }
}
