//! Durable storage for chat sessions.
//!
//! Sessions are kept in memory as an ordered collection (newest created
//! first) and written through to a [`KeyValueStore`] as a single JSON blob
//! after every change.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::observability::{SESSIONS_LOADED, SESSIONS_PERSISTED, STORE_ERRORS};
use crate::types::{ChatSession, Message, SessionId, derive_title};
use crate::utils::time::now_millis;
use crate::{Error, Result};

/// Key under which the session collection is stored.
pub const SESSIONS_KEY: &str = "g9_sessions";

/// Environment variable naming the data directory.
pub const DATA_DIR_VAR: &str = "G9_DATA_DIR";

/// Directory name under `$HOME` used when [`DATA_DIR_VAR`] is unset.
pub const DEFAULT_DATA_DIR: &str = ".g9chat";

/// Resolve the data directory from the environment.
pub fn default_data_dir() -> Option<PathBuf> {
    match std::env::var(DATA_DIR_VAR) {
        Ok(dir) if !dir.trim().is_empty() => Some(PathBuf::from(dir)),
        _ => std::env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_DATA_DIR)),
    }
}

///////////////////////////////////////////// KeyValueStore ////////////////////////////////////////////

/// A string-keyed blob store.  Last writer wins.
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::validation(
            format!("invalid storage key {key:?}"),
            Some("key".to_string()),
        ));
    }
    Ok(())
}

/// A [`KeyValueStore`] keeping one `<key>.json` file per key in a directory.
///
/// Writes go to a temporary file that is synced and then renamed over the
/// destination, so a crash never leaves a half-written blob behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            Error::io(format!("could not create {}", dir.display()), err)
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(format!("could not read {key}"), err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        {
            let mut file = fs::File::create(&tmp)
                .map_err(|err| Error::io(format!("could not create {}", tmp.display()), err))?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)
            .map_err(|err| Error::io(format!("could not replace {}", path.display()), err))?;
        Ok(())
    }
}

/// An in-process [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::storage("memory store poisoned", key))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::storage("memory store poisoned", key))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

///////////////////////////////////////////// SessionStore /////////////////////////////////////////////

/// The ordered session collection and its backing store.
#[derive(Debug)]
pub struct SessionStore<S> {
    backend: S,
    sessions: Vec<ChatSession>,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Create an empty collection over `backend`.  Call [`SessionStore::load`]
    /// to rehydrate it.
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            sessions: Vec::new(),
        }
    }

    /// Create a collection and rehydrate it from `backend`.
    pub fn open(backend: S) -> Result<Self> {
        let mut store = Self::new(backend);
        store.load()?;
        Ok(store)
    }

    /// The backing store.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Replace the in-memory collection with the stored one.
    ///
    /// A missing blob yields an empty collection.  A corrupt blob is an
    /// error and leaves the collection empty.
    pub fn load(&mut self) -> Result<()> {
        self.sessions.clear();
        let Some(blob) = self.backend.get(SESSIONS_KEY)? else {
            return Ok(());
        };
        let sessions: Vec<ChatSession> = serde_json::from_str(&blob).map_err(|err| {
            STORE_ERRORS.click();
            Error::serialization(format!("corrupt {SESSIONS_KEY} blob"), Some(Box::new(err)))
        })?;
        SESSIONS_LOADED.count(sessions.len() as u64);
        tracing::debug!(sessions = sessions.len(), "loaded sessions");
        self.sessions = sessions;
        Ok(())
    }

    /// Write the whole collection to the backing store.
    pub fn persist(&self) -> Result<()> {
        self.write(&self.sessions)
    }

    fn write(&self, sessions: &[ChatSession]) -> Result<()> {
        let blob = serde_json::to_string(sessions)?;
        if let Err(err) = self.backend.set(SESSIONS_KEY, &blob) {
            STORE_ERRORS.click();
            tracing::error!(error = %err, "could not persist sessions");
            return Err(err);
        }
        SESSIONS_PERSISTED.click();
        tracing::debug!(sessions = sessions.len(), "persisted sessions");
        Ok(())
    }

    // The in-memory collection only changes once the backend holds `next`.
    fn commit(&mut self, next: Vec<ChatSession>) -> Result<()> {
        self.write(&next)?;
        self.sessions = next;
        Ok(())
    }

    /// All sessions, most recently created first.
    pub fn list(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Look up a session by id.
    pub fn get(&self, id: &SessionId) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// Replace the session with the same id in place, else insert at the front.
    ///
    /// On a write failure the collection is left as it was.
    pub fn upsert(&mut self, session: ChatSession) -> Result<()> {
        let mut next = self.sessions.clone();
        match next.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => next.insert(0, session),
        }
        self.commit(next)
    }

    /// Delete a session.  Returns true if it existed.
    pub fn remove(&mut self, id: &SessionId) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next = self
            .sessions
            .iter()
            .filter(|s| &s.id != id)
            .cloned()
            .collect();
        self.commit(next)?;
        Ok(true)
    }

    /// Retitle a session.  Blank titles are ignored.  Returns true if the
    /// title changed.
    pub fn rename(&mut self, id: &SessionId, title: &str) -> Result<bool> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(false);
        }
        let mut next = self.sessions.clone();
        let Some(session) = next.iter_mut().find(|s| &s.id == id) else {
            return Ok(false);
        };
        session.title = title.to_string();
        self.commit(next)?;
        Ok(true)
    }

    /// Record `messages` as the conversation of session `current`.
    ///
    /// With no current session a new one is created, titled from the first
    /// user message, unless `messages` holds nothing beyond the greeting.
    /// An existing session keeps its title.  Returns the id to make current.
    pub fn save_conversation(
        &mut self,
        current: Option<&SessionId>,
        messages: &[Message],
    ) -> Result<Option<SessionId>> {
        if messages.len() <= 1 && current.is_none() {
            return Ok(None);
        }
        let session = match current.and_then(|id| self.get(id)) {
            Some(existing) => ChatSession {
                id: existing.id.clone(),
                title: existing.title.clone(),
                messages: messages.to_vec(),
                updated_at: now_millis(),
            },
            None => ChatSession {
                id: current.cloned().unwrap_or_else(SessionId::generate),
                title: derive_title(messages),
                messages: messages.to_vec(),
                updated_at: now_millis(),
            },
        };
        let id = session.id.clone();
        self.upsert(session)?;
        Ok(Some(id))
    }
}
