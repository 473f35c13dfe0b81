use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::storage::file_lock::{FileLock, LockMode, LockSettings};

/// What to do when the persisted document cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptionPolicy {
    /// Continue from the seed value. The unreadable bytes are copied aside
    /// before the first overwrite.
    #[default]
    Recover,
    /// Surface `StoreError::Corrupt` to the caller.
    Fail,
}

impl FromStr for CorruptionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recover" => Ok(Self::Recover),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown corruption policy '{other}', expected 'recover' or 'fail'")),
        }
    }
}

/// Result of a mutation closure: the value handed back to the caller and
/// whether the document must be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<R> {
    pub value: R,
    pub dirty: bool,
}

impl<R> Change<R> {
    pub fn commit(value: R) -> Self {
        Self { value, dirty: true }
    }

    pub fn keep(value: R) -> Self {
        Self { value, dirty: false }
    }
}

enum Loaded<T> {
    Missing(T),
    Parsed(T),
    Corrupt(T, Vec<u8>),
}

impl<T> Loaded<T> {
    fn into_parts(self) -> (T, Option<Vec<u8>>, bool) {
        match self {
            Loaded::Missing(v) => (v, None, true),
            Loaded::Parsed(v) => (v, None, false),
            Loaded::Corrupt(v, raw) => (v, Some(raw), false),
        }
    }
}

/// A single JSON document on disk guarded by an advisory lock file.
///
/// Every call reloads the document; nothing is cached between calls.
/// Reads run under a shared lock, updates run the whole
/// read-modify-write under an exclusive lock and replace the file
/// atomically (temp file, fsync, rename).
///
/// Top-level fields missing from the file take their value from the seed.
#[derive(Debug)]
pub struct JsonDocument<T> {
    path: PathBuf,
    lock_path: PathBuf,
    seed: T,
    lock: LockSettings,
    policy: CorruptionPolicy,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Bind to `path`; the parent directory is created if needed.
    /// `seed` is the state used when the file is missing or recovered.
    pub fn new<P: Into<PathBuf>>(
        path: P,
        seed: T,
        lock: LockSettings,
        policy: CorruptionPolicy,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let lock_path = sibling(&path, ".lock");
        Ok(Self { path, lock_path, seed, lock, policy })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Write the seed if the document does not exist yet.
    pub fn ensure_exists(&self) -> Result<(), StoreError> {
        self.update(|_| Change::keep(()))
    }

    /// Run `f` against the current document under a shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, StoreError> {
        let _guard = FileLock::acquire(&self.lock_path, LockMode::Shared, &self.lock)?;
        let (state, _, _) = self.load()?.into_parts();
        Ok(f(&state))
    }

    /// Run `f` against the current document under an exclusive lock and
    /// persist the result when `f` reports a change. A missing document is
    /// always written so that the file exists after the first update.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> Change<R>) -> Result<R, StoreError> {
        let _guard = FileLock::acquire(&self.lock_path, LockMode::Exclusive, &self.lock)?;
        let (mut state, corrupt, missing) = self.load()?.into_parts();
        let change = f(&mut state);
        if change.dirty || missing {
            if let Some(raw) = corrupt {
                self.quarantine(&raw)?;
            }
            self.persist(&state)?;
        }
        Ok(change.value)
    }

    /// Raw bytes of the document as currently on disk, taken under a shared lock.
    pub fn snapshot(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let _guard = FileLock::acquire(&self.lock_path, LockMode::Shared, &self.lock)?;
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    fn load(&self) -> Result<Loaded<T>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Loaded::Missing(self.seed.clone())),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let parsed = serde_json::from_slice::<Value>(&bytes)
            .and_then(|value| serde_json::from_value::<T>(self.with_seed_fields(value)));
        match parsed {
            Ok(state) => Ok(Loaded::Parsed(state)),
            Err(source) => match self.policy {
                CorruptionPolicy::Fail => Err(StoreError::Corrupt { path: self.path.clone(), source }),
                CorruptionPolicy::Recover => {
                    warn!(path = %self.path.display(), error = %source, "unreadable document, continuing from a fresh state");
                    Ok(Loaded::Corrupt(self.seed.clone(), bytes))
                }
            },
        }
    }

    fn with_seed_fields(&self, mut value: Value) -> Value {
        if let (Value::Object(fields), Ok(Value::Object(seed))) = (&mut value, serde_json::to_value(&self.seed)) {
            for (key, default) in seed {
                fields.entry(key).or_insert(default);
            }
        }
        value
    }

    fn quarantine(&self, raw: &[u8]) -> Result<(), StoreError> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let target = sibling(&self.path, &format!(".corrupt-{stamp}"));
        fs::write(&target, raw).map_err(|e| StoreError::io(&target, e))?;
        warn!(path = %self.path.display(), backup = %target.display(), "unreadable document copied aside before overwrite");
        Ok(())
    }

    fn persist(&self, state: &T) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(state).map_err(StoreError::Encode)?;
        let tmp = sibling(&self.path, &format!(".{}.tmp", Uuid::new_v4().simple()));
        let written = write_synced(&tmp, &data).and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&self.path, e));
        }
        debug!(path = %self.path.display(), bytes = data.len(), "document rewritten");
        Ok(())
    }
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
