use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::info;

use crate::auth::{SecretVerifier, SharedSecret};
use crate::errors::{ServiceError, StoreError};
use crate::roster::domain::{MutationOutcome, Rejection, Rosters, StoreState, DEFAULT_PASSWORD};
use crate::roster::store::RosterStore;
use crate::storage::file_lock::LockSettings;
use crate::storage::json_document::{Change, CorruptionPolicy, JsonDocument};

/// Tunables for a file-backed roster store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub default_password: String,
    pub lock: LockSettings,
    pub on_corrupt: CorruptionPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_password: DEFAULT_PASSWORD.to_string(),
            lock: LockSettings::default(),
            on_corrupt: CorruptionPolicy::default(),
        }
    }
}

impl StoreOptions {
    pub fn from_config(cfg: &configs::StoreConfig) -> Result<Self, ServiceError> {
        let on_corrupt = cfg.on_corrupt.parse::<CorruptionPolicy>().map_err(ServiceError::Validation)?;
        Ok(Self {
            default_password: cfg.default_password.clone(),
            lock: LockSettings {
                max_attempts: cfg.lock_max_attempts,
                retry_delay: Duration::from_millis(cfg.lock_retry_delay_ms),
            },
            on_corrupt,
        })
    }
}

/// File-backed roster store.
///
/// Keeps `class -> [student]` plus the shared password in one JSON file.
/// Every operation reloads the file under an advisory lock: shared for
/// reads, exclusive for the whole read-modify-write of a mutation. All
/// classes share the one lock.
///
/// Each mutation rewrites the full document, so write cost grows with the
/// total number of registrations rather than with the size of the change.
#[derive(Clone)]
pub struct RosterFileStore {
    doc: Arc<JsonDocument<StoreState>>,
    verifier: Arc<dyn SecretVerifier>,
}

impl RosterFileStore {
    /// Open the store at `path`, seeding the file if it does not exist.
    pub fn open<P: Into<std::path::PathBuf>>(path: P, options: StoreOptions) -> Result<Arc<Self>, StoreError> {
        Self::open_with_verifier(path, options, Arc::new(SharedSecret))
    }

    pub fn open_with_verifier<P: Into<std::path::PathBuf>>(
        path: P,
        options: StoreOptions,
        verifier: Arc<dyn SecretVerifier>,
    ) -> Result<Arc<Self>, StoreError> {
        let seed = StoreState::seeded(options.default_password);
        let doc = JsonDocument::new(path, seed, options.lock, options.on_corrupt)?;
        doc.ensure_exists()?;
        Ok(Arc::new(Self { doc: Arc::new(doc), verifier }))
    }

    pub fn path(&self) -> &Path {
        self.doc.path()
    }

    pub fn lock_path(&self) -> &Path {
        self.doc.lock_path()
    }

    /// Register `student_name` in `class_name`; `false` when already present.
    /// The file is only rewritten when a name was added.
    pub fn add_student(&self, class_name: &str, student_name: &str) -> Result<bool, StoreError> {
        let added = self.doc.update(|state| {
            if state.insert(class_name, student_name) {
                Change::commit(true)
            } else {
                Change::keep(false)
            }
        })?;
        if added {
            info!(class = class_name, student = student_name, "student registered");
        }
        Ok(added)
    }

    /// Remove a registration. The password is checked before existence, so
    /// a wrong password is reported even for unknown students.
    pub fn remove_student(
        &self,
        class_name: &str,
        student_name: &str,
        password: &str,
    ) -> Result<MutationOutcome, StoreError> {
        let outcome = self.doc.update(|state| {
            if !self.verifier.verify(password, &state.password) {
                Change::keep(MutationOutcome::Rejected(Rejection::WrongPassword))
            } else if state.remove(class_name, student_name) {
                Change::commit(MutationOutcome::Applied)
            } else {
                Change::keep(MutationOutcome::Rejected(Rejection::NotFound))
            }
        })?;
        match outcome {
            MutationOutcome::Applied => info!(class = class_name, student = student_name, "student removed"),
            MutationOutcome::Rejected(reason) => {
                info!(class = class_name, student = student_name, %reason, "removal rejected")
            }
        }
        Ok(outcome)
    }

    /// Roster of `class_name`, empty when nobody is registered.
    pub fn get_students(&self, class_name: &str) -> Result<Vec<String>, StoreError> {
        self.doc.read(|state| state.roster(class_name))
    }

    pub fn get_all_rosters(&self) -> Result<Rosters, StoreError> {
        self.doc.read(|state| state.students.clone())
    }

    /// Drop every registration. Gated by the shared password.
    pub fn clear_all(&self, password: &str) -> Result<MutationOutcome, StoreError> {
        let outcome = self.doc.update(|state| {
            if !self.verifier.verify(password, &state.password) {
                return Change::keep(MutationOutcome::Rejected(Rejection::WrongPassword));
            }
            state.students.clear();
            Change::commit(MutationOutcome::Applied)
        })?;
        match outcome {
            MutationOutcome::Applied => info!("all registrations cleared"),
            MutationOutcome::Rejected(reason) => info!(%reason, "clear rejected"),
        }
        Ok(outcome)
    }

    pub fn update_password(&self, old_password: &str, new_password: &str) -> Result<bool, StoreError> {
        let changed = self.doc.update(|state| {
            if !self.verifier.verify(old_password, &state.password) {
                return Change::keep(false);
            }
            state.password = new_password.to_string();
            Change::commit(true)
        })?;
        info!(changed, "password update requested");
        Ok(changed)
    }

    /// Raw persisted bytes, for diagnostics and consistency checks.
    pub fn snapshot(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.doc.snapshot()
    }
}

async fn blocking<F, R>(f: F) -> Result<R, StoreError>
where
    F: FnOnce() -> Result<R, StoreError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
}

#[async_trait]
impl RosterStore for RosterFileStore {
    async fn add_student(&self, class_name: &str, student_name: &str) -> Result<bool, StoreError> {
        let (store, class, student) = (self.clone(), class_name.to_owned(), student_name.to_owned());
        blocking(move || store.add_student(&class, &student)).await
    }

    async fn remove_student(
        &self,
        class_name: &str,
        student_name: &str,
        password: &str,
    ) -> Result<MutationOutcome, StoreError> {
        let store = self.clone();
        let (class, student, pw) = (class_name.to_owned(), student_name.to_owned(), password.to_owned());
        blocking(move || store.remove_student(&class, &student, &pw)).await
    }

    async fn get_students(&self, class_name: &str) -> Result<Vec<String>, StoreError> {
        let (store, class) = (self.clone(), class_name.to_owned());
        blocking(move || store.get_students(&class)).await
    }

    async fn get_all_rosters(&self) -> Result<Rosters, StoreError> {
        let store = self.clone();
        blocking(move || store.get_all_rosters()).await
    }

    async fn clear_all(&self, password: &str) -> Result<MutationOutcome, StoreError> {
        let (store, pw) = (self.clone(), password.to_owned());
        blocking(move || store.clear_all(&pw)).await
    }

    async fn update_password(&self, old_password: &str, new_password: &str) -> Result<bool, StoreError> {
        let (store, old, new) = (self.clone(), old_password.to_owned(), new_password.to_owned());
        blocking(move || store.update_password(&old, &new)).await
    }
}
