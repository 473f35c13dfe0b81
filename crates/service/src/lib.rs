//! Service layer for school event registration.
//! - `roster`: domain model and the async storage seam.
//! - `file`: file-backed roster store and class catalog.
//! - `storage`: lock-guarded JSON document the file stores are built on.
//! - `registration`: input validation and overview on top of the store.

pub mod auth;
pub mod errors;
pub mod file;
pub mod registration;
pub mod roster;
pub mod runtime;
pub mod storage;

pub use errors::{ServiceError, StoreError};
pub use file::class_catalog::ClassCatalog;
pub use file::roster_store::{RosterFileStore, StoreOptions};
pub use registration::RegistrationService;
pub use roster::{MutationOutcome, Rejection, RosterStore};
