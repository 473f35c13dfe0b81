//! Roster domain model and the storage seam used by the service layer.

pub mod domain;
pub mod store;

pub use domain::{MutationOutcome, Rejection, Rosters, StoreState};
pub use store::RosterStore;
