use async_trait::async_trait;

use crate::errors::StoreError;
use crate::roster::domain::{MutationOutcome, Rosters};

/// Trait abstraction for roster storage.
/// Implementations can be file-backed, database-backed, or remote KV.
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn add_student(&self, class_name: &str, student_name: &str) -> Result<bool, StoreError>;
    async fn remove_student(
        &self,
        class_name: &str,
        student_name: &str,
        password: &str,
    ) -> Result<MutationOutcome, StoreError>;
    async fn get_students(&self, class_name: &str) -> Result<Vec<String>, StoreError>;
    async fn get_all_rosters(&self) -> Result<Rosters, StoreError>;
    async fn clear_all(&self, password: &str) -> Result<MutationOutcome, StoreError>;
    async fn update_password(&self, old_password: &str, new_password: &str) -> Result<bool, StoreError>;
}
