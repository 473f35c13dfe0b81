//! Registration workflows on top of a roster store and the class catalog.
//!
//! Validates caller input before touching the store and turns store
//! outcomes into `ServiceError`s for callers. New registrations must name a
//! catalog class; removals go straight to the store so that registrations
//! left behind by a retired class can still be cleaned up.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::file::class_catalog::ClassCatalog;
use crate::roster::domain::{MutationOutcome, Rejection};
use crate::roster::store::RosterStore;

/// One class as shown on the overview board.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassSummary {
    pub name: String,
    pub code: String,
    pub color: String,
    pub students: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GradeSummary {
    pub grade: String,
    pub classes: Vec<ClassSummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Overview {
    pub grades: Vec<GradeSummary>,
    /// Rosters stored under classes the catalog no longer lists.
    pub unlisted: Vec<ClassSummary>,
    /// Registrations across catalog classes only.
    pub total_students: usize,
}

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RosterStore>,
    catalog: Arc<ClassCatalog>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn RosterStore>, catalog: Arc<ClassCatalog>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    /// Register a student. Both fields are trimmed first.
    pub async fn register(&self, student_name: &str, class_name: &str) -> Result<(), ServiceError> {
        let (student, class) = (student_name.trim(), class_name.trim());
        if student.is_empty() || class.is_empty() {
            return Err(ServiceError::missing_data());
        }
        self.ensure_known(class)?;
        if !self.store.add_student(class, student).await? {
            return Err(ServiceError::AlreadyRegistered);
        }
        info!(class, student, "new registration");
        Ok(())
    }

    /// Remove a registration; requires the shared password. The class is
    /// not checked against the catalog.
    pub async fn unregister(&self, student_name: &str, class_name: &str, password: &str) -> Result<(), ServiceError> {
        let (student, class, password) = (student_name.trim(), class_name.trim(), password.trim());
        if student.is_empty() || class.is_empty() || password.is_empty() {
            return Err(ServiceError::missing_data());
        }
        match self.store.remove_student(class, student, password).await? {
            MutationOutcome::Applied => Ok(()),
            MutationOutcome::Rejected(reason) => Err(ServiceError::Rejected(reason)),
        }
    }

    pub async fn roster(&self, class_name: &str) -> Result<Vec<String>, ServiceError> {
        let class = class_name.trim();
        self.ensure_known(class)?;
        Ok(self.store.get_students(class).await?)
    }

    /// Every catalog class grouped by grade with its current registrations.
    /// Rosters for classes no longer in the catalog are reported under
    /// `unlisted`.
    pub async fn overview(&self) -> Result<Overview, ServiceError> {
        let rosters = self.store.get_all_rosters().await?;
        let mut total_students = 0;
        let grades = self
            .catalog
            .all_grades()
            .iter()
            .map(|(key, grade)| {
                let classes = grade
                    .classes
                    .iter()
                    .map(|c| {
                        let students = rosters.get(&c.name).cloned().unwrap_or_default();
                        total_students += students.len();
                        ClassSummary {
                            name: c.name.clone(),
                            code: c.code.clone(),
                            color: grade.color.clone(),
                            count: students.len(),
                            students,
                        }
                    })
                    .collect();
                GradeSummary { grade: key.clone(), classes }
            })
            .collect();
        let unlisted: Vec<ClassSummary> = rosters
            .into_iter()
            .filter(|(class, _)| !self.catalog.contains(class))
            .map(|(name, students)| ClassSummary {
                name,
                code: String::new(),
                color: String::new(),
                count: students.len(),
                students,
            })
            .collect();
        if !unlisted.is_empty() {
            warn!(unlisted = unlisted.len(), "rosters found for classes missing from the catalog");
        }
        Ok(Overview { grades, unlisted, total_students })
    }

    pub async fn clear_all(&self, password: &str) -> Result<(), ServiceError> {
        match self.store.clear_all(password.trim()).await? {
            MutationOutcome::Applied => Ok(()),
            MutationOutcome::Rejected(reason) => Err(ServiceError::Rejected(reason)),
        }
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), ServiceError> {
        let new_password = new_password.trim();
        if new_password.is_empty() {
            return Err(ServiceError::Validation("new password must not be empty".into()));
        }
        if self.store.update_password(old_password.trim(), new_password).await? {
            Ok(())
        } else {
            Err(ServiceError::Rejected(Rejection::WrongPassword))
        }
    }

    fn ensure_known(&self, class: &str) -> Result<(), ServiceError> {
        if self.catalog.contains(class) {
            Ok(())
        } else {
            Err(ServiceError::InvalidClass(class.to_string()))
        }
    }
}
