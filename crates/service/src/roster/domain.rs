use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Password seeded into a fresh store when none is configured.
pub const DEFAULT_PASSWORD: &str = "admin123";

/// Class name -> registered student names, in registration order.
pub type Rosters = BTreeMap<String, Vec<String>>;

/// Root document persisted by the roster store.
///
/// Layout on disk: `{"students": {class: [names]}, "password": "..."}`.
/// The store fills missing fields from its seed, so an absent password
/// becomes the configured default. Plain deserialization falls back to
/// `DEFAULT_PASSWORD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub students: Rosters,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_password() -> String {
    DEFAULT_PASSWORD.to_string()
}

impl Default for StoreState {
    fn default() -> Self {
        Self::seeded(DEFAULT_PASSWORD)
    }
}

impl StoreState {
    /// Empty rosters with the given password.
    pub fn seeded(password: impl Into<String>) -> Self {
        Self { students: Rosters::new(), password: password.into() }
    }

    /// Append `student` to `class` unless an identical name is already there.
    /// The roster is created on first insertion.
    pub fn insert(&mut self, class: &str, student: &str) -> bool {
        let roster = self.students.entry(class.to_string()).or_default();
        if roster.iter().any(|s| s == student) {
            return false;
        }
        roster.push(student.to_string());
        true
    }

    /// Remove `student` from `class`. A roster left empty is dropped so
    /// that only classes with registrations appear.
    pub fn remove(&mut self, class: &str, student: &str) -> bool {
        let Some(roster) = self.students.get_mut(class) else {
            return false;
        };
        let Some(pos) = roster.iter().position(|s| s == student) else {
            return false;
        };
        roster.remove(pos);
        if roster.is_empty() {
            self.students.remove(class);
        }
        true
    }

    pub fn roster(&self, class: &str) -> Vec<String> {
        self.students.get(class).cloned().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.students.values().map(Vec::len).sum()
    }
}

/// Why a gated mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    WrongPassword,
    NotFound,
}

impl Rejection {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            Rejection::WrongPassword => 2001,
            Rejection::NotFound => 2002,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::WrongPassword => f.write_str("wrong password"),
            Rejection::NotFound => f.write_str("student not found"),
        }
    }
}

/// Outcome of a password-gated mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationOutcome {
    Applied,
    Rejected(Rejection),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            MutationOutcome::Applied => None,
            MutationOutcome::Rejected(r) => Some(*r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_rejects_exact_duplicates() {
        let mut s = StoreState::default();
        assert!(s.insert("4-a", "Lina"));
        assert!(s.insert("4-a", "Omar"));
        assert!(!s.insert("4-a", "Lina"));
        // no normalization
        assert!(s.insert("4-a", "lina"));
        assert!(s.insert("4-a", "Lina "));
        assert_eq!(s.roster("4-a"), vec!["Lina", "Omar", "lina", "Lina "]);
        assert_eq!(s.total(), 4);
    }

    #[test]
    fn remove_drops_empty_rosters() {
        let mut s = StoreState::seeded("pw");
        s.insert("5-b", "Sami");
        assert!(!s.remove("5-b", "Nour"));
        assert!(!s.remove("6-c", "Sami"));
        assert!(s.remove("5-b", "Sami"));
        assert!(s.students.is_empty());
        assert!(s.roster("5-b").is_empty());
    }

    #[test]
    fn missing_fields_use_defaults() -> Result<(), anyhow::Error> {
        let s: StoreState = serde_json::from_str(r#"{"students": {"أ": ["ب"]}}"#)?;
        assert_eq!(s.password, DEFAULT_PASSWORD);
        assert_eq!(s.roster("أ"), vec!["ب"]);
        let empty: StoreState = serde_json::from_str("{}")?;
        assert_eq!(empty, StoreState::default());
        Ok(())
    }

    #[test]
    fn persisted_layout_keeps_field_names_and_non_ascii() -> Result<(), anyhow::Error> {
        let mut s = StoreState::seeded("سر");
        s.insert("الرابع أ", "محمد");
        let text = serde_json::to_string(&s)?;
        assert_eq!(text, r#"{"students":{"الرابع أ":["محمد"]},"password":"سر"}"#);
        Ok(())
    }

    #[test]
    fn outcome_helpers() {
        assert!(MutationOutcome::Applied.is_applied());
        let r = MutationOutcome::Rejected(Rejection::NotFound);
        assert!(!r.is_applied());
        assert_eq!(r.rejection(), Some(Rejection::NotFound));
        assert_eq!(Rejection::WrongPassword.code(), 2001);
    }
}
