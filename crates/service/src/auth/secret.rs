/// Capability check gating destructive store operations.
///
/// The store only ever asks "does this token match the stored one"; it has
/// no notion of users, so a richer scheme can be plugged in here without
/// touching the read/modify/write path.
pub trait SecretVerifier: Send + Sync {
    fn verify(&self, provided: &str, stored: &str) -> bool;
}

/// One shared password for the whole system, compared by exact equality.
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedSecret;

impl SecretVerifier for SharedSecret {
    fn verify(&self, provided: &str, stored: &str) -> bool {
        provided == stored
    }
}
