//! Authorization for destructive operations.
//!
//! A single shared secret acts as the capability token; see [`secret`].

pub mod secret;

pub use secret::{SecretVerifier, SharedSecret};
