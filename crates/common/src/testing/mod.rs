//! Test doubles shared across the workspace
//!
//! In-memory stand-ins for the platform keychain and the credential
//! store, so unit and integration tests never touch real secure storage.

pub mod mocks;

pub use mocks::{MemoryCredentialStore, MemorySecretBackend};
