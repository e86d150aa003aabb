//! Storage abstractions for credentials and revoked tokens

pub mod token_revocation;
pub mod user_store;

pub use token_revocation::{
    create_memory_revocation_store, MemoryRevocationStore, RevocationReason, RevocationStore,
    RevokedToken, SharedRevocationStore,
};
pub use user_store::{
    create_memory_credential_store, CredentialStore, MemoryCredentialStore, SharedCredentialStore,
};
