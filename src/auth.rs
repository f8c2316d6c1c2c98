//! Credential models: redacted secrets, access tokens, and the cached credential record.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
