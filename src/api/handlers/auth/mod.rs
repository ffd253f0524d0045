//! Authentication flows around the session token core.
//!
//! The login route turns Basic credentials into an opaque token; every other
//! route relies on the global bearer layer in [`identity`] for its identity.

pub(crate) mod identity;
pub(crate) mod login;
pub(crate) mod password;
pub(crate) mod session;
pub(crate) mod storage;

pub use identity::{CredentialIdentity, TokenIdentity, token_authentication};
