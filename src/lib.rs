//! Session-aware client for the recipe-sharing REST API.
//!
//! [`SessionManager`] owns the login state: it restores a persisted
//! credential at start, attaches the bearer token to authenticated calls,
//! refreshes once on a 401, and keeps the current user's favorites and
//! profile cached. The REST surface sits behind the [`Backend`] trait;
//! [`HttpBackend`] is the `reqwest` implementation.

pub mod api;
pub mod catalog;
pub mod config;
pub mod credential;
pub mod draft;
pub mod error;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use api::http::HttpBackend;
pub use api::types::ProfileUpdate;
pub use api::{Backend, ImageUpload};
pub use catalog::{RecipeQuery, SortKey};
pub use config::ClientConfig;
pub use credential::{Credential, UserRef};
pub use draft::RecipeDraft;
pub use error::ClientError;
pub use session::{Session, SessionManager, SessionState};
pub use storage::{CredentialStore, FileStore, MemoryStore};
