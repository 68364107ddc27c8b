//! Client for the Gölbucks citizen-services API.
//!
//! [`ApiClient`] owns the HTTP pipeline: bearer tokens from the
//! [`TokenStore`], `{ success, data }` envelope unwrapping, and a single
//! shared token refresh when the server answers 401. Resource wrappers hang
//! off the client (`client.events()`, `client.rewards()`, ...).

pub mod api_client;
pub mod config;
pub mod error;
pub mod models;
pub mod preferences;
pub mod secret_store;
pub mod services;
pub mod token_refresh;
pub mod token_store;
pub mod upload;
pub mod validation;

pub const APP_NAME: &str = "Golbucks";

pub use api_client::{ApiClient, ApiRequest};
pub use config::{ClientConfig, TokenBackend};
pub use error::{ApiError, ErrorKind, StorageError};
pub use preferences::{Language, Preferences, Theme};
pub use secret_store::{KeyringStore, MemoryStore, SecretStore};
pub use token_store::{TokenPair, TokenStore};
pub use upload::{ImageUpload, MultipartForm, ProgressFn};
