use crate::error::StorageError;
use crate::secret_store::SecretStore;
use crate::validation::validate_token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use zeroize::Zeroize;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const EXPIRES_AT_KEY: &str = "token_expires_at";

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Drop for TokenPair {
    fn drop(&mut self) {
        self.access_token.zeroize();
        self.refresh_token.zeroize();
    }
}

#[derive(Default)]
struct TokenState {
    access: Option<String>,
    refresh: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    fn wipe(&mut self) {
        if let Some(mut t) = self.access.take() {
            t.zeroize();
        }
        if let Some(mut t) = self.refresh.take() {
            t.zeroize();
        }
        self.expires_at = None;
    }
}

/// Owner of the current credentials.
///
/// Reads are served from memory; writes go to memory and then to the
/// backing [`SecretStore`].
pub struct TokenStore {
    state: RwLock<TokenState>,
    backend: Arc<dyn SecretStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn SecretStore>) -> Self {
        Self {
            state: RwLock::new(TokenState::default()),
            backend,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TokenState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Load persisted tokens into memory. Storage failures leave the store
    /// unauthenticated rather than failing startup.
    pub fn initialize(&self) {
        let load = |key: &str| match self.backend.get(key) {
            Ok(value) => value.filter(|v| validate_token(v).is_ok()),
            Err(e) => {
                warn!("Failed to load {key}: {e}");
                None
            }
        };

        let access = load(ACCESS_TOKEN_KEY);
        let refresh = load(REFRESH_TOKEN_KEY);
        let expires_at = match self.backend.get(EXPIRES_AT_KEY) {
            Ok(raw) => raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()),
            Err(e) => {
                warn!("Failed to load token expiry: {e}");
                None
            }
        }
        .map(|dt| dt.with_timezone(&Utc));

        let mut state = self.write();
        state.wipe();
        state.access = access;
        state.refresh = refresh;
        state.expires_at = expires_at;
        debug!(
            authenticated = state.access.is_some(),
            "Token store initialized"
        );
    }

    /// Store a new pair. Durable storage is written first; memory only
    /// changes once every write succeeded, and a partial write is rolled
    /// back to the previous session.
    pub fn set_tokens(&self, pair: &TokenPair) -> Result<(), StorageError> {
        validate_token(&pair.access_token).map_err(StorageError::InvalidToken)?;
        validate_token(&pair.refresh_token).map_err(StorageError::InvalidToken)?;

        let mut state = self.write();
        let written = self
            .backend
            .set(ACCESS_TOKEN_KEY, &pair.access_token)
            .and_then(|_| self.backend.set(REFRESH_TOKEN_KEY, &pair.refresh_token))
            .and_then(|_| self.persist_expiry(pair.expires_at));
        if let Err(e) = written {
            self.restore(&state);
            return Err(e);
        }

        state.wipe();
        state.access = Some(pair.access_token.clone());
        state.refresh = Some(pair.refresh_token.clone());
        state.expires_at = pair.expires_at;
        Ok(())
    }

    fn persist_expiry(&self, expires_at: Option<DateTime<Utc>>) -> Result<(), StorageError> {
        match expires_at {
            Some(exp) => self.backend.set(EXPIRES_AT_KEY, &exp.to_rfc3339()),
            None => self.backend.delete(EXPIRES_AT_KEY),
        }
    }

    /// Put durable storage back in line with `state` after a failed write.
    fn restore(&self, state: &TokenState) {
        let entries = [
            (ACCESS_TOKEN_KEY, state.access.clone()),
            (REFRESH_TOKEN_KEY, state.refresh.clone()),
            (EXPIRES_AT_KEY, state.expires_at.map(|exp| exp.to_rfc3339())),
        ];
        for (key, value) in entries {
            let result = match value {
                Some(mut v) => {
                    let r = self.backend.set(key, &v);
                    v.zeroize();
                    r
                }
                None => self.backend.delete(key),
            };
            if let Err(e) = result {
                warn!("Failed to restore {key} after a failed write: {e}");
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh.clone()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read().expires_at
    }

    /// Replace only the access token; the refresh token is kept as-is.
    /// The previous expiry no longer applies and is dropped.
    pub fn update_access_token(&self, token: &str) -> Result<(), StorageError> {
        validate_token(token).map_err(StorageError::InvalidToken)?;

        let mut state = self.write();
        let written = self
            .backend
            .set(ACCESS_TOKEN_KEY, token)
            .and_then(|_| self.backend.delete(EXPIRES_AT_KEY));
        if let Err(e) = written {
            self.restore(&state);
            return Err(e);
        }

        if let Some(mut old) = state.access.replace(token.to_string()) {
            old.zeroize();
        }
        state.expires_at = None;
        Ok(())
    }

    /// Forget both tokens. Storage errors are logged and swallowed: the
    /// in-memory state is always cleared so logout proceeds.
    pub fn clear_tokens(&self) {
        self.write().wipe();

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY] {
            if let Err(e) = self.backend.delete(key) {
                warn!("Failed to remove {key} from storage: {e}");
            }
        }
    }

    /// True when an access token is held; the server may still reject it.
    pub fn is_authenticated(&self) -> bool {
        self.read().access.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.read().expires_at.is_some_and(|exp| exp <= now)
    }
}
