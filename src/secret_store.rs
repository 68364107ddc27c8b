use crate::error::StorageError;
use std::collections::HashMap;
use std::sync::Mutex;
use zeroize::Zeroize;

/// Durable string storage for credentials.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing a key that is not present succeeds.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Secrets held in the operating system keyring, one entry per key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| StorageError::Keyring(format!("Failed to open keyring entry: {e}")))
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Keyring(format!(
                "Failed to read {key} from keyring: {e}"
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::Keyring(format!("Failed to store {key} in keyring: {e}")))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_password() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::Keyring(format!(
                "Failed to delete {key} from keyring: {e}"
            ))),
        }
    }
}

/// Process-local secrets; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(mut old) = self.lock()?.insert(key.to_string(), value.to_string()) {
            old.zeroize();
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        if let Some(mut old) = self.lock()?.remove(key) {
            old.zeroize();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip_and_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("access_token").unwrap(), None);
        store.set("access_token", "t1").unwrap();
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("t1"));
        store.set("access_token", "t2").unwrap();
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("t2"));
        store.delete("access_token").unwrap();
        store.delete("access_token").unwrap();
        assert_eq!(store.get("access_token").unwrap(), None);
    }
}
