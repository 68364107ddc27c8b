use crate::error::StorageError;
use crate::models::User;
use crate::secret_store::SecretStore;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

pub const PREFERENCES_FILE: &str = "preferences.json";

const USER_KEY: &str = "user_profile";
const THEME_KEY: &str = "theme";
const LANGUAGE_KEY: &str = "language";
const NOTIFICATIONS_KEY: &str = "notifications_enabled";
const DAILY_REWARD_KEY: &str = "daily_reward_last_claim";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Tr,
    En,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "tr" | "tr-tr" => Some(Language::Tr),
            "en" | "en-us" | "en-gb" => Some(Language::En),
            _ => None,
        }
    }
}

type Entries = BTreeMap<String, String>;

/// Local key-value state persisted as one JSON file.
///
/// Values are JSON-serialized strings. A missing or corrupt file reads as an
/// empty store, and a value that no longer parses reads as absent.
pub struct Preferences {
    path: PathBuf,
    cache: Mutex<Option<Entries>>,
}

impl Preferences {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::open(dir.join(PREFERENCES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> Result<MutexGuard<'_, Option<Entries>>, StorageError> {
        let mut cache = self.cache.lock().map_err(|_| StorageError::Poisoned)?;
        if cache.is_none() {
            *cache = Some(load_entries(&self.path));
        }
        Ok(cache)
    }

    fn persist(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                StorageError::Preferences(format!("Failed to create data directory: {e}"))
            })?;
        }
        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Preferences(format!("Failed to serialize store: {e}")))?;
        fs::write(&self.path, body)
            .map_err(|e| StorageError::Preferences(format!("Failed to write store: {e}")))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .ok()
            .and_then(|cache| cache.as_ref().and_then(|m| m.get(key).cloned()))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut cache = self.entries()?;
        let mut next = cache.clone().unwrap_or_default();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *cache = Some(next);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut cache = self.entries()?;
        let mut next = cache.clone().unwrap_or_default();
        if next.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&next)?;
        *cache = Some(next);
        Ok(())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring unreadable preference {key}: {e}");
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StorageError::Preferences(format!("Failed to serialize {key}: {e}")))?;
        self.set(key, &raw)
    }

    pub fn user(&self) -> Option<User> {
        self.get_json(USER_KEY)
    }

    pub fn set_user(&self, user: &User) -> Result<(), StorageError> {
        self.set_json(USER_KEY, user)
    }

    pub fn clear_user(&self) -> Result<(), StorageError> {
        self.remove(USER_KEY)
    }

    pub fn theme(&self) -> Theme {
        self.get_json(THEME_KEY).unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.set_json(THEME_KEY, &theme)
    }

    pub fn language(&self) -> Language {
        self.get_json(LANGUAGE_KEY).unwrap_or_default()
    }

    pub fn set_language(&self, language: Language) -> Result<(), StorageError> {
        self.set_json(LANGUAGE_KEY, &language)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.get_json(NOTIFICATIONS_KEY).unwrap_or(true)
    }

    pub fn set_notifications_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.set_json(NOTIFICATIONS_KEY, &enabled)
    }

    pub fn last_daily_claim(&self) -> Option<NaiveDate> {
        self.get_json(DAILY_REWARD_KEY)
    }

    pub fn set_last_daily_claim(&self, date: NaiveDate) -> Result<(), StorageError> {
        self.set_json(DAILY_REWARD_KEY, &date)
    }
}

fn load_entries(path: &Path) -> Entries {
    let Ok(raw) = fs::read_to_string(path) else {
        return Entries::new();
    };
    match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&raw) {
        // Entries written by other tools may hold non-string values; keep
        // them in serialized form so typed reads still work.
        Ok(map) => map
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect(),
        Err(e) => {
            debug!("Preference file {} is unreadable: {e}", path.display());
            Entries::new()
        }
    }
}

/// The `file` token backend: secrets kept alongside the other preferences.
impl SecretStore for Preferences {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let cache = self.entries()?;
        Ok(cache.as_ref().and_then(|m| m.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Preferences::set(self, key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.remove(key)
    }
}
