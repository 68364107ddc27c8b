use crate::preferences::Language;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name -> validation messages, as sent by the API in `errors`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Auth,
    Validation,
    Server,
    Unknown,
}

/// Every failure the API client surfaces to callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("{message}")]
    Network { message: String },
    #[error("{message}")]
    Timeout { message: String },
    #[error("{message}")]
    Auth { status: Option<u16>, message: String },
    #[error("{message}")]
    Validation {
        status: u16,
        message: String,
        errors: FieldErrors,
    },
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("{message}")]
    Unknown { status: Option<u16>, message: String },
}

/// Error body of the standard envelope: `{ success: false, error, message, errors? }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_field_errors")]
    pub errors: Option<FieldErrors>,
}

/// Accepts `{ field: [msg, ...] }` or `{ field: msg }`; any other shape is
/// dropped rather than failing the whole envelope.
fn lenient_field_errors<'de, D>(deserializer: D) -> Result<Option<FieldErrors>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Object(map)) = raw else {
        return Ok(None);
    };
    let mut out = FieldErrors::new();
    for (field, value) in map {
        let messages = match value {
            serde_json::Value::String(s) => vec![s],
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => continue,
        };
        out.insert(field, messages);
    }
    Ok(Some(out))
}

impl ErrorEnvelope {
    /// First non-blank of `message` then `error`, trimmed.
    pub(crate) fn best_message(&self) -> Option<String> {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
        };
        non_blank(&self.message).or_else(|| non_blank(&self.error))
    }
}

impl ApiError {
    /// Normalize an HTTP failure into one of the closed error kinds.
    pub fn from_status(status: u16, envelope: Option<ErrorEnvelope>) -> Self {
        let envelope = envelope.unwrap_or_default();
        let message = envelope
            .best_message()
            .unwrap_or_else(|| default_status_message(status));

        match status {
            401 | 403 => ApiError::Auth {
                status: Some(status),
                message,
            },
            400 | 422 => ApiError::Validation {
                status,
                message,
                errors: envelope.errors.unwrap_or_default(),
            },
            500..=u16::MAX => ApiError::Server { status, message },
            _ => ApiError::Unknown {
                status: Some(status),
                message,
            },
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        ApiError::Auth {
            status: None,
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        ApiError::Unknown {
            status: None,
            message: message.into(),
        }
    }

    /// Client-side input rejection, shaped like a server 422.
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.clone()]);
        ApiError::Validation {
            status: 422,
            message,
            errors,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network { .. } => ErrorKind::Network,
            ApiError::Timeout { .. } => ErrorKind::Timeout,
            ApiError::Auth { .. } => ErrorKind::Auth,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network { .. } | ApiError::Timeout { .. } => None,
            ApiError::Auth { status, .. } | ApiError::Unknown { status, .. } => *status,
            ApiError::Validation { status, .. } | ApiError::Server { status, .. } => Some(*status),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Network { message }
            | ApiError::Timeout { message }
            | ApiError::Auth { message, .. }
            | ApiError::Validation { message, .. }
            | ApiError::Server { message, .. }
            | ApiError::Unknown { message, .. } => message,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        }
    }

    /// Message suitable for showing to the citizen in the chosen language.
    pub fn user_message(&self, lang: Language) -> String {
        if let Some(text) = auth_phrase_override(self.message(), lang) {
            return text.to_string();
        }

        match self.kind() {
            ErrorKind::Network => localized(lang, MessageId::Network).to_string(),
            ErrorKind::Timeout => localized(lang, MessageId::Timeout).to_string(),
            ErrorKind::Auth if self.status().is_none() => {
                localized(lang, MessageId::SessionExpired).to_string()
            }
            ErrorKind::Validation if !self.message().is_empty() => self.message().to_string(),
            _ => localized(lang, status_message_id(self.status())).to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ApiError::Timeout {
                message: format!("Request timed out: {err}"),
            };
        }
        if err.is_connect() || (err.is_request() && err.status().is_none()) {
            return ApiError::Network {
                message: format!("No response from server: {err}"),
            };
        }
        if let Some(status) = err.status() {
            return ApiError::from_status(status.as_u16(), None);
        }
        ApiError::unknown(format!("Unexpected transport error: {err}"))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::unknown(format!("Unexpected response shape: {err}"))
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::unknown(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Keyring error: {0}")]
    Keyring(String),
    #[error("Preference store error: {0}")]
    Preferences(String),
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Store lock is poisoned")]
    Poisoned,
}

pub(crate) fn default_status_message(status: u16) -> String {
    match status {
        400 => "Request rejected (HTTP 400)".to_string(),
        401 => "Authentication failed (HTTP 401)".to_string(),
        403 => "Permission denied (HTTP 403)".to_string(),
        404 => "Resource not found (HTTP 404)".to_string(),
        422 => "Validation failed (HTTP 422)".to_string(),
        429 => "Rate limit exceeded (HTTP 429)".to_string(),
        500..=599 => format!("Server error (HTTP {status})"),
        _ => format!("Request failed (HTTP {status})"),
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageId {
    Network,
    Timeout,
    BadRequest,
    SessionExpired,
    Forbidden,
    NotFound,
    RateLimited,
    Server,
    Generic,
    InvalidCredentials,
    AccountExists,
    AccountDisabled,
}

fn status_message_id(status: Option<u16>) -> MessageId {
    match status {
        Some(400) | Some(422) => MessageId::BadRequest,
        Some(401) => MessageId::SessionExpired,
        Some(403) => MessageId::Forbidden,
        Some(404) => MessageId::NotFound,
        Some(429) => MessageId::RateLimited,
        Some(500..=599) => MessageId::Server,
        _ => MessageId::Generic,
    }
}

fn auth_phrase_override(message: &str, lang: Language) -> Option<&'static str> {
    let lower = message.to_lowercase();
    let id = if lower.contains("invalid credentials")
        || lower.contains("invalid email or password")
        || lower.contains("wrong password")
    {
        MessageId::InvalidCredentials
    } else if lower.contains("already exists") || lower.contains("already registered") {
        MessageId::AccountExists
    } else if lower.contains("account disabled") || lower.contains("account is disabled") {
        MessageId::AccountDisabled
    } else {
        return None;
    };
    Some(localized(lang, id))
}

fn localized(lang: Language, id: MessageId) -> &'static str {
    match (lang, id) {
        (Language::Tr, MessageId::Network) => "İnternet bağlantınızı kontrol edip tekrar deneyin.",
        (Language::Tr, MessageId::Timeout) => "İstek zaman aşımına uğradı. Lütfen tekrar deneyin.",
        (Language::Tr, MessageId::BadRequest) => "Girdiğiniz bilgileri kontrol edin.",
        (Language::Tr, MessageId::SessionExpired) => {
            "Oturumunuzun süresi doldu. Lütfen tekrar giriş yapın."
        }
        (Language::Tr, MessageId::Forbidden) => "Bu işlem için yetkiniz bulunmuyor.",
        (Language::Tr, MessageId::NotFound) => "Aradığınız kayıt bulunamadı.",
        (Language::Tr, MessageId::RateLimited) => {
            "Çok fazla istek gönderildi. Lütfen biraz bekleyin."
        }
        (Language::Tr, MessageId::Server) => {
            "Sunucuda bir hata oluştu. Lütfen daha sonra tekrar deneyin."
        }
        (Language::Tr, MessageId::Generic) => "Beklenmeyen bir hata oluştu.",
        (Language::Tr, MessageId::InvalidCredentials) => "E-posta veya şifre hatalı.",
        (Language::Tr, MessageId::AccountExists) => "Bu e-posta adresi zaten kayıtlı.",
        (Language::Tr, MessageId::AccountDisabled) => "Hesabınız devre dışı bırakılmış.",
        (Language::En, MessageId::Network) => "Check your internet connection and try again.",
        (Language::En, MessageId::Timeout) => "The request timed out. Please try again.",
        (Language::En, MessageId::BadRequest) => "Please check the information you entered.",
        (Language::En, MessageId::SessionExpired) => {
            "Your session has expired. Please sign in again."
        }
        (Language::En, MessageId::Forbidden) => "You are not allowed to do this.",
        (Language::En, MessageId::NotFound) => "The requested record was not found.",
        (Language::En, MessageId::RateLimited) => "Too many requests. Please wait a moment.",
        (Language::En, MessageId::Server) => "A server error occurred. Please try again later.",
        (Language::En, MessageId::Generic) => "An unexpected error occurred.",
        (Language::En, MessageId::InvalidCredentials) => "Incorrect email or password.",
        (Language::En, MessageId::AccountExists) => "This email address is already registered.",
        (Language::En, MessageId::AccountDisabled) => "Your account has been disabled.",
    }
}
