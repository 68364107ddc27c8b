use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorEnvelope};
use crate::preferences::Preferences;
use crate::token_refresh::{RefreshCoordinator, RefreshOutcome};
use crate::token_store::TokenStore;
use crate::upload::MultipartForm;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone)]
enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// A request against the API, relative to the configured base URL.
///
/// Requests are plain data so the pipeline can send the same one twice
/// (once more after a token refresh).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    refresh_on_401: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            refresh_on_401: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// A 401 on this request means bad credentials (login, register), not an
    /// expired access token, so no refresh is attempted.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_401 = false;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

enum Attempt {
    Data(Value),
    Unauthorized(ApiError),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// HTTP client for the citizen-services API.
///
/// Attaches the stored bearer token, unwraps the `{ success, data }`
/// envelope, and on a 401 refreshes the access token once (shared by every
/// request that fails meanwhile) before retrying.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    refresh: RefreshCoordinator,
    preferences: Option<Arc<Preferences>>,
    production: bool,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ApiError::unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
            tokens,
            refresh: RefreshCoordinator::new(),
            preferences: None,
            production: config.production,
        })
    }

    pub fn with_preferences(mut self, preferences: Arc<Preferences>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn preferences(&self) -> Option<&Preferences> {
        self.preferences.as_deref()
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send `request` and decode the envelope's `data` as `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let data = self.send_value(request).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Send `request` and return the envelope's `data` untyped.
    pub async fn send_value(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut token = self.tokens.access_token();
        let result = self.send_with_recovery(&request, token.as_deref()).await;
        if let Some(t) = token.as_mut() {
            t.zeroize();
        }
        result
    }

    async fn send_with_recovery(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        match self.dispatch(request, token).await? {
            Attempt::Data(data) => Ok(data),
            Attempt::Unauthorized(err) if !request.refresh_on_401 => Err(err),
            Attempt::Unauthorized(_) => {
                let mut fresh = self.recover_token(token).await?;
                let retried = self.dispatch(request, Some(&fresh)).await;
                fresh.zeroize();
                match retried? {
                    Attempt::Data(data) => Ok(data),
                    // Already retried once; a second 401 is final.
                    Attempt::Unauthorized(err) => Err(err),
                }
            }
        }
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Attempt, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(form) => builder.multipart(form.build()?),
        };

        debug!(method = %request.method, path = %request.path, "Dispatching request");
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            debug!(path = %request.path, "Request unauthorized");
            return Ok(Attempt::Unauthorized(error_from_body(status.as_u16(), &body)));
        }
        unwrap_envelope(status.as_u16(), &body).map(Attempt::Data)
    }

    /// Produce an access token to retry with after a 401 on `stale`.
    async fn recover_token(&self, stale: Option<&str>) -> RefreshOutcome {
        // Checked under the coordinator's lock: a refresh that settled after
        // this request left has already stored its token.
        let rotated = || {
            self.tokens
                .access_token()
                .filter(|current| Some(current.as_str()) != stale)
        };
        self.refresh
            .run_or_reuse(rotated, || self.refresh_access_token())
            .await
    }

    async fn refresh_access_token(&self) -> RefreshOutcome {
        let Some(mut refresh_token) = self.tokens.refresh_token() else {
            warn!("Access token rejected and no refresh token stored; clearing session");
            self.tokens.clear_tokens();
            return Err(ApiError::auth("Session expired: no refresh token available"));
        };

        info!("Access token rejected; refreshing");
        let result = self.request_refresh(&refresh_token).await;
        refresh_token.zeroize();

        let access = match result {
            Ok(access) => access,
            Err(e) => {
                warn!("Token refresh failed: {e}");
                self.tokens.clear_tokens();
                return Err(refresh_failure(e));
            }
        };

        if let Err(e) = self.tokens.update_access_token(&access) {
            warn!("Failed to store refreshed access token: {e}");
            self.tokens.clear_tokens();
            return Err(ApiError::auth(format!("Failed to store refreshed token: {e}")));
        }
        info!("Access token refreshed");
        Ok(access)
    }

    /// Refresh call sent straight through the HTTP client: no bearer header
    /// and no 401 recovery of its own.
    async fn request_refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let data = unwrap_envelope(status, &body)?;
        let parsed: RefreshResponse = serde_json::from_value(data)?;
        Ok(parsed.access_token)
    }

    pub(crate) fn log_failure(&self, operation: &str, err: &ApiError) {
        if !self.production {
            warn!(operation, kind = ?err.kind(), status = ?err.status(), "API call failed: {err}");
        }
    }

    /// Send and decode, logging failures under `operation`.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        self.send(request)
            .await
            .inspect_err(|e| self.log_failure(operation, e))
    }

    /// Like [`ApiClient::call`] for endpoints that wrap their payload as `{ key: T }`.
    pub(crate) async fn call_resource<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: ApiRequest,
        key: &str,
    ) -> Result<T, ApiError> {
        let result = match self.send_value(request).await {
            Ok(data) => unwrap_resource(data, key),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| self.log_failure(operation, e))
    }
}

fn error_from_body(status: u16, body: &str) -> ApiError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    ApiError::from_status(status, envelope)
}

/// Turn a raw response into the envelope's `data`, or a normalized error.
pub fn unwrap_envelope(status: u16, body: &str) -> Result<Value, ApiError> {
    if !(200..300).contains(&status) {
        return Err(error_from_body(status, body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let parsed: Value = serde_json::from_str(body).map_err(|_| ApiError::Unknown {
        status: Some(status),
        message: "Server returned a non-JSON response".to_string(),
    })?;

    match parsed {
        Value::Object(mut obj) if obj.contains_key("success") => {
            if obj.get("success").and_then(Value::as_bool) == Some(true) {
                return Ok(obj.remove("data").unwrap_or(Value::Null));
            }
            let envelope: ErrorEnvelope =
                serde_json::from_value(Value::Object(obj)).unwrap_or_default();
            Err(ApiError::Unknown {
                status: Some(status),
                message: envelope
                    .best_message()
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            })
        }
        // Not enveloped; hand it back as-is.
        other => Ok(other),
    }
}

/// Accept either `{ key: T }` or a bare `T`.
pub fn unwrap_resource<T: DeserializeOwned>(mut data: Value, key: &str) -> Result<T, ApiError> {
    if let Value::Object(obj) = &mut data {
        if let Some(inner) = obj.remove(key) {
            return Ok(serde_json::from_value(inner)?);
        }
    }
    Ok(serde_json::from_value(data)?)
}

/// Connectivity failures keep their kind; anything else from the refresh
/// endpoint means the session cannot be recovered.
fn refresh_failure(err: ApiError) -> ApiError {
    match err {
        ApiError::Network { .. } | ApiError::Timeout { .. } | ApiError::Auth { .. } => err,
        other => ApiError::Auth {
            status: other.status(),
            message: format!("Token refresh failed: {}", other.message()),
        },
    }
}

/// Percent-encode one path segment.
pub(crate) fn segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(HEX_UPPER[(b >> 4) as usize] as char);
                out.push(HEX_UPPER[(b & 0xf) as usize] as char);
            }
        }
    }
    out
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";
