use crate::api_client::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{AuthSession, LoginInput, RegisterInput, User};
use crate::token_store::TokenPair;
use crate::validation::{validate_email, validate_password};
use serde_json::json;
use tracing::{info, warn};

pub struct AuthApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl AuthApi<'_> {
    pub async fn register(&self, input: &RegisterInput) -> Result<User, ApiError> {
        validate_email(&input.email).map_err(|e| ApiError::invalid_input("email", e))?;
        validate_password(&input.password).map_err(|e| ApiError::invalid_input("password", e))?;
        if input.first_name.trim().is_empty() {
            return Err(ApiError::invalid_input("first_name", "First name is required"));
        }

        let request = ApiRequest::post("/auth/register")
            .json(serde_json::to_value(input)?)
            .without_refresh();
        let session: AuthSession = self.client.call("auth.register", request).await?;
        self.start_session(session)
    }

    pub async fn login(&self, input: &LoginInput) -> Result<User, ApiError> {
        validate_email(&input.email).map_err(|e| ApiError::invalid_input("email", e))?;
        if input.password.is_empty() {
            return Err(ApiError::invalid_input("password", "Password is required"));
        }

        let request = ApiRequest::post("/auth/login")
            .json(json!({ "email": input.email.trim(), "password": input.password }))
            .without_refresh();
        let session: AuthSession = self.client.call("auth.login", request).await?;
        self.start_session(session)
    }

    fn start_session(&self, session: AuthSession) -> Result<User, ApiError> {
        let AuthSession { user, tokens } = session;
        let pair = TokenPair {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
        };
        if let Err(e) = self.client.tokens().set_tokens(&pair) {
            let err = ApiError::from(e);
            self.client.log_failure("auth.store_tokens", &err);
            return Err(err);
        }

        if let Some(prefs) = self.client.preferences() {
            if let Err(e) = prefs.set_user(&user) {
                warn!("Failed to save user snapshot: {e}");
            }
        }
        info!(user = %user.id, "Signed in");
        Ok(user)
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.client
            .call_resource("auth.me", ApiRequest::get("/auth/me"), "user")
            .await
    }

    /// Forget the local session. Never fails and never touches the network;
    /// calling it twice is harmless.
    pub fn logout(&self) {
        self.client.tokens().clear_tokens();
        if let Some(prefs) = self.client.preferences() {
            if let Err(e) = prefs.clear_user() {
                warn!("Failed to clear user snapshot: {e}");
            }
        }
        info!("Signed out");
    }
}
