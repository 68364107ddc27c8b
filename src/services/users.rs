use super::paged;
use crate::api_client::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{GolbucksBalance, GolbucksTransaction, Page, PageQuery, ProfileUpdate, User};
use tracing::warn;

pub struct UsersApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl UsersApi<'_> {
    pub async fn profile(&self) -> Result<User, ApiError> {
        self.client
            .call_resource("users.profile", ApiRequest::get("/users/profile"), "user")
            .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let request = ApiRequest::put("/users/profile").json(serde_json::to_value(update)?);
        let user: User = self
            .client
            .call_resource("users.update_profile", request, "user")
            .await?;

        if let Some(prefs) = self.client.preferences() {
            if let Err(e) = prefs.set_user(&user) {
                warn!("Failed to refresh user snapshot: {e}");
            }
        }
        Ok(user)
    }

    pub async fn golbucks(&self) -> Result<GolbucksBalance, ApiError> {
        self.client
            .call("users.golbucks", ApiRequest::get("/users/golbucks"))
            .await
    }

    pub async fn transactions(&self, page: PageQuery) -> Result<Page<GolbucksTransaction>, ApiError> {
        let request = paged(ApiRequest::get("/users/golbucks/transactions"), page);
        self.client.call("users.transactions", request).await
    }
}
