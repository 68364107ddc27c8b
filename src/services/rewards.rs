use super::paged;
use crate::api_client::{segment, ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{Page, PageQuery, Reward, UserReward};

pub struct RewardsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl RewardsApi<'_> {
    pub async fn list(&self, category: Option<&str>, page: PageQuery) -> Result<Page<Reward>, ApiError> {
        let request = ApiRequest::get("/rewards").query_opt("category", category);
        self.client.call("rewards.list", paged(request, page)).await
    }

    pub async fn get(&self, id: &str) -> Result<Reward, ApiError> {
        let request = ApiRequest::get(format!("/rewards/{}", segment(id)));
        self.client.call_resource("rewards.get", request, "reward").await
    }

    /// Spend Gölbucks on a reward; the server deducts the balance.
    pub async fn redeem(&self, id: &str) -> Result<UserReward, ApiError> {
        let request = ApiRequest::post(format!("/rewards/{}/redeem", segment(id)));
        self.client
            .call_resource("rewards.redeem", request, "userReward")
            .await
    }

    pub async fn mine(&self, page: PageQuery) -> Result<Page<UserReward>, ApiError> {
        let request = paged(ApiRequest::get("/rewards/my"), page);
        self.client.call("rewards.mine", request).await
    }

    pub async fn mark_used(&self, user_reward_id: &str) -> Result<UserReward, ApiError> {
        let request = ApiRequest::put(format!("/rewards/my/{}/use", segment(user_reward_id)));
        self.client
            .call_resource("rewards.mark_used", request, "userReward")
            .await
    }
}
