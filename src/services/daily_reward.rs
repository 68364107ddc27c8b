use crate::api_client::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{DailyRewardClaim, DailyRewardStatus};
use chrono::{Local, NaiveDate};
use tracing::warn;

pub struct DailyRewardApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl DailyRewardApi<'_> {
    /// Claim today's Gölbucks and remember the claim date locally.
    pub async fn claim(&self) -> Result<DailyRewardClaim, ApiError> {
        let claim: DailyRewardClaim = self
            .client
            .call("daily_reward.claim", ApiRequest::post("/daily-reward/claim"))
            .await?;

        if let Some(prefs) = self.client.preferences() {
            let day = claim.claimed_on.unwrap_or_else(|| Local::now().date_naive());
            if let Err(e) = prefs.set_last_daily_claim(day) {
                warn!("Failed to record daily reward claim: {e}");
            }
        }
        Ok(claim)
    }

    pub async fn status(&self) -> Result<DailyRewardStatus, ApiError> {
        self.client
            .call("daily_reward.status", ApiRequest::get("/daily-reward/status"))
            .await
    }

    /// Local check against the last recorded claim; no network call.
    pub fn claimed_today(&self, today: NaiveDate) -> bool {
        self.client
            .preferences()
            .and_then(|p| p.last_daily_claim())
            .is_some_and(|last| last >= today)
    }
}
