//! One thin wrapper per API resource, reached through [`ApiClient`].

mod applications;
mod auth;
mod bills;
mod daily_reward;
mod events;
mod news;
mod rewards;
mod surveys;
mod users;

pub use applications::ApplicationsApi;
pub use auth::AuthApi;
pub use bills::BillsApi;
pub use daily_reward::DailyRewardApi;
pub use events::EventsApi;
pub use news::NewsApi;
pub use rewards::RewardsApi;
pub use surveys::SurveysApi;
pub use users::UsersApi;

use crate::api_client::{ApiClient, ApiRequest};
use crate::models::PageQuery;
use crate::validation::clamp_limit;

const DEFAULT_PAGE_LIMIT: u32 = 20;

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi { client: self }
    }

    pub fn events(&self) -> EventsApi<'_> {
        EventsApi { client: self }
    }

    pub fn applications(&self) -> ApplicationsApi<'_> {
        ApplicationsApi { client: self }
    }

    pub fn rewards(&self) -> RewardsApi<'_> {
        RewardsApi { client: self }
    }

    pub fn surveys(&self) -> SurveysApi<'_> {
        SurveysApi { client: self }
    }

    pub fn bills(&self) -> BillsApi<'_> {
        BillsApi { client: self }
    }

    pub fn news(&self) -> NewsApi<'_> {
        NewsApi { client: self }
    }

    pub fn daily_reward(&self) -> DailyRewardApi<'_> {
        DailyRewardApi { client: self }
    }
}

/// Attach `limit`/`offset`, clamping the limit to what the API accepts.
fn paged(request: ApiRequest, page: PageQuery) -> ApiRequest {
    request
        .query("limit", clamp_limit(page.limit, DEFAULT_PAGE_LIMIT))
        .query("offset", page.offset.unwrap_or(0))
}
