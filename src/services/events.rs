use super::paged;
use crate::api_client::{segment, ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{Event, EventFilter, EventRegistration, Page, PageQuery};
use serde_json::Value;

pub struct EventsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl EventsApi<'_> {
    pub async fn list(&self, filter: &EventFilter) -> Result<Page<Event>, ApiError> {
        let request = ApiRequest::get("/events")
            .query_opt("category", filter.category.as_deref())
            .query_opt("upcoming", filter.upcoming_only.then_some("true"));
        self.client
            .call("events.list", paged(request, filter.page))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Event, ApiError> {
        let request = ApiRequest::get(format!("/events/{}", segment(id)));
        self.client.call_resource("events.get", request, "event").await
    }

    pub async fn register(&self, id: &str) -> Result<EventRegistration, ApiError> {
        let request = ApiRequest::post(format!("/events/{}/register", segment(id)));
        self.client
            .call_resource("events.register", request, "registration")
            .await
    }

    pub async fn unregister(&self, id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::delete(format!("/events/{}/register", segment(id)));
        let _: Value = self.client.call("events.unregister", request).await?;
        Ok(())
    }

    pub async fn my_registrations(&self, page: PageQuery) -> Result<Page<EventRegistration>, ApiError> {
        let request = paged(ApiRequest::get("/events/my-registrations"), page);
        self.client.call("events.my_registrations", request).await
    }
}
