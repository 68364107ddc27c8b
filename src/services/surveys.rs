use super::paged;
use crate::api_client::{segment, ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{Page, PageQuery, Survey, SurveyAnswer, SurveyResult};
use serde_json::json;

pub struct SurveysApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl SurveysApi<'_> {
    pub async fn list(&self, page: PageQuery) -> Result<Page<Survey>, ApiError> {
        let request = paged(ApiRequest::get("/surveys"), page);
        self.client.call("surveys.list", request).await
    }

    pub async fn get(&self, id: &str) -> Result<Survey, ApiError> {
        let request = ApiRequest::get(format!("/surveys/{}", segment(id)));
        self.client.call_resource("surveys.get", request, "survey").await
    }

    pub async fn submit(&self, id: &str, answers: &[SurveyAnswer]) -> Result<SurveyResult, ApiError> {
        if answers.is_empty() {
            return Err(ApiError::invalid_input("answers", "At least one answer is required"));
        }
        let request = ApiRequest::post(format!("/surveys/{}/submit", segment(id)))
            .json(json!({ "answers": answers }));
        self.client.call("surveys.submit", request).await
    }
}
