use super::paged;
use crate::api_client::{segment, ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{
    Application, ApplicationComment, ApplicationFilter, ApplicationStatus, NewApplication, Page,
};
use crate::upload::{MultipartForm, ProgressFn};
use serde_json::json;

pub struct ApplicationsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl ApplicationsApi<'_> {
    /// File a new complaint or request. The optional photo is sent as the
    /// `image` field of a multipart body.
    pub async fn create(
        &self,
        new: &NewApplication,
        progress: Option<ProgressFn>,
    ) -> Result<Application, ApiError> {
        if new.title.trim().is_empty() {
            return Err(ApiError::invalid_input("title", "Title is required"));
        }
        if new.description.trim().is_empty() {
            return Err(ApiError::invalid_input("description", "Description is required"));
        }

        let mut form = MultipartForm::new()
            .text("title", new.title.trim())
            .text("description", new.description.trim())
            .text("category", &new.category)
            .text_opt("address", new.address.as_deref())
            .text_opt("latitude", new.latitude)
            .text_opt("longitude", new.longitude)
            .on_progress(progress);
        if let Some(image) = &new.image {
            image.validate()?;
            form = form.image(image.clone());
        }

        let request = ApiRequest::post("/applications").multipart(form);
        let mut created: Application = self
            .client
            .call_resource("applications.create", request, "application")
            .await?;
        created.normalize();
        Ok(created)
    }

    pub async fn list(&self, filter: &ApplicationFilter) -> Result<Page<Application>, ApiError> {
        let request = ApiRequest::get("/applications")
            .query_opt("status", filter.status.map(ApplicationStatus::as_str))
            .query_opt("category", filter.category.as_deref());
        let page: Page<Application> = self
            .client
            .call("applications.list", paged(request, filter.page))
            .await?;
        Ok(page.map_items(Application::normalize))
    }

    pub async fn get(&self, id: &str) -> Result<Application, ApiError> {
        let request = ApiRequest::get(format!("/applications/{}", segment(id)));
        let mut application: Application = self
            .client
            .call_resource("applications.get", request, "application")
            .await?;
        application.normalize();
        Ok(application)
    }

    pub async fn comment(&self, id: &str, content: &str) -> Result<ApplicationComment, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::invalid_input("content", "Comment cannot be empty"));
        }
        let request = ApiRequest::post(format!("/applications/{}/comment", segment(id)))
            .json(json!({ "content": content }));
        self.client
            .call_resource("applications.comment", request, "comment")
            .await
    }
}
