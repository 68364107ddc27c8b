use super::paged;
use crate::api_client::{segment, ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{News, NewsCategory, Page, PageQuery};

pub struct NewsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl NewsApi<'_> {
    pub async fn list(&self, category: Option<&str>, page: PageQuery) -> Result<Page<News>, ApiError> {
        let request = ApiRequest::get("/news").query_opt("category", category);
        self.client.call("news.list", paged(request, page)).await
    }

    pub async fn get(&self, id: &str) -> Result<News, ApiError> {
        let request = ApiRequest::get(format!("/news/{}", segment(id)));
        self.client.call_resource("news.get", request, "news").await
    }

    pub async fn categories(&self) -> Result<Vec<NewsCategory>, ApiError> {
        self.client
            .call_resource("news.categories", ApiRequest::get("/news/categories"), "categories")
            .await
    }
}
