use super::paged;
use crate::api_client::{segment, ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{BillSupport, NewBillSupport, Page, PageQuery};
use crate::upload::{MultipartForm, ProgressFn};
use serde_json::json;

pub struct BillsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl BillsApi<'_> {
    /// Ask neighbours for help with a bill. A photo of the bill goes in the
    /// `image` field of a multipart body.
    pub async fn create(
        &self,
        new: &NewBillSupport,
        progress: Option<ProgressFn>,
    ) -> Result<BillSupport, ApiError> {
        if new.title.trim().is_empty() {
            return Err(ApiError::invalid_input("title", "Title is required"));
        }
        if !(new.amount.is_finite() && new.amount > 0.0) {
            return Err(ApiError::invalid_input("amount", "Amount must be positive"));
        }

        let mut form = MultipartForm::new()
            .text("title", new.title.trim())
            .text("description", new.description.trim())
            .text("bill_type", &new.bill_type)
            .text("amount", new.amount)
            .on_progress(progress);
        if let Some(image) = &new.image {
            image.validate()?;
            form = form.image(image.clone());
        }

        let request = ApiRequest::post("/bill-supports").multipart(form);
        let mut created: BillSupport = self
            .client
            .call_resource("bills.create", request, "billSupport")
            .await?;
        created.normalize();
        Ok(created)
    }

    /// The signed-in citizen's own requests.
    pub async fn mine(&self, page: PageQuery) -> Result<Page<BillSupport>, ApiError> {
        let request = paged(ApiRequest::get("/bill-supports"), page);
        let page: Page<BillSupport> = self.client.call("bills.mine", request).await?;
        Ok(page.map_items(BillSupport::normalize))
    }

    pub async fn get(&self, id: &str) -> Result<BillSupport, ApiError> {
        let request = ApiRequest::get(format!("/bill-supports/{}", segment(id)));
        let mut bill: BillSupport = self
            .client
            .call_resource("bills.get", request, "billSupport")
            .await?;
        bill.normalize();
        Ok(bill)
    }

    pub async fn support(&self, id: &str, amount: f64) -> Result<BillSupport, ApiError> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(ApiError::invalid_input("amount", "Amount must be positive"));
        }
        let request = ApiRequest::post(format!("/bill-supports/{}/support", segment(id)))
            .json(json!({ "amount": amount }));
        let mut bill: BillSupport = self
            .client
            .call_resource("bills.support", request, "billSupport")
            .await?;
        bill.normalize();
        Ok(bill)
    }

    /// Open requests from everyone, available without signing in.
    pub async fn public(&self, page: PageQuery) -> Result<Page<BillSupport>, ApiError> {
        let request = paged(ApiRequest::get("/bill-supports/public"), page);
        let page: Page<BillSupport> = self.client.call("bills.public", request).await?;
        Ok(page.map_items(BillSupport::normalize))
    }
}
