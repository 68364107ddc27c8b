//! Typed shapes of the resources exchanged with the citizen-services API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The API sends ids as numbers on some resources and strings on others.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn opt_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Legacy screens read a `photos` list; newer records only carry `image_url`.
fn photos_from_image(photos: &mut Vec<String>, image_url: Option<&str>) {
    if photos.is_empty() {
        if let Some(url) = image_url.filter(|u| !u.is_empty()) {
            photos.push(url.to_string());
        }
    }
}

// ── Auth & users ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "golbucks_balance")]
    pub golbucks: i64,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GolbucksBalance {
    #[serde(alias = "golbucks")]
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earn,
    Spend,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GolbucksTransaction {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub amount: i64,
    #[serde(rename = "type", alias = "kind")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ── Pagination ──────────────────────────────────────────────────────

/// One page of a list endpoint: `{ <items>: [...], total, limit, offset }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(
        alias = "events",
        alias = "registrations",
        alias = "applications",
        alias = "rewards",
        alias = "surveys",
        alias = "bill_supports",
        alias = "billSupports",
        alias = "news",
        alias = "categories",
        alias = "transactions"
    )]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        u64::from(self.offset) + (self.items.len() as u64) < self.total
    }

    pub(crate) fn map_items(mut self, f: impl FnMut(&mut T)) -> Self {
        self.items.iter_mut().for_each(f);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageQuery {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}

// ── Events ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Event {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "date", alias = "start_date")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "end_date")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub registered_count: u32,
    #[serde(default)]
    pub golbucks_reward: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_registered: bool,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.registered_count >= cap)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub category: Option<String>,
    pub upcoming_only: bool,
    pub page: PageQuery,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventRegistration {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event: Option<Event>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub registered_at: Option<DateTime<Utc>>,
}

// ── Applications (citizen complaints / requests) ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl ApplicationStatus {
    /// Wire value used in list filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplicationComment {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Application {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub comments: Vec<ApplicationComment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Application {
    pub(crate) fn normalize(&mut self) {
        photos_from_image(&mut self.photos, self.image_url.as_deref());
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub category: Option<String>,
    pub page: PageQuery,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub title: String,
    pub description: String,
    pub category: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image: Option<crate::upload::ImageUpload>,
}

// ── Rewards marketplace ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Reward {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "cost", alias = "golbucks_cost")]
    pub price: i64,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub partner: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Reward {
    pub fn affordable_with(&self, balance: i64) -> bool {
        self.price <= balance && self.stock != Some(0)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserReward {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub reward: Option<Reward>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub redeemed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
}

// ── Surveys ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    Text,
    Rating,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurveyQuestion {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(alias = "question")]
    pub text: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Survey {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub golbucks_reward: i64,
    #[serde(default)]
    pub questions: Vec<SurveyQuestion>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyAnswer {
    pub question_id: String,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurveyResult {
    #[serde(default)]
    pub golbucks_earned: i64,
    #[serde(default)]
    pub new_balance: Option<i64>,
}

// ── Bill supports (donations toward a neighbour's bill) ─────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillSupport {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bill_type: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub collected_amount: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub supporters_count: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl BillSupport {
    pub(crate) fn normalize(&mut self) {
        photos_from_image(&mut self.photos, self.image_url.as_deref());
    }

    pub fn remaining(&self) -> f64 {
        (self.amount - self.collected_amount).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct NewBillSupport {
    pub title: String,
    pub description: String,
    pub bill_type: String,
    pub amount: f64,
    pub image: Option<crate::upload::ImageUpload>,
}

// ── News ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct News {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewsCategory {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

// ── Daily reward ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DailyRewardStatus {
    pub can_claim: bool,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub reward_amount: i64,
    #[serde(default)]
    pub last_claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_claim_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DailyRewardClaim {
    pub amount: i64,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub new_balance: Option<i64>,
    #[serde(default)]
    pub claimed_on: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let a: User = serde_json::from_value(json!({ "id": 7, "email": "a@b.com" })).unwrap();
        let b: User = serde_json::from_value(json!({ "id": "u-7", "email": "a@b.com" })).unwrap();
        assert_eq!(a.id, "7");
        assert_eq!(b.id, "u-7");
    }

    #[test]
    fn page_items_come_from_resource_key() {
        let page: Page<News> = serde_json::from_value(json!({
            "news": [{ "id": 1, "title": "Yol çalışması" }],
            "total": 3,
            "limit": 1,
            "offset": 0
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more());
    }

    #[test]
    fn application_photos_derived_from_image_url() {
        let mut app: Application = serde_json::from_value(json!({
            "id": 3,
            "title": "Çukur",
            "status": "in_progress",
            "image_url": "https://cdn.example.com/a.jpg"
        }))
        .unwrap();
        app.normalize();
        assert_eq!(app.status, ApplicationStatus::InProgress);
        assert_eq!(app.photos, vec!["https://cdn.example.com/a.jpg".to_string()]);
    }

    #[test]
    fn existing_photos_are_kept() {
        let mut bill: BillSupport = serde_json::from_value(json!({
            "id": 1,
            "title": "Elektrik",
            "amount": 400.0,
            "collected_amount": 150.0,
            "image_url": "x.jpg",
            "photos": ["a.jpg", "b.jpg"]
        }))
        .unwrap();
        bill.normalize();
        assert_eq!(bill.photos.len(), 2);
        assert_eq!(bill.remaining(), 250.0);
    }

    #[test]
    fn unknown_enum_values_do_not_fail() {
        let app: Application = serde_json::from_value(json!({
            "id": 1, "title": "t", "status": "archived"
        }))
        .unwrap();
        assert_eq!(app.status, ApplicationStatus::Unknown);
    }

    #[test]
    fn auth_tokens_use_camel_case() {
        let session: AuthSession = serde_json::from_value(json!({
            "user": { "id": 1, "email": "a@b.com" },
            "tokens": { "accessToken": "t1", "refreshToken": "r1" }
        }))
        .unwrap();
        assert_eq!(session.tokens.access_token, "t1");
        assert_eq!(session.tokens.refresh_token, "r1");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user: User = serde_json::from_value(json!({ "id": 1, "email": "a@b.com" })).unwrap();
        assert_eq!(user.display_name(), "a@b.com");
        let user: User = serde_json::from_value(json!({
            "id": 1, "email": "a@b.com", "first_name": "Ayşe", "last_name": "Yılmaz"
        }))
        .unwrap();
        assert_eq!(user.display_name(), "Ayşe Yılmaz");
    }

    #[test]
    fn reward_affordability() {
        let reward: Reward = serde_json::from_value(json!({
            "id": 1, "title": "Kahve", "cost": 50, "stock": 0
        }))
        .unwrap();
        assert!(!reward.affordable_with(100));
    }
}
