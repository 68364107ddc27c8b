mod support;

use golbucks_client::models::{ApplicationStatus, EventFilter, NewApplication, PageQuery};
use golbucks_client::{ErrorKind, ImageUpload, ProgressFn};
use std::sync::{Arc, Mutex};
use support::{Harness, MockApi};

fn signed_in(api: &MockApi) -> Harness {
    let harness = Harness::new(&api.base_url);
    harness.sign_in_as("t1", "r1");
    api.state.accept_token(Some("t1"));
    harness
}

#[tokio::test]
async fn me_unwraps_user_resource() {
    let api = MockApi::start().await;
    let harness = signed_in(&api);

    let user = harness.client.auth().me().await.unwrap();
    assert_eq!(user.id, "1");
    assert_eq!(user.golbucks, 40);
}

#[tokio::test]
async fn balance_accepts_golbucks_key() {
    let api = MockApi::start().await;
    let harness = signed_in(&api);

    let balance = harness.client.users().golbucks().await.unwrap();
    assert_eq!(balance.balance, 120);
}

#[tokio::test]
async fn event_list_sends_clamped_paging() {
    let api = MockApi::start().await;
    let harness = signed_in(&api);

    let filter = EventFilter {
        category: Some("çevre".into()),
        upcoming_only: true,
        page: PageQuery::new(500, 2),
    };
    let page = harness.client.events().list(&filter).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.limit, 100);
    assert_eq!(page.offset, 2);
    assert!(page.has_more());
    assert!(page.items[0].is_full());
    assert_eq!(page.items[0].category.as_deref(), Some("çevre"));
}

#[tokio::test]
async fn application_upload_reports_progress() {
    let api = MockApi::start().await;
    let harness = signed_in(&api);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));
    let photo = vec![0xAB_u8; 100 * 1024];

    let created = harness
        .client
        .applications()
        .create(
            &NewApplication {
                title: "Kaldırımda çukur".into(),
                description: "Okul önündeki kaldırım çökmüş".into(),
                category: "altyapi".into(),
                address: Some("Atatürk Cd. 12".into()),
                latitude: Some(39.93),
                longitude: None,
                image: Some(ImageUpload::new("cukur.jpg", "image/jpeg", photo)),
            },
            Some(progress),
        )
        .await
        .unwrap();

    assert_eq!(created.id, "77");
    assert_eq!(created.title, "Kaldırımda çukur");
    assert_eq!(created.status, ApplicationStatus::Pending);
    assert_eq!(created.photos, vec!["https://cdn.example.com/77.jpg".to_string()]);

    assert_eq!(api.state.upload_bytes(), 100 * 1024);
    let fields = api.state.upload_fields();
    assert!(fields.contains(&"image".to_string()));
    assert!(fields.contains(&"latitude".to_string()));
    assert!(!fields.contains(&"longitude".to_string()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn oversized_upload_is_rejected_locally() {
    let api = MockApi::start().await;
    let harness = signed_in(&api);

    let err = harness
        .client
        .applications()
        .create(
            &NewApplication {
                title: "Büyük dosya".into(),
                description: "Fotoğraf".into(),
                category: "diger".into(),
                address: None,
                latitude: None,
                longitude: None,
                image: Some(ImageUpload::new(
                    "big.png",
                    "image/png",
                    vec![0u8; 10 * 1024 * 1024 + 1],
                )),
            },
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(api.state.upload_fields().is_empty());
}

#[tokio::test]
async fn news_categories_accept_bare_array() {
    let api = MockApi::start().await;
    let harness = Harness::new(&api.base_url);

    let categories = harness.client.news().categories().await.unwrap();
    let ids: Vec<_> = categories.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["1", "kultur"]);
}

#[tokio::test]
async fn daily_claim_is_remembered_locally() {
    let api = MockApi::start().await;
    let harness = signed_in(&api);
    let today = chrono::Local::now().date_naive();

    let daily = harness.client.daily_reward();
    assert!(!daily.claimed_today(today));
    let claim = daily.claim().await.unwrap();

    assert_eq!(claim.amount, 5);
    assert_eq!(claim.new_balance, Some(125));
    assert!(daily.claimed_today(today));
    assert_eq!(harness.preferences.last_daily_claim(), Some(today));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let api = MockApi::start().await;
    let harness = signed_in(&api);
    harness.client.users().golbucks().await.unwrap();

    harness.client.auth().logout();
    harness.client.auth().logout();

    assert!(!harness.client.tokens().is_authenticated());
    assert!(harness.preferences.user().is_none());
}
