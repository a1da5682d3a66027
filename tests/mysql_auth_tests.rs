//! Auth and location handlers against a real MySQL. Runs when
//! `TEST_DATABASE_URL` is set; skipped otherwise.

mod common;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use async_trait::async_trait;
use common::{at, bearer};
use gym_attendance::api::location;
use gym_attendance::auth::handlers;
use gym_attendance::auth::otp::OtpStore;
use gym_attendance::auth::password::hash_password;
use gym_attendance::clock::ManualClock;
use gym_attendance::config::Config;
use gym_attendance::db::init_db;
use gym_attendance::model::role::Roles;
use gym_attendance::notify::Notifier;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::sync::{Arc, Mutex};

/// Keeps every OTP it is asked to deliver.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn codes_for(&self, email: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_otp(&self, email: &str, code: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((email.to_string(), code.to_string()));
        Ok(())
    }
}

struct Fixture {
    pool: MySqlPool,
    config: Config,
    otp: OtpStore,
    notifier: Arc<RecordingNotifier>,
    gym_id: u64,
    tag: String,
}

async fn fixture() -> Option<Fixture> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = init_db(&url).await.unwrap();
    let config = Config::test_default();
    let otp = OtpStore::new(Arc::new(ManualClock::new(at(9, 0))), config.otp_ttl());

    let tag = uuid::Uuid::new_v4().to_simple().to_string()[..8].to_uppercase();
    let gym_id = sqlx::query("INSERT INTO gym (gym_code, gym_name) VALUES (?, 'Auth test gym')")
        .bind(&tag)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_id();

    Some(Fixture {
        pool,
        config,
        otp,
        notifier: Arc::new(RecordingNotifier::default()),
        gym_id,
        tag: tag.to_lowercase(),
    })
}

macro_rules! auth_app {
    ($f:expr) => {{
        let notifier: Arc<dyn Notifier> = $f.notifier.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new($f.pool.clone()))
                .app_data(web::Data::new($f.config.clone()))
                .app_data(web::Data::new($f.otp.clone()))
                .app_data(web::Data::from(notifier))
                .route("/auth/register", web::post().to(handlers::register))
                .route("/auth/verify-otp", web::post().to(handlers::verify_otp))
                .route("/auth/login", web::post().to(handlers::login))
                .route("/state-country", web::post().to(location::create_state_country))
                .route("/pincodes", web::post().to(location::create_pincode)),
        )
        .await
    }};
}

fn registration(f: &Fixture, email: &str) -> Value {
    json!({
        "email": email,
        "password": "s3cret-pass",
        "full_name": "Auth Test",
        "gym_id": f.gym_id,
        "pincode": "560001"
    })
}

#[actix_web::test]
async fn wrong_otp_is_refused_and_a_new_one_sent() {
    let Some(f) = fixture().await else {
        return;
    };
    let email = format!("otp-{}@example.com", f.tag);
    let app = auth_app!(f);

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(registration(&f, &email))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let issued = f.notifier.codes_for(&email);
    assert_eq!(issued.len(), 1);

    let wrong = if issued[0] == "000000" { "111111" } else { "000000" };
    let req = test::TestRequest::post()
        .uri("/auth/verify-otp")
        .set_json(json!({ "email": email, "otp": wrong }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");

    let issued = f.notifier.codes_for(&email);
    assert_eq!(issued.len(), 2);

    let req = test::TestRequest::post()
        .uri("/auth/verify-otp")
        .set_json(json!({ "email": email, "otp": issued[1] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn unverified_login_resends_otp() {
    let Some(f) = fixture().await else {
        return;
    };
    let email = format!("unverified-{}@example.com", f.tag);
    let app = auth_app!(f);

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(registration(&f, &email))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": email, "password": "s3cret-pass" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(f.notifier.codes_for(&email).len(), 2);
}

#[actix_web::test]
async fn deactivated_account_cannot_log_in() {
    let Some(f) = fixture().await else {
        return;
    };
    let email = format!("inactive-{}@example.com", f.tag);
    let hashed = hash_password("s3cret-pass").unwrap();
    let user_id = sqlx::query(
        "INSERT INTO users (gym_id, email, password, full_name, pincode, is_verified, is_active) \
         VALUES (?, ?, ?, 'Inactive', '560001', TRUE, FALSE)",
    )
    .bind(f.gym_id)
    .bind(&email)
    .bind(&hashed)
    .execute(&f.pool)
    .await
    .unwrap()
    .last_insert_id();
    let app = auth_app!(f);

    let login = json!({ "email": email, "password": "s3cret-pass" });
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(&login)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(f.notifier.codes_for(&email).is_empty());

    // same credentials work once the account is active again
    sqlx::query("UPDATE users SET is_active = TRUE WHERE id = ?")
        .bind(user_id)
        .execute(&f.pool)
        .await
        .unwrap();
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(&login)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["access_token"].is_string());
}

#[actix_web::test]
async fn duplicate_state_country_is_a_conflict() {
    let Some(f) = fixture().await else {
        return;
    };
    let owner = bearer(&f.config, 1, Roles::owner());
    let app = auth_app!(f);

    let pair = json!({ "state_name": format!("State {}", f.tag), "country_name": "India" });
    let req = test::TestRequest::post()
        .uri("/state-country")
        .insert_header(owner.clone())
        .set_json(&pair)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/state-country")
        .insert_header(owner)
        .set_json(&pair)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "conflict");
}

#[actix_web::test]
async fn pincode_needs_an_existing_state_country() {
    let Some(f) = fixture().await else {
        return;
    };
    let owner = bearer(&f.config, 1, Roles::owner());
    let member = bearer(&f.config, 7, Roles::member());
    let app = auth_app!(f);

    let payload = json!({ "pincode": "560001", "state_country_id": u64::MAX });
    let req = test::TestRequest::post()
        .uri("/pincodes")
        .insert_header(member)
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/pincodes")
        .insert_header(owner)
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
