//! HTTP checks for the routes that need no database.

use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::http::StatusCode;
use actix_web::{App, test, web::Data};
use hrm_payroll::config::Config;
use hrm_payroll::models::{Claims, TokenType};
use hrm_payroll::routes;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

const SECRET: &str = "test-secret";
const PEER: &str = "127.0.0.1:40000";

fn config() -> Config {
    Config {
        database_url: "mysql://unused".into(),
        jwt_secret: SECRET.into(),
        server_addr: "127.0.0.1:0".into(),
        api_prefix: "/api".into(),
        rate_protected_per_min: 1000,
        rate_preview_per_min: 1000,
        summary_cache_capacity: 100,
        summary_cache_ttl_secs: 60,
        summary_warmup_cycles: 0,
        log_dir: "logs".into(),
    }
}

fn bearer(role: u8, token_type: TokenType) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as usize;
    let claims = Claims {
        user_id: 42,
        sub: "hr.anita".into(),
        role,
        exp: now + 600,
        jti: "test-jti".into(),
        token_type,
        employee_id: None,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

fn hr() -> String {
    bearer(2, TokenType::Access)
}

macro_rules! app {
    () => {{
        let cfg = config();
        test::init_service(
            App::new()
                .app_data(Data::new(cfg.clone()))
                .configure(move |c| routes::configure(c, cfg.clone())),
        )
        .await
    }};
}

#[actix_web::test]
async fn preview_breaks_down_numeric_ctc() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/compensation/preview")
        .peer_addr(PEER.parse().unwrap())
        .insert_header(("Authorization", hr()))
        .set_json(json!({"gross_ctc": 15000}))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["consolidated_salary"], 12757);
    assert_eq!(body["basic"], 6379);
    assert_eq!(body["hra"], 2552);
    assert_eq!(body["balancing_allowance"], 1226);
    assert_eq!(body["negative_balancing"], false);
}

#[actix_web::test]
async fn preview_accepts_numeric_strings() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/compensation/preview")
        .peer_addr(PEER.parse().unwrap())
        .insert_header(("Authorization", hr()))
        .set_json(json!({"gross_ctc": "120000"}))
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["basic"], 15000);
    assert_eq!(body["hra"], 6000);
}

#[actix_web::test]
async fn preview_errors_map_to_bad_request() {
    let app = app!();
    for (ctc, kind) in [
        (json!(34298.5), "AmbiguousBracket"),
        (json!(0), "InvalidInput"),
        (json!("abc"), "InvalidInput"),
        (json!(null), "InvalidInput"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/compensation/preview")
            .peer_addr(PEER.parse().unwrap())
            .insert_header(("Authorization", hr()))
            .set_json(json!({"gross_ctc": ctc}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "ctc {ctc}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], kind, "ctc {ctc}");
    }
}

#[actix_web::test]
async fn protected_routes_need_an_access_token() {
    let app = app!();

    let req = test::TestRequest::get()
        .uri("/api/cycle?date=2024-03-21")
        .peer_addr(PEER.parse().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/cycle?date=2024-03-21")
        .peer_addr(PEER.parse().unwrap())
        .insert_header(("Authorization", bearer(2, TokenType::Refresh)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn cycle_endpoint_reports_window() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/api/cycle?date=2024-12-25")
        .peer_addr(PEER.parse().unwrap())
        .insert_header(("Authorization", bearer(3, TokenType::Access)))
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["year"], 2025);
    assert_eq!(body["month"], 1);
    assert_eq!(body["label"], "2025-01");
    assert_eq!(body["start"], "2024-12-21");
    assert_eq!(body["end"], "2025-01-20");

    let req = test::TestRequest::get()
        .uri("/api/cycle?date=25-12-2024")
        .peer_addr(PEER.parse().unwrap())
        .insert_header(("Authorization", hr()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // a parseable date whose cycle has no representable window
    let req = test::TestRequest::get()
        .uri("/api/cycle?date=%2B262142-12-25")
        .peer_addr(PEER.parse().unwrap())
        .insert_header(("Authorization", hr()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "InvalidInput");
}

#[actix_web::test]
async fn evaluate_returns_decision_and_advanced_counters() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/attendance/evaluate")
        .peer_addr(PEER.parse().unwrap())
        .insert_header(("Authorization", hr()))
        .set_json(json!({
            "punch": {"time_in": "09:25:00", "time_out": "18:00:00"},
            "counters": {"late": 1, "permission": 0}
        }))
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["decision"]["status"], "P");
    assert_eq!(body["decision"]["late_used"], 1);
    assert_eq!(body["counters"], json!({"late": 2, "permission": 0}));
}
