#[macro_use]
mod common;

use actix_web::cookie::SameSite;
use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};
use service_test_support::problem_details::assert_problem_details_from_service_response;
use token_core::{Rs256Verifier, TokenVerifier, VerifierSettings};

use common::{build_state, primary_public_key};

fn login_request(username: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": username, "password": password }))
}

#[actix_web::test]
async fn test_login_issues_verifiable_access_token_and_refresh_cookie() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let req = login_request("admin", "admin123").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "refresh_token")
        .expect("refresh cookie")
        .into_owned();
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(
        cookie.max_age().map(|age| age.whole_seconds()),
        Some(7 * 24 * 60 * 60)
    );

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 1800);
    assert!(body.get("refresh_token").is_none());

    // A verifier holding only the public key accepts the token
    let verifier = Rs256Verifier::new(primary_public_key(), VerifierSettings::default());
    let claims = verifier
        .verify(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, "1");
    assert_eq!(claims.get_str("username"), Some("admin"));
    assert_eq!(claims.iss.as_deref(), Some("auth_service"));

    let refresh = verifier.verify(cookie.value()).unwrap();
    assert!(refresh.is_refresh());
}

#[actix_web::test]
async fn test_login_rejects_bad_credentials() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    for (username, password) in [("admin", "nope"), ("ghost", "admin123")] {
        let req = login_request(username, password).to_request();
        let resp = test::call_service(&app, req).await;
        assert_problem_details_from_service_response(
            resp,
            "UNAUTHORIZED",
            StatusCode::UNAUTHORIZED,
            Some("Invalid username or password"),
        )
        .await;
    }
}

#[actix_web::test]
async fn test_login_rejects_deactivated_account() {
    let (state, gate) = build_state();
    assert!(state.users.set_active(1, false));
    let app = auth_app!(state, gate);

    let req = login_request("admin", "admin123").to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "UNAUTHORIZED",
        StatusCode::UNAUTHORIZED,
        Some("Account is deactivated"),
    )
    .await;
}

#[actix_web::test]
async fn test_login_with_malformed_body() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "admin" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_problem_details_from_service_response(
        resp,
        "BAD_REQUEST",
        StatusCode::BAD_REQUEST,
        None,
    )
    .await;
}

#[actix_web::test]
async fn test_me_returns_current_user() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let req = login_request("admin", "admin123").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["access_token"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me["id"], 1);
    assert_eq!(me["username"], "admin");
    assert_eq!(me["is_admin"], true);
    assert_eq!(me["is_active"], true);
    assert!(me.get("password_hash").is_none());
}

#[actix_web::test]
async fn test_me_requires_bearer() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let req = test::TestRequest::get().uri("/auth/me").to_request();
    let resp = test::call_service(&app, req).await;

    assert_problem_details_from_service_response(
        resp,
        "UNAUTHORIZED_MISSING_BEARER",
        StatusCode::UNAUTHORIZED,
        Some("missing or malformed authorization"),
    )
    .await;
}

#[actix_web::test]
async fn test_verify_token_reports_claims() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let req = login_request("admin", "admin123").to_request();
    let resp = test::call_service(&app, req).await;
    let refresh = resp
        .response()
        .cookies()
        .find(|c| c.name() == "refresh_token")
        .unwrap()
        .value()
        .to_string();
    let body: Value = test::read_body_json(resp).await;
    let token = body["access_token"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri("/auth/verify-token")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let verified: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["claims"]["sub"], "1");
    assert_eq!(verified["claims"]["token_use"], "access");

    // Refresh tokens are not bearer credentials
    let req = test::TestRequest::post()
        .uri("/auth/verify-token")
        .insert_header(("Authorization", format!("Bearer {refresh}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "UNAUTHORIZED_INVALID_JWT",
        StatusCode::UNAUTHORIZED,
        Some("refresh token"),
    )
    .await;
}

#[actix_web::test]
async fn test_register_then_login() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "bob", "email": "bob@example.com", "password": "hunter2" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["id"], 2);
    assert_eq!(created["is_admin"], false);
    let stored = state.users.find_by_username("bob").unwrap().password_hash;
    assert!(stored.starts_with("$2b$04$"), "{stored}");

    let req = login_request("bob", "hunter2").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "bob", "email": "bob2@example.com", "password": "x" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "USERNAME_TAKEN",
        StatusCode::CONFLICT,
        None,
    )
    .await;
}

#[actix_web::test]
async fn test_register_validates_fields() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let cases = [
        (json!({ "username": " ", "email": "a@b.c", "password": "x" }), "INVALID_USERNAME"),
        (json!({ "username": "carol", "email": "carol", "password": "x" }), "INVALID_EMAIL"),
        (json!({ "username": "carol", "email": "c@d.e", "password": "" }), "INVALID_PASSWORD"),
    ];

    for (payload, code) in cases {
        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_problem_details_from_service_response(resp, code, StatusCode::BAD_REQUEST, None)
            .await;
    }
}

#[actix_web::test]
async fn test_logout_clears_cookie() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let req = test::TestRequest::post().uri("/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "refresh_token")
        .expect("removal cookie")
        .into_owned();
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age().map(|age| age.whole_seconds()), Some(0));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Successfully logged out");
}

#[actix_web::test]
async fn test_health_and_root() {
    let (state, gate) = build_state();
    let app = auth_app!(state, gate);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "status": "healthy", "service": "auth_service" }));

    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Auth Service is running");
}
