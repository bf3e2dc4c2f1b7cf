//! HTTP surface: auth, role guard, and the main endpoints.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::*;

use legacy_radio::db::queries;
use legacy_radio::jwt::TokenIssuer;
use legacy_radio::models::Role;

#[tokio::test]
async fn test_health() {
    let ctx = create_test_context();
    let response = ctx.app().oneshot(get_request("/api/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_register_then_login() {
    let ctx = create_test_context();

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({"email": "DJ@Example.com", "username": "dj_kay", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], "dj@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"].as_str().is_some());

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "dj@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = json_body(response).await["token"].as_str().unwrap().to_string();

    let response = ctx
        .app()
        .oneshot(get_request("/api/auth/profile", Some(&format!("Bearer {}", token))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["username"], "dj_kay");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let ctx = create_test_context();
    create_test_user(&ctx.conn(), "taken@example.com", Role::User);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({"email": "Taken@example.com", "username": "someone", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({"email": "new@example.com", "username": "ab", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["status"], 400);

    // Malformed JSON goes through the same error body
    let response = ctx
        .app()
        .oneshot(json_request("POST", "/api/auth/register", None, json!({"email": 5})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_bootstrap_email_registers_as_admin() {
    let ctx = create_test_context();
    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({"email": "root@legacyradio.test", "username": "root", "password": "hunter22"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"]["role"], "admin");
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let ctx = create_test_context();
    let app = ctx.app();

    let unknown = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "ghost@example.com", "password": "whatever"}),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(unknown).await["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_guard_rejects_missing_and_invalid_tokens() {
    let ctx = create_test_context();

    let response = ctx.app().oneshot(get_request("/api/subscriptions", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "UNAUTHORIZED");

    let response = ctx
        .app()
        .oneshot(get_request("/api/subscriptions", Some("Bearer not-a-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Signed with a different secret
    let user = create_test_user(&ctx.conn(), "listener@example.com", Role::User);
    let forged = TokenIssuer::from_days("other-secret", 7).issue(&user).unwrap();
    let response = ctx
        .app()
        .oneshot(get_request("/api/subscriptions", Some(&format!("Bearer {}", forged))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guard_enforces_roles() {
    let ctx = create_test_context();
    let (user, admin) = {
        let conn = ctx.conn();
        (
            create_test_user(&conn, "listener@example.com", Role::User),
            create_test_user(&conn, "admin@example.com", Role::Admin),
        )
    };

    let response = ctx
        .app()
        .oneshot(get_request("/api/admin/discount-codes", Some(&ctx.bearer(&user))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "FORBIDDEN");

    let response = ctx
        .app()
        .oneshot(get_request("/api/admin/discount-codes", Some(&ctx.bearer(&admin))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Admins pass user-level routes too
    let response = ctx
        .app()
        .oneshot(get_request("/api/subscriptions", Some(&ctx.bearer(&admin))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_demoted_admin_loses_access_immediately() {
    let ctx = create_test_context();
    let admin = create_test_user(&ctx.conn(), "admin@example.com", Role::Admin);
    let bearer = ctx.bearer(&admin);

    queries::set_user_role(&ctx.conn(), "admin@example.com", Role::User).unwrap();

    let response = ctx
        .app()
        .oneshot(get_request("/api/admin/discount-codes", Some(&bearer)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_manages_servers_and_codes() {
    let ctx = create_test_context();
    let admin = create_test_user(&ctx.conn(), "admin@example.com", Role::Admin);
    let bearer = ctx.bearer(&admin);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/admin/servers",
            Some(&bearer),
            json!({"name": "Main Dispatch", "description": "County-wide"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let server_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = ctx
        .app()
        .oneshot(json_request(
            "PUT",
            &format!("/api/admin/servers/{}", server_id),
            Some(&bearer),
            json!({"description": "Statewide"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Main Dispatch");
    assert_eq!(body["description"], "Statewide");

    let response = ctx
        .app()
        .oneshot(json_request(
            "PUT",
            "/api/admin/servers/missing",
            Some(&bearer),
            json!({"name": "X"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/admin/discount-codes",
            Some(&bearer),
            json!({"code": "lr2030", "server_id": server_id, "expires_at": "2030-01-01", "max_uses": 10}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["code"], "LR2030");
    assert_eq!(body["expires_at"], 1_893_456_000);
    let code_id = body["id"].as_str().unwrap().to_string();

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/admin/discount-codes",
            Some(&bearer),
            json!({"code": "LR2030", "server_id": server_id, "expires_at": "2030-01-01"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["message"], "Discount code already exists");

    let response = ctx
        .app()
        .oneshot(get_request(
            &format!("/api/admin/discount-usage/{}", code_id),
            Some(&bearer),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 0);

    let response = ctx.app().oneshot(get_request("/api/servers", None)).await.unwrap();
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_apply_discount_and_subscribe() {
    let ctx = create_test_context();
    let (user, server) = {
        let conn = ctx.conn();
        let admin = create_test_user(&conn, "admin@example.com", Role::Admin);
        let user = create_test_user(&conn, "listener@example.com", Role::User);
        let server = create_test_server(&conn, "Alpha");
        create_test_code(&conn, &admin, &server, "SAVE10", Some(1));
        (user, server)
    };
    let bearer = ctx.bearer(&user);

    let response = ctx
        .app()
        .oneshot(json_request("POST", "/api/apply-discount", Some(&bearer), json!({"code": "save10"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["server"]["id"], server.id.as_str());

    let response = ctx
        .app()
        .oneshot(json_request("POST", "/api/apply-discount", Some(&bearer), json!({"code": "NOPE"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "DISCOUNT_NOT_FOUND");

    let purchase = json!({
        "server_id": server.id,
        "duration": 12,
        "payment_method": "stripe",
        "discount_code": "SAVE10",
        "payment_reference": "pi_http"
    });
    let response = ctx
        .app()
        .oneshot(json_request("POST", "/api/subscribe", Some(&bearer), purchase.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["via_coupon"], true);

    // Code is now used up
    let response = ctx
        .app()
        .oneshot(json_request("POST", "/api/subscribe", Some(&bearer), purchase))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "USAGE_EXHAUSTED");

    let response = ctx
        .app()
        .oneshot(get_request("/api/subscriptions", Some(&bearer)))
        .await
        .unwrap();
    let subs = json_body(response).await;
    assert_eq!(subs.as_array().unwrap().len(), 1);
    assert_eq!(subs[0]["server_name"], "Alpha");
}

#[tokio::test]
async fn test_pending_payment_answers_202() {
    let ctx = create_test_context();
    let (user, server) = {
        let conn = ctx.conn();
        (
            create_test_user(&conn, "listener@example.com", Role::User),
            create_test_server(&conn, "Alpha"),
        )
    };
    ctx.gateway.set_outcome(MockOutcome::Pending);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/subscribe",
            Some(&ctx.bearer(&user)),
            json!({"server_id": server.id, "duration": 1, "payment_method": "card", "payment_reference": "pi_slow"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["code"], "PAYMENT_PENDING");
    assert_eq!(subscription_count(&ctx.conn()), 0);
}

#[tokio::test]
async fn test_invalid_duration_is_bad_request() {
    let ctx = create_test_context();
    let (user, server) = {
        let conn = ctx.conn();
        (
            create_test_user(&conn, "listener@example.com", Role::User),
            create_test_server(&conn, "Alpha"),
        )
    };

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/payments/create-intent",
            Some(&ctx.bearer(&user)),
            json!({"server_id": server.id, "duration": 2, "payment_method": "card"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.gateway.intent_calls(), 0);
}
