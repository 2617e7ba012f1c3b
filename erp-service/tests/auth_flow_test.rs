mod common;

use axum::http::{header, Method, StatusCode};
use chrono::Duration;
use common::{TestApp, TEST_PASSWORD};
use erp_service::services::IssuedToken;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_register_then_login_returns_bearer_token() {
    let app = TestApp::spawn().await;
    let user_id = app.register_user("ana@example.com", "collaborator").await;

    let res = app.try_login("ana@example.com", TEST_PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["token_type"], "Bearer");

    let token = res.body["access_token"].as_str().unwrap();
    let me = app.get("/users/me", token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.id("user_id"), user_id);
    assert_eq!(me.body["role"], "collaborator");
    assert!(me.body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::spawn().await;
    app.register_user("Mixed.Case@Example.com", "collaborator").await;

    let res = app.try_login("mixed.case@example.com", TEST_PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::spawn().await;
    app.register_user("dup@example.com", "collaborator").await;

    let res = app
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "name": "Again",
                "email": "DUP@example.com",
                "password": TEST_PASSWORD,
                "role": "collaborator",
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::spawn().await;
    app.register_user("bob@example.com", "collaborator").await;

    let wrong = app.try_login("bob@example.com", "not the password").await;
    let unknown = app.try_login("nobody@example.com", TEST_PASSWORD).await;

    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.detail(), unknown.detail());
    assert_eq!(wrong.detail(), "Invalid credentials");
}

#[tokio::test]
async fn test_missing_or_garbage_token_is_401_with_challenge() {
    let app = TestApp::spawn().await;

    let missing = app.request(Method::GET, "/users/me", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        missing.headers.get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );

    let garbage = app.get("/users/me", "not.a.jwt").await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.detail(), missing.detail());
}

#[tokio::test]
async fn test_token_expires_after_configured_minutes() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("clock@example.com", "collaborator").await;

    app.clock.advance(Duration::minutes(15) - Duration::seconds(1));
    assert_eq!(app.get("/users/me", &token).await.status, StatusCode::OK);

    app.clock.advance(Duration::seconds(1));
    let res = app.get("/users/me", &token).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.headers.contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn test_token_for_unknown_subject() {
    let app = TestApp::spawn().await;

    let IssuedToken { access_token, .. } = app
        .state
        .jwt
        .issue_default(&Uuid::new_v4().to_string())
        .unwrap();
    let res = app.get("/users/me", &access_token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.detail(), "User not found");

    let IssuedToken { access_token, .. } = app.state.jwt.issue_default("not-a-uuid").unwrap();
    let res = app.get("/users/me", &access_token).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deactivated_user_is_forbidden() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.signed_in("root@example.com", "superuser").await;
    let (user_id, token) = app.signed_in("temp@example.com", "collaborator").await;

    let res = app
        .patch(
            &format!("/users/{}/active", user_id),
            &admin,
            json!({ "active": false }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["active"], false);

    // Existing token stops working
    assert_eq!(app.get("/users/me", &token).await.status, StatusCode::FORBIDDEN);

    // And a fresh login is refused
    let login = app.try_login("temp@example.com", TEST_PASSWORD).await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);

    app.patch(
        &format!("/users/{}/active", user_id),
        &admin,
        json!({ "active": true }),
    )
    .await;
    assert_eq!(app.get("/users/me", &token).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_deleted_user_token_resolves_to_not_found() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.signed_in("root@example.com", "superuser").await;
    let (user_id, token) = app.signed_in("gone@example.com", "collaborator").await;

    let res = app.delete(&format!("/users/{}", user_id), &admin).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.get("/users/me", &token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.delete(&format!("/users/{}", user_id), &admin).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_superuser_routes_reject_other_roles() {
    let app = TestApp::spawn().await;
    let (victim, _) = app.signed_in("victim@example.com", "collaborator").await;

    for role in ["collaborator", "supervisor"] {
        let (_, token) = app
            .signed_in(&format!("{}@example.com", role), role)
            .await;

        let res = app.delete(&format!("/users/{}", victim), &token).await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "role {}", role);

        let res = app
            .patch(
                &format!("/users/{}/active", victim),
                &token,
                json!({ "active": false }),
            )
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "role {}", role);
    }

    assert_eq!(app.count("users").await, 3);
}

#[tokio::test]
async fn test_self_registration_cannot_grant_elevated_roles() {
    let app = TestApp::spawn().await;
    let (victim, _) = app.signed_in("victim@example.com", "collaborator").await;

    for role in ["superuser", "supervisor"] {
        let email = format!("{}-claim@example.com", role);
        let res = app
            .request(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "name": "Claimant",
                    "email": email,
                    "password": TEST_PASSWORD,
                    "role": role,
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "role {}", role);

        let login = app.try_login(&email, TEST_PASSWORD).await;
        assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    }

    // A self-registered account holds no superuser powers
    let (_, token) = app.signed_in("attacker@example.com", "collaborator").await;
    let res = app.delete(&format!("/users/{}", victim), &token).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app
        .patch(
            &format!("/users/{}/active", victim),
            &token,
            json!({ "active": false }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    assert_eq!(app.count("users").await, 2);
}

#[tokio::test]
async fn test_registration_validates_body() {
    let app = TestApp::spawn().await;

    let short = app
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "name": "Short",
                "email": "short@example.com",
                "password": "short",
                "role": "collaborator",
            })),
        )
        .await;
    assert_eq!(short.status, StatusCode::UNPROCESSABLE_ENTITY);

    let bad_role = app
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({
                "name": "Role",
                "email": "role@example.com",
                "password": TEST_PASSWORD,
                "role": "emperor",
            })),
        )
        .await;
    assert_eq!(bad_role.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.count("users").await, 0);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::spawn().await;
    let res = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["checks"]["database"], "up");
}
