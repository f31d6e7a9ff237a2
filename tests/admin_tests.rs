mod common;

use axum::http::StatusCode;
use common::{
    SUPER_PASSWORD, SUPER_USER, body_json, get, post_form, reserve, set_cookie, signup_and_login,
    spawn_app,
};

async fn super_login(app: &axum::Router) -> String {
    let response = post_form(
        app,
        "/admin",
        &[("username", SUPER_USER), ("password", SUPER_PASSWORD)],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response, "super_token").expect("No super-token cookie");
    assert_eq!(body_json(response).await["kind"], "super");
    cookie
}

#[tokio::test]
async fn test_sudo_requires_super_token() {
    let (app, _) = spawn_app();

    let response = post_form(
        &app,
        "/sudo",
        &[("username", "olga_ops"), ("password", "pw"), ("roles", "opt")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_form(
        &app,
        "/sudo",
        &[("username", "olga_ops"), ("password", "pw"), ("roles", "opt")],
        Some("super_token=forged"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_second_super_login_invalidates_first() {
    let (app, _) = spawn_app();

    let old = super_login(&app).await;
    let new = super_login(&app).await;
    assert_ne!(old, new);

    let response = post_form(
        &app,
        "/sudo",
        &[("username", "olga_ops"), ("password", "pw"), ("roles", "opt")],
        Some(&old),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_form(
        &app,
        "/sudo",
        &[("username", "olga_ops"), ("password", "pw"), ("roles", "opt")],
        Some(&new),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["username"], "olga_ops");
    assert_eq!(body["roles"], serde_json::json!(["opt"]));
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_sudo_validation() {
    let (app, _) = spawn_app();
    let token = super_login(&app).await;

    let response = post_form(
        &app,
        "/sudo",
        &[("username", "olga_ops"), ("password", "pw"), ("roles", "opt,root")],
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let created = post_form(
        &app,
        "/sudo",
        &[("username", "olga_ops"), ("password", "pw"), ("roles", "opt")],
        Some(&token),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = post_form(
        &app,
        "/sudo",
        &[("username", "olga_ops"), ("password", "pw"), ("roles", "dev")],
        Some(&token),
    )
    .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_staff_roles_gate_endpoints() {
    let (app, _) = spawn_app();
    let token = super_login(&app).await;

    for (username, roles) in [("olga_ops", "opt"), ("max_mod", "mod")] {
        let response = post_form(
            &app,
            "/sudo",
            &[("username", username), ("password", "pw"), ("roles", roles)],
            Some(&token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let passenger = signup_and_login(&app, "pat_rider", "passenger").await;
    assert_eq!(reserve(&app, &passenger).await.status(), StatusCode::CREATED);

    let response = post_form(
        &app,
        "/admin",
        &[("username", "olga_ops"), ("password", "pw")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let operator = set_cookie(&response, "admin_token").unwrap();
    assert_eq!(body_json(response).await["kind"], "staff");

    let response = get(&app, "/admin/reservations?passenger=pat_rider", Some(&operator)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = get(&app, "/admin/users/pat_rider", Some(&operator)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_form(
        &app,
        "/admin",
        &[("username", "max_mod"), ("password", "pw")],
        None,
    )
    .await;
    let moderator = set_cookie(&response, "admin_token").unwrap();

    let response = get(&app, "/admin/users/pat_rider", Some(&moderator)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["category"], "passenger");

    let response = get(&app, "/admin/reservations", Some(&moderator)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // User session cookies do not open staff routes
    let response = get(&app, "/admin/reservations", Some(&passenger)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_login_failures() {
    let (app, _) = spawn_app();

    let response = post_form(
        &app,
        "/admin",
        &[("username", SUPER_USER), ("password", "wrong")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let token = super_login(&app).await;
    post_form(
        &app,
        "/sudo",
        &[("username", "olga_ops"), ("password", "pw"), ("roles", "opt")],
        Some(&token),
    )
    .await;

    let response = post_form(
        &app,
        "/admin",
        &[("username", "olga_ops"), ("password", "wrong")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, "admin_token").is_none());
}

#[tokio::test]
async fn test_sudo_checks_token_before_body() {
    let (app, _) = spawn_app();
    let old = super_login(&app).await;
    let current = super_login(&app).await;

    let response = post_form(&app, "/sudo", &[("password", "pw")], Some(&old)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_form(&app, "/sudo", &[("password", "pw")], Some(&current)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation_error");
}
