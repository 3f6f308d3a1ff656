//! 后台登录、JWT 鉴权与健康检查

mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{Value, json};

#[actix_rt::test]
async fn test_health_is_public() {
    let env = common::setup().await;
    let app = init_app!(env);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
}

#[actix_rt::test]
async fn test_admin_requires_token() {
    let env = common::setup().await;
    let app = init_app!(env);

    let req = test::TestRequest::get().uri("/api/admin/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/admin/me")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_login_with_wrong_password() {
    let env = common::setup().await;
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/api/admin/login")
        .peer_addr("127.0.0.1:40000".parse().unwrap())
        .set_json(json!({"username": common::ADMIN_USER, "password": "nope"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "invalid username or password");
}

#[actix_rt::test]
async fn test_login_me_and_refresh() {
    let env = common::setup().await;
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/api/admin/login")
        .peer_addr("127.0.0.1:40000".parse().unwrap())
        .set_json(json!({
            "username": common::ADMIN_USER,
            "password": common::ADMIN_PASSWORD,
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    let access = body["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["username"], common::ADMIN_USER);

    let req = test::TestRequest::get()
        .uri("/api/admin/me")
        .insert_header(common::bearer(&access))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["username"], common::ADMIN_USER);
    assert_eq!(body["data"]["email"], "admin@example.com");

    // refresh token 不能当 access token 用
    let req = test::TestRequest::get()
        .uri("/api/admin/me")
        .insert_header(common::bearer(&refresh))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/admin/refresh")
        .peer_addr("127.0.0.1:40000".parse().unwrap())
        .set_json(json!({"refresh_token": refresh}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let renewed = body["data"]["access_token"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri("/api/admin/me")
        .insert_header(common::bearer(renewed))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_change_password() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/admin/change-password")
        .insert_header(common::bearer(&token))
        .set_json(json!({"old_password": "wrong", "new_password": "new-password-123"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());

    let req = test::TestRequest::post()
        .uri("/api/admin/change-password")
        .insert_header(common::bearer(&token))
        .set_json(json!({
            "old_password": common::ADMIN_PASSWORD,
            "new_password": "new-password-123",
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "password changed");

    let req = test::TestRequest::post()
        .uri("/api/admin/login")
        .peer_addr("127.0.0.1:40001".parse().unwrap())
        .set_json(json!({"username": common::ADMIN_USER, "password": "new-password-123"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_login_rate_limited() {
    let env = common::setup_with(|config| {
        config.rate_limit.login.limit = 2;
        config.rate_limit.login.window_secs = 60;
    })
    .await;
    let app = init_app!(env);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/admin/login")
            .peer_addr("10.1.1.1:5000".parse().unwrap())
            .set_json(json!({"username": "admin", "password": "wrong"}))
            .to_request();
        statuses.push(test::call_service(&app, req).await.status());
    }
    assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
    assert_eq!(statuses[1], StatusCode::UNAUTHORIZED);
    assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);

    // 不同 IP 各自计数
    let req = test::TestRequest::post()
        .uri("/api/admin/login")
        .peer_addr("10.1.1.2:5000".parse().unwrap())
        .set_json(json!({"username": "admin", "password": "wrong"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
