//! 完整中间件链（timeout、panic 恢复、安全头、压缩、CORS、request id、计时）下的路由

mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{Value, json};

#[actix_rt::test]
async fn test_public_routes_through_middleware_chain() {
    let env = common::setup().await;
    let app = init_server_app!(env);

    for uri in ["/health", "/api/posts", "/api/tags", "/api/config", "/api/comments"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);

        let headers = resp.headers();
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-powered-by").unwrap(), "inkpost");
        assert!(headers.get("x-request-id").is_some(), "GET {}", uri);
    }
}

#[actix_rt::test]
async fn test_path_params_and_admin_routes_through_middleware_chain() {
    let env = common::setup().await;
    let app = init_server_app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/admin/posts")
        .insert_header(common::bearer(&token))
        .set_json(json!({
            "title": "Stacked",
            "slug": "stacked",
            "content": "Body",
            "status": "published",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/posts/stacked").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["slug"], "stacked");

    let req = test::TestRequest::get().uri("/api/posts/missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().get("x-request-id").is_some());

    let req = test::TestRequest::get().uri("/api/admin/posts").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_upstream_request_id_kept_through_middleware_chain() {
    let env = common::setup().await;
    let app = init_server_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/posts")
        .insert_header(("x-request-id", "edge-7f3a"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "edge-7f3a");
}
