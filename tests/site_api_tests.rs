//! 站点配置、RSS / sitemap / robots、访问统计与评论限流

mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{Value, json};

#[actix_rt::test]
async fn test_rss_and_sitemap_content_types() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/admin/posts")
        .insert_header(common::bearer(&token))
        .set_json(json!({
            "title": "Feeds & <Friends>",
            "slug": "feeds",
            "content": "Body",
            "status": "published",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/rss/posts").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/rss+xml; charset=utf-8"
    );
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.starts_with("<?xml"));
    assert!(body.contains("<![CDATA[Feeds & <Friends>]]>"));
    assert!(body.contains("https://blog.example.com/blog/feeds"));

    let req = test::TestRequest::get().uri("/api/sitemap.xml").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/xml; charset=utf-8"
    );
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("<urlset"));
    assert!(body.contains("https://blog.example.com/blog/feeds"));
}

#[actix_rt::test]
async fn test_robots_points_to_sitemap() {
    let env = common::setup().await;
    let app = init_app!(env);

    let req = test::TestRequest::get().uri("/api/robots.txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Disallow: /api/admin/"));
    assert!(body.contains("Sitemap: https://blog.example.com/api/sitemap.xml"));
}

#[actix_rt::test]
async fn test_site_config_roundtrip() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);

    let req = test::TestRequest::put()
        .uri("/api/admin/config")
        .insert_header(common::bearer(&token))
        .set_json(json!({
            "configs": [
                {"key": "site_name", "value": "Ink Notes"},
                {
                    "key": "footer_right_links",
                    "type": "json",
                    "value": [{"category": "Friends", "links": [{"title": "A", "url": "https://a.example"}]}],
                },
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/config").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["site_name"], "Ink Notes");
    assert_eq!(body["data"]["footer_right_links"][0]["category"], "Friends");
    assert_eq!(
        body["data"]["footer_right_links"][0]["links"][0]["url"],
        "https://a.example"
    );
}

#[actix_rt::test]
async fn test_pageview_shows_in_overview() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);

    for ip in ["10.9.0.1:1", "10.9.0.2:1", "10.9.0.2:1"] {
        let req = test::TestRequest::post()
            .uri("/api/analytics/pageview")
            .peer_addr(ip.parse().unwrap())
            .insert_header(("User-Agent", "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"))
            .set_json(json!({"page_type": "home"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let req = test::TestRequest::post()
        .uri("/api/analytics/pageview")
        .set_json(json!({"page_type": ""}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/admin/analytics/overview")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["today_pv"], 3);
    assert_eq!(body["data"]["today_uv"], 2);
}

#[actix_rt::test]
async fn test_comment_rate_limit() {
    let env = common::setup_with(|config| {
        config.rate_limit.comment.limit = 2;
        config.rate_limit.comment.window_secs = 60;
    })
    .await;
    let app = init_app!(env);

    let mut last = StatusCode::OK;
    for i in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/comments")
            .peer_addr("10.20.30.40:1000".parse().unwrap())
            .set_json(json!({
                "guestbook": true,
                "nickname": "spammer",
                "email": "spam@example.com",
                "content": format!("message {}", i),
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        if i < 2 {
            assert_eq!(resp.status(), StatusCode::CREATED);
        }
        last = resp.status();
    }
    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);

    // 读取评论不受发表限流影响
    let req = test::TestRequest::get()
        .uri("/api/comments")
        .peer_addr("10.20.30.40:1000".parse().unwrap())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
