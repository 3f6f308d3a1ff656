//! 文章、标签、浏览计数与评论审核

mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{Value, json};

macro_rules! create_post {
    ($app:expr, $token:expr, $slug:expr, $status:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/admin/posts")
            .insert_header(common::bearer(&$token))
            .set_json(json!({
                "title": format!("Post {}", $slug),
                "slug": $slug,
                "content": "# Heading\n\nSome **bold** body text with a [link](https://example.com).",
                "status": $status,
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_i64().unwrap()
    }};
}

fn comment_body(post_id: i64, email: &str, content: &str) -> Value {
    json!({
        "post_id": post_id,
        "nickname": "reader",
        "email": email,
        "content": content,
    })
}

#[actix_rt::test]
async fn test_draft_hidden_from_public() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);

    create_post!(app, token, "published-one", "published");
    create_post!(app, token, "draft-one", "draft");

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["slug"], "published-one");

    let req = test::TestRequest::get().uri("/api/posts/draft-one").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/posts/published-one").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["title"], "Post published-one");
}

#[actix_rt::test]
async fn test_duplicate_slug_gets_suffix() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);

    let first = create_post!(app, token, "same-slug", "published");
    let second = create_post!(app, token, "same-slug", "published");

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/posts/{}", second))
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let slug = body["data"]["slug"].as_str().unwrap();
    assert!(slug.starts_with("same-slug-"));

    // 更新成已占用的 slug 直接拒绝
    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/posts/{}", second))
        .insert_header(common::bearer(&token))
        .set_json(json!({"slug": "same-slug"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1005);
    assert_ne!(first, second);
}

#[actix_rt::test]
async fn test_view_counted_once_per_visitor() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let id = create_post!(app, token, "viewed", "published");

    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri(&format!("/api/posts/{}/views", id))
            .peer_addr("192.168.1.20:1234".parse().unwrap())
            .insert_header(("User-Agent", "Mozilla/5.0 test"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/views", id))
        .peer_addr("192.168.1.21:1234".parse().unwrap())
        .insert_header(("User-Agent", "Mozilla/5.0 test"))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/api/posts/viewed").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["view_count"], 2);
}

#[actix_rt::test]
async fn test_view_of_unknown_post() {
    let env = common::setup().await;
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/api/posts/9999/views")
        .peer_addr("192.168.1.20:1234".parse().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/posts/abc/views")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_tag_detail_lists_posts() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/admin/tags")
        .insert_header(common::bearer(&token))
        .set_json(json!({"name": "Rust", "slug": "rust"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let tag_id = body["data"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/admin/posts")
        .insert_header(common::bearer(&token))
        .set_json(json!({
            "title": "Tagged",
            "slug": "tagged",
            "content": "body",
            "status": "published",
            "tag_ids": [tag_id],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/tags/rust").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["posts"]["items"][0]["slug"], "tagged");

    let req = test::TestRequest::get().uri("/api/tags/missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_first_comment_waits_for_moderation() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let post_id = create_post!(app, token, "discussed", "published");

    let req = test::TestRequest::post()
        .uri("/api/comments")
        .peer_addr("172.16.0.5:999".parse().unwrap())
        .set_json(comment_body(post_id, "reader@example.com", "first!"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "pending");
    let first_id = body["data"]["id"].as_i64().unwrap();

    // 其他访客看不到待审核评论，作者本人可以
    let req = test::TestRequest::get()
        .uri(&format!("/api/comments?post_id={}", post_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/comments?post_id={}&email=reader@example.com",
            post_id
        ))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["id"], first_id);

    // 首条评论审核通过前，同一邮箱的后续评论仍需审核
    let req = test::TestRequest::post()
        .uri("/api/comments")
        .peer_addr("172.16.0.5:999".parse().unwrap())
        .set_json(comment_body(post_id, "reader@example.com", "second"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["message"], "comment submitted, awaiting moderation");

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments?post_id={}", post_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/comments/{}", first_id))
        .insert_header(common::bearer(&token))
        .set_json(json!({"status": "approved"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // 有了通过审核的评论之后直接发布
    let req = test::TestRequest::post()
        .uri("/api/comments")
        .peer_addr("172.16.0.5:999".parse().unwrap())
        .set_json(comment_body(post_id, "reader@example.com", "third"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["message"], "comment published");

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments?post_id={}", post_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let contents: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["content"].as_str())
        .collect();
    assert_eq!(contents, ["third", "first!"]);
}

#[actix_rt::test]
async fn test_repeated_unapproved_comments_stay_pending() {
    let env = common::setup().await;
    let app = init_app!(env);

    for i in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/comments")
            .peer_addr("172.16.0.9:999".parse().unwrap())
            .set_json(json!({
                "guestbook": true,
                "nickname": "eager",
                "email": "eager@example.com",
                "content": format!("hello {}", i),
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "pending");
    }

    let req = test::TestRequest::get().uri("/api/comments").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[actix_rt::test]
async fn test_reply_cannot_be_pinned() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let post_id = create_post!(app, token, "pinned", "published");

    let req = test::TestRequest::post()
        .uri("/api/comments")
        .peer_addr("172.16.0.6:999".parse().unwrap())
        .set_json(comment_body(post_id, "guest@example.com", "top level"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let root_id = body["data"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/comments/{}/reply", root_id))
        .insert_header(common::bearer(&token))
        .set_json(json!({"content": "thanks for reading"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let reply_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["parent_id"], root_id);
    assert_eq!(body["data"]["is_admin"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/comments/{}/toggle-pin", reply_id))
        .insert_header(common::bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3000);

    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/comments/{}/toggle-pin", root_id))
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["is_pinned"], true);
}

#[actix_rt::test]
async fn test_comment_needs_valid_email() {
    let env = common::setup().await;
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/api/comments")
        .peer_addr("172.16.0.7:999".parse().unwrap())
        .set_json(json!({
            "guestbook": true,
            "nickname": "someone",
            "email": "not-an-email",
            "content": "hello",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "email");
}

/// 放宽评论限流，便于单个测试里连续发表
async fn comment_env() -> common::TestEnv {
    common::setup_with(|config| config.rate_limit.comment.limit = 100).await
}

macro_rules! post_comment {
    ($app:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/comments")
            .peer_addr("172.16.1.1:999".parse().unwrap())
            .set_json($body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_i64().unwrap()
    }};
}

macro_rules! approve {
    ($app:expr, $token:expr, $id:expr) => {{
        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/comments/{}", $id))
            .insert_header(common::bearer(&$token))
            .set_json(json!({"status": "approved"}))
            .to_request();
        assert_eq!(test::call_service(&$app, req).await.status(), StatusCode::OK);
    }};
}

macro_rules! admin_reply {
    ($app:expr, $token:expr, $id:expr, $content:expr) => {{
        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/comments/{}/reply", $id))
            .insert_header(common::bearer(&$token))
            .set_json(json!({"content": $content}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_i64().unwrap()
    }};
}

macro_rules! list_comments {
    ($app:expr, $query:expr) => {{
        let req = test::TestRequest::get()
            .uri(&format!("/api/comments?{}", $query))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body["data"].as_array().unwrap().clone()
    }};
}

fn ids(comments: &[Value]) -> Vec<i64> {
    comments.iter().filter_map(|c| c["id"].as_i64()).collect()
}

#[actix_rt::test]
async fn test_comment_order_pinned_then_newest() {
    let env = comment_env().await;
    let app = init_app!(env);
    let token = login!(app);
    let post_id = create_post!(app, token, "ordered", "published");

    let oldest = post_comment!(app, comment_body(post_id, "a@example.com", "oldest"));
    approve!(app, token, oldest);
    let middle = post_comment!(app, comment_body(post_id, "a@example.com", "middle"));
    let newest = post_comment!(app, comment_body(post_id, "a@example.com", "newest"));

    let comments = list_comments!(app, format!("post_id={}", post_id));
    assert_eq!(ids(&comments), [newest, middle, oldest]);

    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/comments/{}/toggle-pin", oldest))
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let comments = list_comments!(app, format!("post_id={}", post_id));
    assert_eq!(ids(&comments), [oldest, newest, middle]);
    assert_eq!(comments[0]["is_pinned"], true);
}

#[actix_rt::test]
async fn test_replies_are_capped_with_count() {
    let env = comment_env().await;
    let app = init_app!(env);
    let token = login!(app);
    let post_id = create_post!(app, token, "busy-thread", "published");

    let root = post_comment!(app, comment_body(post_id, "b@example.com", "root"));
    approve!(app, token, root);
    let quiet = post_comment!(app, comment_body(post_id, "b@example.com", "quiet"));

    let mut reply_ids = Vec::new();
    for i in 0..5 {
        reply_ids.push(admin_reply!(app, token, root, format!("reply {}", i)));
    }

    let comments = list_comments!(app, format!("post_id={}", post_id));
    let thread = comments.iter().find(|c| c["id"] == root).unwrap();
    assert_eq!(thread["reply_count"], 5);
    assert_eq!(thread["has_more"], true);
    let shown = ids(thread["replies"].as_array().unwrap());
    assert_eq!(shown, [reply_ids[4], reply_ids[3], reply_ids[2]]);

    let quiet = comments.iter().find(|c| c["id"] == quiet).unwrap();
    assert_eq!(quiet["reply_count"], 0);
    assert_eq!(quiet["has_more"], false);
    assert!(quiet.get("replies").is_none());
}

#[actix_rt::test]
async fn test_own_pending_comments_listed_first_once() {
    let env = comment_env().await;
    let app = init_app!(env);
    let token = login!(app);
    let post_id = create_post!(app, token, "mine-first", "published");

    let other = post_comment!(app, comment_body(post_id, "other@example.com", "other"));
    approve!(app, token, other);
    let mine = post_comment!(app, comment_body(post_id, "me@example.com", "mine"));

    let comments = list_comments!(app, format!("post_id={}&email=me@example.com", post_id));
    assert_eq!(ids(&comments), [mine, other]);
    assert_eq!(comments[0]["status"], "pending");

    // 审核通过后只出现一次
    approve!(app, token, mine);
    let comments = list_comments!(app, format!("post_id={}&email=me@example.com", post_id));
    assert_eq!(ids(&comments), [mine, other]);

    let comments = list_comments!(app, format!("post_id={}&email=nobody@example.com", post_id));
    assert_eq!(ids(&comments), [mine, other]);
}

#[actix_rt::test]
async fn test_own_pending_reply_shown_under_thread() {
    let env = comment_env().await;
    let app = init_app!(env);
    let token = login!(app);
    let post_id = create_post!(app, token, "reply-pending", "published");

    let root = post_comment!(app, comment_body(post_id, "host@example.com", "root"));
    approve!(app, token, root);
    let answer = admin_reply!(app, token, root, "admin answer");

    let mut body = comment_body(post_id, "newbie@example.com", "my reply");
    body["parent_id"] = json!(answer);
    let pending = post_comment!(app, body);

    let comments = list_comments!(app, format!("post_id={}", post_id));
    assert_eq!(ids(comments[0]["replies"].as_array().unwrap()), [answer]);
    assert_eq!(comments[0]["reply_count"], 1);

    let comments = list_comments!(app, format!("post_id={}&email=newbie@example.com", post_id));
    let replies = comments[0]["replies"].as_array().unwrap();
    assert_eq!(ids(replies), [pending, answer]);
    assert_eq!(replies[0]["status"], "pending");
    assert_eq!(replies[0]["parent_id"], root);
    assert_eq!(replies[0]["reply_to_id"], answer);
    assert_eq!(comments[0]["reply_count"], 1);
}

#[actix_rt::test]
async fn test_delete_removes_direct_replies_only() {
    let env = comment_env().await;
    let app = init_app!(env);
    let token = login!(app);
    let post_id = create_post!(app, token, "cascade", "published");

    let doomed = post_comment!(app, comment_body(post_id, "c@example.com", "doomed"));
    approve!(app, token, doomed);
    let kept = post_comment!(app, comment_body(post_id, "c@example.com", "kept"));
    admin_reply!(app, token, doomed, "reply to doomed");
    let kept_reply = admin_reply!(app, token, kept, "reply to kept");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/comments/{}", doomed))
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let comments = list_comments!(app, format!("post_id={}", post_id));
    assert_eq!(ids(&comments), [kept]);
    assert_eq!(ids(comments[0]["replies"].as_array().unwrap()), [kept_reply]);

    let req = test::TestRequest::get()
        .uri("/api/admin/comments")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["pagination"]["total"], 2);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/comments/{}", doomed))
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_reply_target_must_share_thread() {
    let env = comment_env().await;
    let app = init_app!(env);
    let token = login!(app);
    let post_id = create_post!(app, token, "threads", "published");

    let first = post_comment!(app, comment_body(post_id, "d@example.com", "first"));
    let second = post_comment!(app, comment_body(post_id, "d@example.com", "second"));
    let elsewhere = admin_reply!(app, token, second, "in the second thread");

    let mut body = comment_body(post_id, "d@example.com", "confused");
    body["parent_id"] = json!(first);
    body["reply_to_id"] = json!(elsewhere);
    let req = test::TestRequest::post()
        .uri("/api/comments")
        .peer_addr("172.16.1.1:999".parse().unwrap())
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "reply_to_id");

    let mut body = comment_body(post_id, "d@example.com", "orphan");
    body["reply_to_id"] = json!(first);
    let req = test::TestRequest::post()
        .uri("/api/comments")
        .peer_addr("172.16.1.1:999".parse().unwrap())
        .set_json(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    // 同一线程内的目标可以
    let mut body = comment_body(post_id, "d@example.com", "on topic");
    body["parent_id"] = json!(second);
    body["reply_to_id"] = json!(elsewhere);
    post_comment!(app, body);
}
