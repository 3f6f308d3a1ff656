//! 账本：账单、退款/报销、统计与 webhook 签名

mod common;

use actix_web::{http::StatusCode, test};
use chrono::{Local, Utc};
use inkpost::api::middleware::webhook::sign;
use serde_json::{Value, json};

macro_rules! admin_post {
    ($app:expr, $token:expr, $uri:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri($uri)
            .insert_header(common::bearer(&$token))
            .set_json($body)
            .to_request();
        test::call_service(&$app, req).await
    }};
}

macro_rules! create_category {
    ($app:expr, $token:expr, $name:expr, $key:expr, $kind:expr) => {{
        let resp = admin_post!(
            $app,
            $token,
            "/api/admin/categories",
            json!({"name": $name, "key": $key, "type": $kind})
        );
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_i64().unwrap()
    }};
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[actix_rt::test]
async fn test_bill_amount_is_absolute() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let food = create_category!(app, token, "Food", "food", "expense");

    let resp = admin_post!(
        app,
        token,
        "/api/admin/bills",
        json!({
            "type": "expense",
            "category_id": food,
            "amount": -42.5,
            "desc": "lunch",
            "date": today(),
        })
    );
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["amount"], 42.5);
    assert_eq!(body["data"]["desc"], "lunch");
    assert_eq!(body["data"]["type"], "expense");
    assert_eq!(body["data"]["category"]["key"], "food");
    assert_eq!(body["data"]["refund"], 0.0);
}

#[actix_rt::test]
async fn test_bill_category_by_name_and_bad_date() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    create_category!(app, token, "Salary", "salary", "income");

    let resp = admin_post!(
        app,
        token,
        "/api/admin/bills",
        json!({"type": "income", "category_name": "Salary", "amount": 1000, "date": today()})
    );
    assert_eq!(resp.status(), StatusCode::CREATED);

    // 名称相同但类型不符
    let resp = admin_post!(
        app,
        token,
        "/api/admin/bills",
        json!({"type": "expense", "category_name": "Salary", "amount": 10, "date": today()})
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = admin_post!(
        app,
        token,
        "/api/admin/bills",
        json!({"type": "income", "category_name": "Salary", "amount": 10, "date": "2024/01/01"})
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_refund_cannot_exceed_amount() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let food = create_category!(app, token, "Food", "food", "expense");

    let resp = admin_post!(
        app,
        token,
        "/api/admin/bills",
        json!({"type": "expense", "category_id": food, "amount": 100, "date": today()})
    );
    let body: Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_i64().unwrap();

    let resp = admin_post!(
        app,
        token,
        &format!("/api/admin/bills/{}/refund", id),
        json!({"amount": 30})
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["refund"], 30.0);
    assert_eq!(body["data"]["refund_type"], 1);

    let resp = admin_post!(
        app,
        token,
        &format!("/api/admin/bills/{}/refund", id),
        json!({"amount": 80})
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 4000);

    // 剩余额度内可以继续退
    let resp = admin_post!(
        app,
        token,
        &format!("/api/admin/bills/{}/refund", id),
        json!({"amount": 70})
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["refund"], 100.0);
}

#[actix_rt::test]
async fn test_refund_only_for_expense() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let salary = create_category!(app, token, "Salary", "salary", "income");

    let resp = admin_post!(
        app,
        token,
        "/api/admin/bills",
        json!({"type": "income", "category_id": salary, "amount": 500, "date": today()})
    );
    let body: Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_i64().unwrap();

    let resp = admin_post!(
        app,
        token,
        &format!("/api/admin/bills/{}/refund", id),
        json!({"amount": 10})
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 4002);

    // 报销不限类型
    let resp = admin_post!(
        app,
        token,
        &format!("/api/admin/bills/{}/chargeback", id),
        json!({"amount": 10})
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["refund_type"], 2);
    assert_eq!(body["data"]["refund"], 10.0);
}

#[actix_rt::test]
async fn test_statistics_totals_match_categories() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let food = create_category!(app, token, "Food", "food", "expense");
    let rent = create_category!(app, token, "Rent", "rent", "expense");
    let salary = create_category!(app, token, "Salary", "salary", "income");

    for (kind, category, amount) in [
        ("expense", food, 12.3),
        ("expense", food, 7.7),
        ("expense", rent, 1500.0),
        ("income", salary, 3000.0),
    ] {
        let resp = admin_post!(
            app,
            token,
            "/api/admin/bills",
            json!({"type": kind, "category_id": category, "amount": amount, "date": today()})
        );
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/api/admin/bills/statistics")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let stats = &body["data"];
    assert_eq!(stats["total_expense"], 1520.0);
    assert_eq!(stats["total_income"], 3000.0);
    assert_eq!(stats["month_expense"], 1520.0);
    assert_eq!(stats["expense_by_category"]["Food"], 20.0);
    assert_eq!(stats["expense_by_category"]["Rent"], 1500.0);

    let by_category: f64 = stats["expense_by_category"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_f64().unwrap())
        .sum();
    assert!((by_category - stats["total_expense"].as_f64().unwrap()).abs() < 0.005);

    let req = test::TestRequest::get()
        .uri("/api/admin/bills/category-ranking")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["category_name"], "Rent");
    assert_eq!(body["data"][1]["category_name"], "Food");
}

#[actix_rt::test]
async fn test_webhook_signature() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let food = create_category!(app, token, "Food", "food", "expense");

    let payload = json!({
        "type": "expense",
        "category_id": food,
        "amount": 18,
        "desc": "coffee",
        "date": today(),
    })
    .to_string();
    let ts = Utc::now().timestamp().to_string();

    let req = test::TestRequest::post()
        .uri("/api/webhook/bills")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("X-Bill-Timestamp", ts.clone()))
        .insert_header(("X-Bill-Signature", sign(common::BILL_SECRET, &ts, payload.as_bytes())))
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/webhook/bills")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("X-Bill-Timestamp", ts.clone()))
        .insert_header(("X-Bill-Signature", sign("wrong-secret", &ts, payload.as_bytes())))
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let stale = (Utc::now().timestamp() - 3600).to_string();
    let req = test::TestRequest::post()
        .uri("/api/webhook/bills")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("X-Bill-Timestamp", stale.clone()))
        .insert_header(("X-Bill-Signature", sign(common::BILL_SECRET, &stale, payload.as_bytes())))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 2008);
}

#[actix_rt::test]
async fn test_webhook_disabled_without_secret() {
    let env = common::setup_with(|config| config.webhook.bill_secret.clear()).await;
    let app = init_app!(env);

    let payload = "{}";
    let ts = Utc::now().timestamp().to_string();
    let req = test::TestRequest::post()
        .uri("/api/webhook/bills")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("X-Bill-Timestamp", ts.clone()))
        .insert_header(("X-Bill-Signature", sign("", &ts, payload.as_bytes())))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(!resp.status().is_success());
}

macro_rules! create_bill {
    ($app:expr, $token:expr, $body:expr) => {{
        let resp = admin_post!($app, $token, "/api/admin/bills", $body);
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_i64().unwrap()
    }};
}

#[actix_rt::test]
async fn test_update_rejects_amount_below_refund() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let food = create_category!(app, token, "Food", "food", "expense");
    let id = create_bill!(
        app,
        token,
        json!({"type": "expense", "category_id": food, "amount": 100, "date": today()})
    );

    let resp = admin_post!(
        app,
        token,
        &format!("/api/admin/bills/{}/refund", id),
        json!({"amount": 30})
    );
    assert_eq!(resp.status(), StatusCode::OK);

    // 金额改到已退款额以下
    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/bills/{}", id))
        .insert_header(common::bearer(&token))
        .set_json(json!({"amount": 20}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 4000);

    // 直接写入超额 refund
    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/bills/{}", id))
        .insert_header(common::bearer(&token))
        .set_json(json!({"refund": 150, "refund_type": 1}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 4000);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/bills/{}", id))
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["amount"], 100.0);
    assert_eq!(body["data"]["refund"], 30.0);

    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/bills/{}", id))
        .insert_header(common::bearer(&token))
        .set_json(json!({"amount": 30}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["amount"], 30.0);
    assert_eq!(body["data"]["refund"], 30.0);
}

#[actix_rt::test]
async fn test_chargeback_accumulates() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let travel = create_category!(app, token, "Travel", "travel", "expense");
    let id = create_bill!(
        app,
        token,
        json!({"type": "expense", "category_id": travel, "amount": 50, "date": today()})
    );

    for (amount, expected) in [(10.1, 10.1), (20.2, 30.3), (19.7, 50.0)] {
        let resp = admin_post!(
            app,
            token,
            &format!("/api/admin/bills/{}/chargeback", id),
            json!({"amount": amount})
        );
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["refund"], expected);
        assert_eq!(body["data"]["refund_type"], 2);
    }

    let resp = admin_post!(
        app,
        token,
        &format!("/api/admin/bills/{}/chargeback", id),
        json!({"amount": 0.01})
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 4000);
}

#[actix_rt::test]
async fn test_concurrent_refunds_are_not_lost() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let food = create_category!(app, token, "Food", "food", "expense");
    let id = create_bill!(
        app,
        token,
        json!({"type": "expense", "category_id": food, "amount": 100, "date": today()})
    );

    let bills = env.services.bills.clone();
    let (a, b) = tokio::join!(bills.refund(id, 30.0), bills.refund(id, 30.0));
    assert!(a.is_ok() && b.is_ok());

    let view = bills.get(id).await.unwrap();
    assert_eq!(view.refund, 60.0);

    // 剩余 40，两笔 30 只能成功一笔
    let (a, b) = tokio::join!(bills.refund(id, 30.0), bills.refund(id, 30.0));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(bills.get(id).await.unwrap().refund, 90.0);
}

#[actix_rt::test]
async fn test_category_delete_moves_bills_to_other() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let snacks = create_category!(app, token, "Snacks", "snacks", "expense");
    let id = create_bill!(
        app,
        token,
        json!({"type": "expense", "category_id": snacks, "amount": 8, "date": today()})
    );

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/categories/{}", snacks))
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/bills/{}", id))
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["category"]["key"], "other");
    assert_eq!(body["data"]["amount"], 8.0);

    let req = test::TestRequest::get()
        .uri("/api/admin/categories")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let keys: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["key"].as_str())
        .collect();
    assert!(keys.contains(&"other"));
    assert!(!keys.contains(&"snacks"));
}

#[actix_rt::test]
async fn test_trend_endpoints_are_zero_filled() {
    let env = common::setup().await;
    let app = init_app!(env);
    let token = login!(app);
    let food = create_category!(app, token, "Food", "food", "expense");
    create_bill!(
        app,
        token,
        json!({"type": "expense", "category_id": food, "amount": 18, "date": today()})
    );

    let req = test::TestRequest::get()
        .uri("/api/admin/bills/daily-trend")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let days = body["data"].as_array().unwrap();
    assert_eq!(days.len(), 30);
    assert_eq!(days[29]["date"], today());
    assert_eq!(days[29]["expense"], 18.0);
    assert!(days[..29].iter().all(|d| d["expense"] == 0.0 && d["income"] == 0.0));

    let req = test::TestRequest::get()
        .uri("/api/admin/bills/monthly-trend")
        .insert_header(common::bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let months = body["data"].as_array().unwrap();
    assert_eq!(months.len(), 12);
    let this_month = Local::now().date_naive().format("%Y-%m").to_string();
    assert_eq!(months[11]["date"], this_month);
    assert_eq!(months[11]["expense"], 18.0);
    assert!(months[..11].iter().all(|m| m["expense"] == 0.0 && m["income"] == 0.0));
}
