mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};
use std::collections::HashSet;
use uuid::Uuid;

fn ids(page: &Value, field: &str) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item[field].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_records_require_authentication() {
    let app = TestApp::spawn().await;

    for uri in ["/clients", "/companies", "/services", "/tags", "/accounts"] {
        let res = app.request(Method::GET, uri, None, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_client_pagination() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("pager@example.com", "collaborator").await;
    for name in ["One", "Two", "Three"] {
        app.create_client(&token, name).await;
    }

    let first = app.get("/clients?limit=2", &token).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["total"], 3);
    assert_eq!(first.body["limit"], 2);
    assert_eq!(first.body["offset"], 0);
    assert_eq!(first.body["next_offset"], 2);

    let second = app.get("/clients?limit=2&offset=2", &token).await;
    assert_eq!(second.body["items"].as_array().unwrap().len(), 1);
    assert!(second.body["next_offset"].is_null());

    let seen: HashSet<String> = ids(&first.body, "client_id")
        .into_iter()
        .chain(ids(&second.body, "client_id"))
        .collect();
    assert_eq!(seen.len(), 3);

    let empty = app.get("/clients?limit=0", &token).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert!(empty.body["items"].as_array().unwrap().is_empty());
    assert!(empty.body["next_offset"].is_null());
    assert_eq!(empty.body["total"], 3);

    let defaults = app.get("/clients", &token).await;
    assert_eq!(defaults.body["limit"], 20);
    assert_eq!(defaults.body["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_pagination_bounds_are_validated() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("pager@example.com", "collaborator").await;

    let res = app.get("/tags?limit=51", &token).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app.get("/tags?offset=-1", &token).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app.get("/tags?limit=50", &token).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_client_update_and_delete() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("crud@example.com", "collaborator").await;
    let client_id = app.create_client(&token, "Initial").await;

    let res = app
        .put(
            &format!("/clients/{}", client_id),
            &token,
            json!({ "phone": "809-555-0199" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "Initial");
    assert_eq!(res.body["phone"], "809-555-0199");

    let res = app
        .put(
            &format!("/clients/{}", Uuid::new_v4()),
            &token,
            json!({ "name": "Ghost" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.delete(&format!("/clients/{}", client_id), &token).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.get(&format!("/clients/{}", client_id), &token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_company_update_rejects_unknown_person_type() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("crud@example.com", "collaborator").await;
    app.create_company(&token, "130", &[]).await;

    let res = app
        .put("/companies/130", &token, json!({ "person_type": "fisica" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["person_type"], "fisica");

    let res = app
        .put("/companies/130", &token, json!({ "person_type": "robot" }))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_bulk_tag_rename_is_all_or_nothing() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("tags@example.com", "collaborator").await;
    let tags = app.create_tags(&token, &["red", "blue"]).await;
    let missing = Uuid::new_v4();

    let res = app
        .put(
            "/tags",
            &token,
            json!([
                { "tag_id": tags[0], "name": "crimson" },
                { "tag_id": missing, "name": "ghost" },
            ]),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.detail().contains(&missing.to_string()));

    let tag = app.get(&format!("/tags/{}", tags[0]), &token).await;
    assert_eq!(tag.body["name"], "red");

    let res = app
        .put(
            "/tags",
            &token,
            json!([
                { "tag_id": tags[0], "name": "crimson" },
                { "tag_id": tags[1], "name": "navy" },
            ]),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body[0]["name"], "crimson");
    assert_eq!(res.body[1]["name"], "navy");
}

#[tokio::test]
async fn test_bulk_service_rename() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("svc@example.com", "collaborator").await;
    let service_id = app
        .create_service(&token, "Consulting", &[])
        .await
        .id("service_id");

    let res = app
        .put(
            "/services",
            &token,
            json!([{ "service_id": service_id, "name": "Advisory" }]),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body[0]["name"], "Advisory");

    let res = app
        .put(
            "/services",
            &token,
            json!([{ "service_id": service_id, "name": "" }]),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app.get(&format!("/services/{}", service_id), &token).await;
    assert_eq!(res.body["name"], "Advisory");
}

#[tokio::test]
async fn test_empty_batches_are_rejected() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("batch@example.com", "collaborator").await;

    let res = app.post("/tags", &token, json!([])).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app.put("/services", &token, json!([])).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.count("tags").await, 0);
}

#[tokio::test]
async fn test_tag_details_list_services() {
    let app = TestApp::spawn().await;
    let (_, token) = app.signed_in("tags@example.com", "collaborator").await;
    let tags = app.create_tags(&token, &["seasonal"]).await;
    app.create_service(&token, "Inventory", &tags).await;

    let res = app.get(&format!("/tags/{}", tags[0]), &token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["services"][0]["name"], "Inventory");

    let res = app.get(&format!("/tags/{}", Uuid::new_v4()), &token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
