mod common;

use common::*;
use serde_json::json;

const SCHEMA_DOC: &str = r#"{"type":"object","properties":{"team":{"type":"string"}}}"#;

#[tokio::test]
async fn creates_and_lists_metaschemas() {
    let t = harness();

    let (status, created) = post(
        &t.app,
        "/v1beta1/meta/schemas",
        None,
        json!({ "name": "organization", "schema": SCHEMA_DOC }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(created["name"], "organization");
    assert!(!created["id"].as_str().unwrap().is_empty());

    let (status, listed) = get(&t.app, "/v1beta1/meta/schemas", None).await;
    assert_eq!(status, 200);
    assert_eq!(listed["metaschemas"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejects_blank_name_or_schema() {
    let t = harness();
    let (status, _) = post(
        &t.app,
        "/v1beta1/meta/schemas",
        None,
        json!({ "name": "", "schema": SCHEMA_DOC }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = post(
        &t.app,
        "/v1beta1/meta/schemas",
        None,
        json!({ "name": "organization", "schema": "" }),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn duplicate_name_conflicts() {
    let t = harness();
    let body = json!({ "name": "organization", "schema": SCHEMA_DOC });
    let (status, _) = post(&t.app, "/v1beta1/meta/schemas", None, body.clone()).await;
    assert_eq!(status, 201);
    let (status, _) = post(&t.app, "/v1beta1/meta/schemas", None, body).await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn blank_id_reads_as_not_found() {
    let t = harness();
    let (status, body) = get(&t.app, "/v1beta1/meta/schemas/%20", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "metaschema doesn't exist");
}

#[tokio::test]
async fn updates_and_deletes_a_metaschema() {
    let t = harness();
    let (_, created) = post(
        &t.app,
        "/v1beta1/meta/schemas",
        None,
        json!({ "name": "organization", "schema": SCHEMA_DOC }),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = put(
        &t.app,
        &format!("/v1beta1/meta/schemas/{id}"),
        None,
        json!({ "name": "org-v2", "schema": SCHEMA_DOC }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(updated["name"], "org-v2");

    let (status, _) = put(
        &t.app,
        "/v1beta1/meta/schemas/missing",
        None,
        json!({ "name": "x-v2", "schema": SCHEMA_DOC }),
    )
    .await;
    assert_eq!(status, 404);

    let (status, _) = delete(&t.app, &format!("/v1beta1/meta/schemas/{id}"), None).await;
    assert_eq!(status, 200);

    let (status, _) = get(&t.app, &format!("/v1beta1/meta/schemas/{id}"), None).await;
    assert_eq!(status, 404);
}
