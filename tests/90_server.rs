mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn spawned_server_serves_actions() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(health["status"], "ok");

    let inserted = client
        .post(format!("{}/action/insertOne", server.base_url))
        .header("apiKey", &server.master_key)
        .json(&common::action("e2e", json!({ "document": { "task": "spawned" } })))
        .send()
        .await?;
    assert_eq!(inserted.status(), StatusCode::CREATED);

    let found: Value = client
        .post(format!("{}/action/find", server.base_url))
        .header("apiKey", &server.master_key)
        .json(&common::action("e2e", json!({ "filter": { "task": "spawned" } })))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(found["documents"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn spawned_server_rejects_missing_key() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .get(format!("{}/users?apiKey=", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = res.json().await?;
    assert!(body["link"].is_string());
    Ok(())
}
