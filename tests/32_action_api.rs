mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};

use common::{action, assert_error_shape, TestApp};

async fn seed(app: &TestApp, collection: &str, documents: Value) {
    let res = app
        .post("/action/insertMany", Some(&app.master_key), action(collection, json!({ "documents": documents })))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
}

#[tokio::test]
async fn insert_one_then_find_one_by_generated_id() {
    let app = TestApp::new().await;
    let key = &app.master_key;

    let inserted = app
        .post("/action/insertOne", Some(key), action("tasks", json!({ "document": { "task": "ship", "points": 3 } })))
        .await;
    assert_eq!(inserted.status, StatusCode::CREATED);
    let id = inserted.body["insertedId"].as_str().expect("insertedId string").to_string();
    assert_eq!(id.len(), 24);

    // Plain JSON has no ObjectId; Extended JSON in the filter restores it
    let request = Request::post("/action/findOne")
        .header("content-type", "application/ejson")
        .header("apiKey", key)
        .body(Body::from(
            action("tasks", json!({ "filter": { "_id": { "$oid": id } } })).to_string(),
        ))
        .unwrap();
    let found = app.send(request).await;

    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(
        found.body["document"],
        json!({ "_id": { "$oid": id }, "task": "ship", "points": 3 })
    );
}

#[tokio::test]
async fn find_one_without_match_returns_null_document() {
    let app = TestApp::new().await;
    let res = app
        .post("/action/findOne", Some(&app.master_key), action("tasks", json!({ "filter": { "missing": true } })))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.as_object().unwrap().contains_key("document"));
    assert_eq!(res.body["document"], Value::Null);
}

#[tokio::test]
async fn insert_many_reports_ids_in_order() {
    let app = TestApp::new().await;
    let res = app
        .post(
            "/action/insertMany",
            Some(&app.master_key),
            action("tasks", json!({ "documents": [{ "_id": "a" }, { "_id": "b" }, { "n": 1 }] })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["insertedCount"], 3);
    let ids = res.body["insertedIds"].as_array().unwrap();
    assert_eq!(ids[0], "a");
    assert_eq!(ids[1], "b");
    assert_eq!(ids[2].as_str().map(str::len), Some(24));
}

#[tokio::test]
async fn find_applies_sort_then_skip_then_limit() {
    let app = TestApp::new().await;
    seed(&app, "scores", json!([{ "v": 30 }, { "v": 10 }, { "v": 20 }])).await;

    let res = app
        .post(
            "/action/find",
            Some(&app.master_key),
            action(
                "scores",
                json!({ "filter": {}, "sort": { "v": 1 }, "skip": 1, "limit": 1, "projection": { "_id": 0 } }),
            ),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["documents"], json!([{ "v": 20 }]));
}

#[tokio::test]
async fn find_with_operators_and_empty_result() {
    let app = TestApp::new().await;
    seed(&app, "tasks", json!([{ "s": "open", "p": 1 }, { "s": "done", "p": 5 }, { "s": "open", "p": 8 }])).await;

    let res = app
        .post(
            "/action/find",
            Some(&app.master_key),
            action("tasks", json!({ "filter": { "s": "open", "p": { "$gte": 2 } }, "projection": { "p": 1, "_id": 0 } })),
        )
        .await;
    assert_eq!(res.body["documents"], json!([{ "p": 8 }]));

    let empty = app
        .post("/action/find", Some(&app.master_key), action("tasks", json!({ "filter": { "s": "archived" } })))
        .await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["documents"], json!([]));
}

#[tokio::test]
async fn update_one_and_update_many_report_counts() {
    let app = TestApp::new().await;
    seed(&app, "tasks", json!([{ "s": "open" }, { "s": "open" }, { "s": "done" }])).await;

    let one = app
        .post(
            "/action/updateOne",
            Some(&app.master_key),
            action("tasks", json!({ "filter": { "s": "open" }, "update": { "$set": { "s": "done" } } })),
        )
        .await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(
        one.body,
        json!({ "matchedCount": 1, "modifiedCount": 1, "upsertedCount": 0, "upsertedId": null })
    );

    let many = app
        .post(
            "/action/update",
            Some(&app.master_key),
            action("tasks", json!({ "filter": {}, "update": { "$inc": { "touched": 1 } } })),
        )
        .await;
    assert_eq!(many.body["matchedCount"], 3);
    assert_eq!(many.body["modifiedCount"], 3);
}

#[tokio::test]
async fn upsert_creates_exactly_one_document() {
    let app = TestApp::new().await;
    let body = action(
        "settings",
        json!({ "filter": { "name": "theme" }, "update": { "$set": { "value": "dark" } }, "upsert": true }),
    );

    let res = app.post("/action/updateOne", Some(&app.master_key), body).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["matchedCount"], 0);
    assert_eq!(res.body["modifiedCount"], 0);
    assert_eq!(res.body["upsertedCount"], 1);
    assert!(res.body["upsertedId"].is_string());

    let all = app
        .post("/action/find", Some(&app.master_key), action("settings", json!({ "filter": {}, "projection": { "_id": 0 } })))
        .await;
    assert_eq!(all.body["documents"], json!([{ "name": "theme", "value": "dark" }]));
}

#[tokio::test]
async fn delete_count_is_idempotent() {
    let app = TestApp::new().await;
    seed(&app, "tasks", json!([{ "s": "x" }, { "s": "x" }, { "s": "y" }])).await;
    let body = action("tasks", json!({ "filter": { "s": "x" } }));

    let first = app.post("/action/delete", Some(&app.master_key), body.clone()).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, json!({ "deletedCount": 2 }));

    let second = app.post("/action/delete", Some(&app.master_key), body).await;
    assert_eq!(second.body, json!({ "deletedCount": 0 }));

    let one = app
        .post("/action/deleteOne", Some(&app.master_key), action("tasks", json!({ "filter": {} })))
        .await;
    assert_eq!(one.body, json!({ "deletedCount": 1 }));
}

#[tokio::test]
async fn aggregate_groups_documents() {
    let app = TestApp::new().await;
    seed(
        &app,
        "tasks",
        json!([{ "s": "open", "p": 1 }, { "s": "done", "p": 5 }, { "s": "open", "p": 2 }]),
    )
    .await;

    let res = app
        .post(
            "/action/aggregate",
            Some(&app.master_key),
            action(
                "tasks",
                json!({ "pipeline": [
                    { "$group": { "_id": "$s", "total": { "$sum": "$p" }, "count": { "$sum": 1 } } },
                    { "$sort": { "total": -1 } }
                ] }),
            ),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body["documents"],
        json!([{ "_id": "done", "total": 5, "count": 1 }, { "_id": "open", "total": 3, "count": 2 }])
    );
}

#[tokio::test]
async fn backend_errors_use_the_uniform_error_body() {
    let app = TestApp::new().await;
    let key = &app.master_key;

    // Replacement document where operators are required
    let res = app
        .post("/action/update", Some(key), action("tasks", json!({ "filter": {}, "update": { "s": "x" } })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_error_shape(&res.body);
    assert_eq!(res.body["error_code"], 9);

    // Unknown pipeline stage
    let res = app
        .post("/action/aggregate", Some(key), action("tasks", json!({ "pipeline": [{ "$teleport": {} }] })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error_code"], 40324);

    // Duplicate identifier
    app.post("/action/insertOne", Some(key), action("tasks", json!({ "document": { "_id": 7 } })))
        .await;
    let dup = app
        .post("/action/insertOne", Some(key), action("tasks", json!({ "document": { "_id": 7 } })))
        .await;
    assert_eq!(dup.status, StatusCode::BAD_REQUEST);
    assert_eq!(dup.body["error_code"], 11000);
}

#[tokio::test]
async fn malformed_requests_are_validation_failures() {
    let app = TestApp::new().await;
    let key = &app.master_key;

    let missing_collection = app
        .post("/action/find", Some(key), json!({ "dataSource": "Cluster0", "database": "todo" }))
        .await;
    assert_eq!(missing_collection.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_collection.body["error_code"], "INVALID_REQUEST");

    let blank_database = app
        .post("/action/find", Some(key), json!({ "database": "", "collection": "tasks" }))
        .await;
    assert_eq!(blank_database.status, StatusCode::BAD_REQUEST);

    let wrong_type = app
        .post("/action/update", Some(key), action("tasks", json!({ "filter": [], "update": { "$set": {} } })))
        .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);

    let not_json = Request::post("/action/find")
        .header("content-type", "application/json")
        .header("apiKey", key)
        .body(Body::from("{\"database\": "))
        .unwrap();
    let res = app.send(not_json).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_error_shape(&res.body);

    let unsupported = Request::post("/action/find")
        .header("content-type", "text/plain")
        .header("apiKey", key)
        .body(Body::from(action("tasks", json!({})).to_string()))
        .unwrap();
    assert_eq!(app.send(unsupported).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn data_source_is_informational() {
    let app = TestApp::new().await;
    let mut body = action("tasks", json!({ "document": { "a": 1 } }));
    body["dataSource"] = json!("SomeOtherCluster");
    app.post("/action/insertOne", Some(&app.master_key), body).await;

    let mut find = action("tasks", json!({ "filter": {} }));
    find.as_object_mut().unwrap().remove("dataSource");
    let res = app.post("/action/find", Some(&app.master_key), find).await;
    assert_eq!(res.body["documents"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn integer_overflow_is_a_backend_error() {
    let app = TestApp::new().await;
    let key = &app.master_key;

    app.post(
        "/action/insertOne",
        Some(key),
        action("counters", json!({ "document": { "_id": "c", "n": i64::MAX } })),
    )
    .await;

    let res = app
        .post(
            "/action/updateOne",
            Some(key),
            action("counters", json!({ "filter": { "_id": "c" }, "update": { "$inc": { "n": i64::MAX } } })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_error_shape(&res.body);
    assert_eq!(res.body["error_code"], 2);

    let found = app
        .post("/action/findOne", Some(key), action("counters", json!({ "filter": { "_id": "c" } })))
        .await;
    assert_eq!(found.body["document"]["n"], i64::MAX);
}
