#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use data_api_rust::auth::{generate_api_key, Role};
use data_api_rust::config::AppConfig;
use data_api_rust::database::{DocumentStore, MemoryStore};
use data_api_rust::services::bootstrap;
use data_api_rust::state::AppState;

/// In-process application over a fresh in-memory store
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub master_key: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let master_key = generate_api_key();
        let mut config = AppConfig::for_tests(master_key.clone());
        customize(&mut config);

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store);
        let effective = bootstrap::ensure_master_principal(&state.users(), &master_key).await;
        assert_eq!(effective.as_deref(), Some(master_key.as_str()));

        Self {
            router: data_api_rust::app(state.clone()),
            state,
            master_key,
        }
    }

    /// Provisions a principal with `role` and returns its plaintext key.
    pub async fn key_for(&self, role: Role) -> String {
        let key = generate_api_key();
        let username = format!("{}-{}", role, &key[..8]);
        self.state
            .users()
            .provision(&username, role, key.clone(), None)
            .await
            .expect("provision test principal");
        key
    }

    /// Writes a raw document into the credential collection.
    pub async fn seed_principal(&self, document: bson::Document) {
        let principals = self.state.principals();
        self.state
            .store
            .insert_one(principals.namespace(), document)
            .await
            .expect("seed principal document");
    }

    pub async fn post(&self, path: &str, key: Option<&str>, body: Value) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header("apiKey", key);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn get(&self, path: &str, key: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(key) = key {
            builder = builder.header("apiKey", key);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Sends a raw request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }
}

/// Request body with the common action fields filled in
pub fn action(collection: &str, extra: Value) -> Value {
    let mut body = serde_json::json!({
        "dataSource": "Cluster0",
        "database": "todo",
        "collection": collection,
    });
    if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), extra) {
        target.extend(fields);
    }
    body
}

/// Asserts the uniform `{error, error_code, link}` error body.
pub fn assert_error_shape(body: &Value) {
    assert!(body["error"].is_string(), "missing error: {body}");
    assert!(
        body["error_code"].is_string() || body["error_code"].is_i64(),
        "missing error_code: {body}"
    );
    assert!(
        body["link"].as_str().map(|l| !l.is_empty()).unwrap_or(false),
        "missing link: {body}"
    );
}

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// The built server binary, running on a free port over the in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub master_key: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let master_key = generate_api_key();

        let child = Command::new(env!("CARGO_BIN_EXE_data-api-rust"))
            .env("PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .env("STORE_BACKEND", "memory")
            .env("MAIN_API_KEY", &master_key)
            .env("APP_ENV", "development")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            master_key,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
