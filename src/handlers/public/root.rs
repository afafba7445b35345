use axum::response::Json;
use serde_json::{json, Value};

use crate::types::Operation;

/// GET / - service index
pub async fn root() -> Json<Value> {
    let actions: Vec<String> = Operation::ACTIONS
        .iter()
        .map(|op| format!("POST /action/{}", op.name()))
        .collect();

    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "home": "GET / (public)",
            "health": "GET /health (public)",
            "actions": actions,
            "users": ["POST /users (admin)", "GET /users (admin)"],
        },
        "authentication": "apiKey header or apiKey query parameter",
    }))
}
