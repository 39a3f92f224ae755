use axum::Json;
use serde_json::{json, Value};

/// Liveness only; the store is deliberately not probed.
pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true }))
}
