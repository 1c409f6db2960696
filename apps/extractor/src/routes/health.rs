use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Returns a status object with the service version and the document formats
/// this build can decode.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-extractor",
        "formats": {
            "pdf": cfg!(feature = "pdf"),
            "docx": cfg!(feature = "docx"),
            "doc": cfg!(feature = "doc"),
            "txt": true
        }
    }))
}
