use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// `200 {success: true, message, data}`.
pub fn ok(message: &str, data: Value) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}

/// `201 {success: true, message, data}` for freshly created resources.
pub fn created(message: &str, data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, ok(message, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let body = ok("done", json!({"id": 1}));
        assert_eq!(body.0["success"], true);
        assert_eq!(body.0["message"], "done");
        assert_eq!(body.0["data"]["id"], 1);
    }

    #[test]
    fn created_is_201() {
        let (status, _) = created("made", json!(null));
        assert_eq!(status, StatusCode::CREATED);
    }
}
