//! Automatic response wrapping for routes that return raw business data
//!
//! Routes mounted behind [`auto_wrap`] may return any JSON value or plain text;
//! the layer decides which envelope to apply from the keys of the value:
//!
//! - `{code, message, data}` is already an envelope and passes through
//! - `{items, meta}` becomes a page envelope
//! - a value with `error` or `isError` becomes an error envelope
//! - anything else becomes a success envelope
//!
//! Routes built on [`common::ApiResponse`] do not need this layer.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use common::{ApiResponse, response::FAILURE_MESSAGE};
use serde_json::{Map, Value};
use tracing::{debug, error};

/// Largest body the layer will buffer for inspection
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Per-route switch for automatic wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoWrap(pub bool);

/// Decide the final body for a handler's raw value
pub fn normalize(value: Value, enabled: bool) -> Value {
    if !enabled {
        return value;
    }

    let object = match value {
        Value::Object(object) => object,
        other => return success(other),
    };

    if has_keys(&object, &["code", "message", "data"]) {
        debug!("[AutoWrap] response is already an envelope");
        return Value::Object(object);
    }

    if has_keys(&object, &["items", "meta"]) {
        debug!("[AutoWrap] page detected");
        return success(Value::Object(object));
    }

    if object.contains_key("error") || object.contains_key("isError") {
        debug!("[AutoWrap] error-shaped response detected");
        return error_envelope(object);
    }

    success(Value::Object(object))
}

fn success(value: Value) -> Value {
    to_value(ApiResponse::success(value))
}

fn error_envelope(object: Map<String, Value>) -> Value {
    let message = [object.get("message"), object.get("error")]
        .into_iter()
        .flatten()
        .find_map(|value| value.as_str().filter(|s| !s.is_empty()))
        .unwrap_or(FAILURE_MESSAGE)
        .to_string();

    // Non-numeric codes (strings, booleans) fall back to 400
    let code = object
        .get("code")
        .and_then(numeric_code)
        .filter(|code| *code != 0)
        .unwrap_or(400);

    let data = object
        .get("data")
        .filter(|data| is_truthy(data))
        .cloned()
        .unwrap_or(Value::Null);

    to_value(ApiResponse::error(message, code, data))
}

fn numeric_code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|code| code.fract() == 0.0 && code.abs() <= i64::MAX as f64)
            .map(|code| code as i64)
    })
}

fn has_keys(object: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().all(|key| object.contains_key(*key))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn to_value<T: serde::Serialize>(response: ApiResponse<T>) -> Value {
    serde_json::to_value(response).unwrap_or(Value::Null)
}

/// Map an envelope code onto an HTTP status when it is a valid one
pub fn status_for_code(code: i64) -> Option<StatusCode> {
    u16::try_from(code)
        .ok()
        .filter(|code| (100..600).contains(code))
        .and_then(|code| StatusCode::from_u16(code).ok())
}

/// Middleware applying [`normalize`] to JSON and plain-text bodies
pub async fn auto_wrap(
    State(AutoWrap(enabled)): State<AutoWrap>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !enabled {
        return response;
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_json = content_type.starts_with("application/json");
    let is_text = content_type.starts_with("text/plain");
    if !is_json && !is_text {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("[AutoWrap] failed to read response body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let value = if is_json {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => value,
            Err(_) => return Response::from_parts(parts, Body::from(bytes)),
        }
    } else {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    };

    let wrapped = normalize(value, true);
    debug!("[AutoWrap] wrapped response: {}", wrapped);

    if parts.status == StatusCode::OK {
        if let Some(status) = wrapped
            .get("code")
            .and_then(Value::as_i64)
            .and_then(status_for_code)
        {
            parts.status = status;
        }
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    let body = serde_json::to_vec(&wrapped).unwrap_or_default();
    Response::from_parts(parts, Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, middleware, routing::get};
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn test_disabled_passes_through() {
        let value = json!({"items": [], "meta": {}});
        assert_eq!(normalize(value.clone(), false), value);
    }

    #[test]
    fn test_envelope_is_idempotent() {
        let value = json!({"code": 418, "message": "teapot", "data": {"items": [], "meta": {}}});
        assert_eq!(normalize(value.clone(), true), value);
        assert_eq!(normalize(normalize(value.clone(), true), true), value);
    }

    #[test]
    fn test_page_is_wrapped_as_success() {
        let page = json!({
            "items": [{"id": 1}],
            "meta": {"total": 1, "page": 1, "pageSize": 10, "totalPages": 1}
        });
        assert_eq!(
            normalize(page.clone(), true),
            json!({"code": 200, "message": "operation succeeded", "data": page})
        );
    }

    #[test]
    fn test_error_shape_uses_supplied_fields() {
        let value = json!({"error": "user missing", "code": 404, "message": "no such user"});
        assert_eq!(
            normalize(value, true),
            json!({"code": 404, "message": "no such user", "data": null})
        );

        let value = json!({"error": "user missing", "data": {"id": 7}});
        assert_eq!(
            normalize(value, true),
            json!({"code": 400, "message": "user missing", "data": {"id": 7}})
        );
    }

    #[test]
    fn test_error_shape_defaults() {
        let value = json!({"isError": true, "code": 0, "message": ""});
        assert_eq!(
            normalize(value, true),
            json!({"code": 400, "message": "operation failed", "data": null})
        );

        let value = json!({"error": "", "data": 0});
        assert_eq!(
            normalize(value, true),
            json!({"code": 400, "message": "operation failed", "data": null})
        );
    }

    #[test]
    fn test_error_shape_accepts_integral_float_code() {
        let value = json!({"error": "gone", "code": 404.0});
        assert_eq!(normalize(value, true)["code"], 404);

        let value = json!({"error": "gone", "code": "404"});
        assert_eq!(normalize(value, true)["code"], 400);
    }

    #[test]
    fn test_envelope_with_error_flag_passes_through() {
        let value = json!({"isError": true, "code": 0, "message": "", "data": 0});
        assert_eq!(normalize(value.clone(), true), value);
    }

    #[test]
    fn test_other_values_are_wrapped_as_success() {
        for value in [
            json!({"name": "user", "id": 1}),
            json!("Operation completed successfully"),
            json!([1, 2, 3]),
            json!(null),
            json!({"code": 1, "message": "missing data key"}),
        ] {
            assert_eq!(
                normalize(value.clone(), true),
                json!({"code": 200, "message": "operation succeeded", "data": value})
            );
        }
    }

    #[test]
    fn test_status_for_code() {
        assert_eq!(status_for_code(404), Some(StatusCode::NOT_FOUND));
        assert_eq!(status_for_code(10010), None);
        assert_eq!(status_for_code(-1), None);
        assert_eq!(status_for_code(42), None);
    }

    fn app(enabled: bool) -> Router {
        Router::new()
            .route("/json", get(|| async { Json(json!({"id": 1})) }))
            .route("/text", get(|| async { "done" }))
            .route(
                "/failure",
                get(|| async { Json(json!({"error": "gone", "code": 410})) }),
            )
            .route(
                "/maintenance",
                get(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({"error": "unavailable", "message": "down for maintenance"})),
                    )
                }),
            )
            .layer(middleware::from_fn_with_state(AutoWrap(enabled), auto_wrap))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_layer_wraps_json_and_text() {
        let (status, body) = call(app(true), "/json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"code": 200, "message": "operation succeeded", "data": {"id": 1}}));

        let (_, body) = call(app(true), "/text").await;
        assert_eq!(body["data"], "done");
    }

    #[tokio::test]
    async fn test_layer_sets_status_from_error_code() {
        let (status, body) = call(app(true), "/failure").await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body, json!({"code": 410, "message": "gone", "data": null}));
    }

    #[tokio::test]
    async fn test_layer_keeps_explicit_status() {
        let (status, body) = call(app(true), "/maintenance").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], 400);
        assert_eq!(body["message"], "down for maintenance");
    }

    #[tokio::test]
    async fn test_layer_disabled_passes_through() {
        let (status, body) = call(app(false), "/json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1}));
    }
}
