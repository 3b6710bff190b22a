//! Demonstration routes for automatic wrapping and error normalization
//!
//! Handlers here return raw values on purpose; the [`auto_wrap`] layer turns
//! them into envelopes. `/raw` is mounted with wrapping switched off.

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_extra::{
    TypedHeader,
    extract::WithRejection,
    headers::{Authorization, authorization::Bearer},
};
use common::Page;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::{ApiError, ApiResult, BusinessError},
    wrap::{AutoWrap, auto_wrap},
};

/// Header the admin-only route reads the caller's role from
pub const ROLE_HEADER: &str = "x-user-role";

/// Routes mounted under `/examples`
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let wrapped = Router::new()
        .route("/profile", get(profile))
        .route("/users", get(users))
        .route("/simple", post(simple))
        .route("/failure", get(failure))
        .route("/thrown", get(thrown))
        .route("/errors/user/:id", get(user_by_id))
        .route("/errors/validate", post(validate))
        .route("/errors/protected", get(protected))
        .route("/errors/admin-only", delete(admin_only))
        .route("/errors/register", post(register))
        .route("/errors/server-error", get(server_error))
        .route("/errors/framework-error", get(framework_error))
        .route("/errors/error-comparison", get(error_comparison))
        .layer(middleware::from_fn_with_state(AutoWrap(true), auto_wrap));

    let raw = Router::new()
        .route("/raw", get(raw))
        .layer(middleware::from_fn_with_state(AutoWrap(false), auto_wrap));

    wrapped.merge(raw)
}

async fn profile() -> Json<Value> {
    Json(json!({
        "id": 1,
        "username": "ada",
        "email": "ada@example.com",
        "role": "admin"
    }))
}

async fn users() -> Json<Page<Value>> {
    let items = vec![
        json!({ "id": 1, "username": "ada" }),
        json!({ "id": 2, "username": "grace" }),
    ];
    Json(Page::new(items, 2, 1, 10))
}

async fn simple() -> &'static str {
    "Operation completed successfully"
}

async fn failure() -> Json<Value> {
    Json(json!({
        "error": "user not found",
        "code": 404,
        "message": "no user matches the given id"
    }))
}

async fn thrown() -> ApiResult<Json<Value>> {
    Err(anyhow::anyhow!("unexpected failure while loading the report").into())
}

async fn raw() -> Json<Value> {
    Json(json!({ "raw": true, "note": "returned exactly as written" }))
}

async fn user_by_id(
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Value>> {
    if id == 404 {
        return Err(BusinessError::NotFound {
            resource: format!("user {id}"),
        }
        .into());
    }

    Ok(Json(json!({ "id": id, "username": format!("user{id}") })))
}

async fn validate(
    WithRejection(Json(body), _): WithRejection<Json<Value>, ApiError>,
) -> ApiResult<Json<Value>> {
    let email = body
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if !email.contains('@') {
        return Err(BusinessError::InvalidField {
            field: "email".to_string(),
            reason: "must contain '@'".to_string(),
        }
        .into());
    }

    Ok(Json(json!({ "valid": true, "email": email })))
}

async fn protected(
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> ApiResult<Json<Value>> {
    let Some(TypedHeader(Authorization(token))) = bearer else {
        return Err(BusinessError::Unauthenticated("missing bearer token".to_string()).into());
    };

    Ok(Json(json!({
        "authorized": true,
        "tokenLength": token.token().len()
    })))
}

async fn admin_only(headers: HeaderMap) -> ApiResult<Json<Value>> {
    let role = headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if role != "admin" {
        return Err(BusinessError::Forbidden {
            action: "delete users".to_string(),
        }
        .into());
    }

    Ok(Json(json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
struct DemoRegistration {
    username: String,
}

async fn register(
    WithRejection(Json(payload), _): WithRejection<Json<DemoRegistration>, ApiError>,
) -> ApiResult<Json<Value>> {
    if payload.username == "admin" {
        return Err(BusinessError::Conflict {
            resource: "username".to_string(),
            field: "username".to_string(),
        }
        .into());
    }

    Ok(Json(json!({ "username": payload.username, "created": true })))
}

async fn server_error() -> ApiResult<Json<Value>> {
    Err(BusinessError::Internal {
        message: "failed to reach the storage backend".to_string(),
        context: json!({ "originalError": "connection reset by peer" }),
    }
    .into())
}

async fn framework_error() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "service unavailable",
            "message": "the service is under maintenance"
        })),
    )
}

/// Side-by-side description of business and framework errors
async fn error_comparison() -> Json<Value> {
    Json(json!({
        "message": "business errors compared with framework errors",
        "businessErrors": {
            "description": "raised as a BusinessError variant",
            "handling": [
                "the handler returns a BusinessError",
                "the global error layer picks up its report",
                "the HTTP status comes from the variant's policy",
                "the body is an error envelope with code, context and timestamp"
            ],
            "example": {
                "httpStatus": 404,
                "responseBody": {
                    "code": 404,
                    "message": "user 404 not found",
                    "data": {
                        "code": "NOT_FOUND",
                        "context": { "resource": "user 404" },
                        "timestamp": "2024-01-01T00:00:00+00:00"
                    }
                }
            }
        },
        "httpErrors": {
            "description": "status set directly by the handler",
            "handling": [
                "the handler returns its own status and body",
                "the error layer is not involved",
                "suited to system-level conditions such as maintenance"
            ],
            "example": {
                "httpStatus": 503,
                "responseBody": {
                    "error": "service unavailable",
                    "message": "the service is under maintenance"
                }
            }
        }
    }))
}
