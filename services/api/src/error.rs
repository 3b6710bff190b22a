//! Error types for the API service and the global error-normalization layer
//!
//! Handlers return [`ApiResult`]. An [`ApiError`] renders a production-safe
//! `{code, message, data}` envelope on its own and also attaches an
//! [`ErrorReport`] to the response. The [`normalize_errors`] middleware picks
//! that report up, logs it with the request method and path, and rebuilds the
//! envelope with the details the current [`RunMode`] allows.

use std::fmt::Write as _;

use axum::{
    Json,
    extract::{
        Request, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use common::ApiResponse;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info};

use crate::config::RunMode;

/// Path Chrome DevTools probes on every page load; answered quietly
pub const DEVTOOLS_PROBE_PATH: &str = "/.well-known/appspecific/com.chrome.devtools.json";

/// Status and exposure policy attached to each business error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub status: StatusCode,
    pub code: &'static str,
    pub expose_details: bool,
}

/// Domain failures raised deliberately by handlers
#[derive(Error, Debug, Clone)]
pub enum BusinessError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("authentication failed: {0}")]
    Unauthenticated(String),

    #[error("not allowed to {action}")]
    Forbidden { action: String },

    #[error("{resource} already exists")]
    Conflict { resource: String, field: String },

    #[error("{message}")]
    Internal { message: String, context: Value },
}

impl BusinessError {
    pub fn policy(&self) -> ErrorPolicy {
        let (status, code, expose_details) = match self {
            BusinessError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", true),
            BusinessError::InvalidField { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", true)
            }
            BusinessError::Unauthenticated(_) => {
                (StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR", true)
            }
            BusinessError::Forbidden { .. } => (StatusCode::FORBIDDEN, "AUTHORIZATION_ERROR", true),
            BusinessError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT", true),
            BusinessError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", false)
            }
        };

        ErrorPolicy {
            status,
            code,
            expose_details,
        }
    }

    /// Structured context describing the failure
    pub fn context(&self) -> Value {
        match self {
            BusinessError::NotFound { resource } => json!({ "resource": resource }),
            BusinessError::InvalidField { field, reason } => {
                json!({ "field": field, "reason": reason })
            }
            BusinessError::Unauthenticated(reason) => json!({ "reason": reason }),
            BusinessError::Forbidden { action } => json!({ "action": action }),
            BusinessError::Conflict { resource, field } => {
                json!({ "resource": resource, "field": field })
            }
            BusinessError::Internal { context, .. } => context.clone(),
        }
    }
}

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// No route matched the request
    #[error("No route for {method} {path}")]
    RouteNotFound { method: Method, path: String },

    /// Query or body did not match the expected shape
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Body could not be parsed
    #[error("Malformed request: {0}")]
    Parse(String),

    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation(e.body_text()),
            other => ApiError::Parse(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Framework-level classification used for messages and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Parse,
    Business(ErrorPolicy),
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation | ErrorKind::Parse => StatusCode::BAD_REQUEST,
            ErrorKind::Business(policy) => policy.status,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed user-facing message, if the kind has one
    pub fn fixed_message(self) -> Option<&'static str> {
        match self {
            ErrorKind::NotFound => Some("the requested resource does not exist"),
            ErrorKind::Validation => Some("request parameters are malformed"),
            ErrorKind::Parse => Some("request format is invalid"),
            ErrorKind::Business(_) | ErrorKind::Internal => None,
        }
    }
}

/// Everything the error layer needs to render an envelope, detached from the
/// original error so it can travel in response extensions.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    /// Payload that is always safe to return (validation detail, business context)
    pub detail: Value,
    /// The error's source chain, one cause per line
    pub chain: String,
}

impl ErrorReport {
    pub fn from_error(error: &ApiError) -> Self {
        let (kind, detail) = match error {
            ApiError::RouteNotFound { method, path } => (
                ErrorKind::NotFound,
                json!({ "path": path, "method": method.as_str() }),
            ),
            ApiError::Validation(detail) => (ErrorKind::Validation, Value::String(detail.clone())),
            ApiError::Parse(_) => (ErrorKind::Parse, Value::Null),
            ApiError::Business(business) => {
                let policy = business.policy();
                (
                    ErrorKind::Business(policy),
                    json!({
                        "code": policy.code,
                        "context": business.context(),
                        "timestamp": Utc::now().to_rfc3339(),
                    }),
                )
            }
            ApiError::Database(_) | ApiError::Internal(_) => (ErrorKind::Internal, Value::Null),
        };

        Self {
            kind,
            message: error.to_string(),
            detail,
            chain: error_chain(error),
        }
    }

    /// Build the response envelope.
    ///
    /// `request` carries the method and path seen by the error layer; it is
    /// only included in development details.
    pub fn envelope(&self, mode: RunMode, request: Option<(&Method, &str)>) -> ApiResponse<Value> {
        let code = i64::from(self.kind.status().as_u16());

        if let Some(message) = self.kind.fixed_message() {
            return ApiResponse::error(message, code, self.detail.clone());
        }

        match self.kind {
            ErrorKind::Business(policy) if policy.expose_details || mode.is_development() => {
                ApiResponse::error(self.message.clone(), code, self.detail.clone())
            }
            ErrorKind::Business(_) => {
                ApiResponse::error(common::response::FAILURE_MESSAGE, code, Value::Null)
            }
            _ if mode.is_development() => {
                let (method, path) = request
                    .map(|(method, path)| (Value::from(method.as_str()), Value::from(path)))
                    .unwrap_or((Value::Null, Value::Null));
                ApiResponse::error(
                    self.message.clone(),
                    code,
                    json!({ "stack": self.chain, "path": path, "method": method }),
                )
            }
            _ => ApiResponse::error("internal server error", code, Value::Null),
        }
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(chain, "\ncaused by: {}", cause);
        source = cause.source();
    }
    chain
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = ErrorReport::from_error(&self);
        let status = report.kind.status();
        let body = Json(report.envelope(RunMode::Production, None));

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Global error hook: logs every error response and renders its envelope
/// for the configured run mode.
///
/// The router's own 405 for a known path with an unmatched method carries no
/// report; it is answered like an unknown route.
pub async fn normalize_errors(
    State(mode): State<RunMode>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let report = match response.extensions().get::<ErrorReport>() {
        Some(report) => report.clone(),
        None if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
            ErrorReport::from_error(&ApiError::RouteNotFound {
                method: method.clone(),
                path: path.clone(),
            })
        }
        None => return response,
    };

    match report.kind {
        ErrorKind::NotFound => info!(%method, %path, "[404] path not found"),
        ErrorKind::Validation => info!(%method, %path, detail = %report.detail, "[VALIDATION] parameter validation failed"),
        ErrorKind::Parse => info!(%method, %path, error = %report.chain, "[PARSE] request parsing failed"),
        ErrorKind::Business(policy) => info!(
            %method,
            %path,
            code = policy.code,
            context = %report.detail,
            "[BUSINESS] {}",
            report.message
        ),
        ErrorKind::Internal => error!(%method, %path, stack = %report.chain, "[ERROR] route failed"),
    }

    let mut rebuilt = (
        report.kind.status(),
        Json(report.envelope(mode, Some((&method, &path)))),
    )
        .into_response();
    rebuilt.extensions_mut().insert(report);
    rebuilt
}

/// Fallback for requests no route matched
pub async fn not_found(method: Method, uri: Uri) -> Response {
    if uri.path() == DEVTOOLS_PROBE_PATH {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response();
    }

    ApiError::RouteNotFound {
        method,
        path: uri.path().to_string(),
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_of(error: ApiError, mode: RunMode) -> ApiResponse<Value> {
        ErrorReport::from_error(&error).envelope(mode, Some((&Method::GET, "/api/x")))
    }

    #[test]
    fn test_not_found_has_fixed_message() {
        let error = ApiError::RouteNotFound {
            method: Method::POST,
            path: "/api/missing".to_string(),
        };
        let envelope = envelope_of(error, RunMode::Development);

        assert_eq!(envelope.code, 404);
        assert_eq!(envelope.message, "the requested resource does not exist");
        assert_eq!(envelope.data, json!({"path": "/api/missing", "method": "POST"}));
    }

    #[test]
    fn test_validation_and_parse() {
        let envelope = envelope_of(
            ApiError::Validation("missing field `username`".to_string()),
            RunMode::Production,
        );
        assert_eq!(envelope.code, 400);
        assert_eq!(envelope.message, "request parameters are malformed");
        assert_eq!(envelope.data, json!("missing field `username`"));

        let envelope = envelope_of(ApiError::Parse("EOF".to_string()), RunMode::Production);
        assert_eq!(envelope.code, 400);
        assert_eq!(envelope.message, "request format is invalid");
        assert_eq!(envelope.data, Value::Null);
    }

    #[test]
    fn test_internal_hides_details_in_production() {
        let error = ApiError::Internal(anyhow::anyhow!("connection refused"));
        let envelope = envelope_of(error, RunMode::Production);

        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.message, "internal server error");
        assert_eq!(envelope.data, Value::Null);
    }

    #[test]
    fn test_internal_exposes_details_in_development() {
        let error = ApiError::Internal(anyhow::anyhow!("connection refused"));
        let envelope = envelope_of(error, RunMode::Development);

        assert_eq!(envelope.code, 500);
        assert!(envelope.message.contains("connection refused"));
        assert_eq!(envelope.data["path"], "/api/x");
        assert_eq!(envelope.data["method"], "GET");
        assert!(
            envelope.data["stack"]
                .as_str()
                .unwrap()
                .contains("connection refused")
        );
    }

    #[test]
    fn test_business_policies() {
        let cases = [
            (
                BusinessError::NotFound {
                    resource: "user".to_string(),
                },
                404,
                "NOT_FOUND",
            ),
            (
                BusinessError::InvalidField {
                    field: "email".to_string(),
                    reason: "bad".to_string(),
                },
                400,
                "VALIDATION_ERROR",
            ),
            (
                BusinessError::Unauthenticated("no token".to_string()),
                401,
                "AUTHENTICATION_ERROR",
            ),
            (
                BusinessError::Forbidden {
                    action: "delete".to_string(),
                },
                403,
                "AUTHORIZATION_ERROR",
            ),
            (
                BusinessError::Conflict {
                    resource: "username".to_string(),
                    field: "username".to_string(),
                },
                409,
                "CONFLICT",
            ),
        ];

        for (error, status, code) in cases {
            let envelope = envelope_of(ApiError::from(error.clone()), RunMode::Production);
            assert_eq!(envelope.code, status);
            assert_eq!(envelope.message, error.to_string());
            assert_eq!(envelope.data["code"], code);
            assert_eq!(envelope.data["context"], error.context());
            assert!(envelope.data["timestamp"].is_string());
        }
    }

    #[test]
    fn test_internal_business_error_is_not_exposed() {
        let error = BusinessError::Internal {
            message: "storage unavailable".to_string(),
            context: json!({"originalError": "connection reset"}),
        };

        let envelope = envelope_of(error.clone().into(), RunMode::Production);
        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.message, "operation failed");
        assert_eq!(envelope.data, Value::Null);

        let envelope = envelope_of(error.into(), RunMode::Development);
        assert_eq!(envelope.message, "storage unavailable");
        assert_eq!(
            envelope.data["context"],
            json!({"originalError": "connection reset"})
        );
    }

    #[test]
    fn test_into_response_sets_status_and_report() {
        let response = ApiError::Validation("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn test_error_chain_lists_sources() {
        let error = ApiError::Database(common::error::DatabaseError::Query(
            sqlx::Error::RowNotFound,
        ));
        let chain = error_chain(&error);
        assert!(chain.starts_with("Database error"));
        assert!(chain.contains("caused by:"));
    }

    #[tokio::test]
    async fn test_unmatched_method_gets_not_found_envelope() {
        use axum::{Router, body::Body, middleware, routing::get};
        use tower::ServiceExt;

        let app = Router::new()
            .route("/users", get(|| async { "ok" }))
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(
                RunMode::Production,
                normalize_errors,
            ));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/users")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({
                "code": 404,
                "message": "the requested resource does not exist",
                "data": {"path": "/users", "method": "DELETE"}
            })
        );
    }
}
