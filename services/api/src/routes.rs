//! API service routes

use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use common::{ApiResponse, Page};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    doc::{ApiDoc, ErrorEnvelope, HealthEnvelope, UserListEnvelope, UserPageEnvelope},
    error::{ApiError, ApiResult, BusinessError, normalize_errors, not_found},
    middleware::log_requests,
    models::{HealthStatus, LoginRequest, PageQuery, RegisterUser, User},
    repositories::is_unique_violation,
    showcase,
    ssr::{PageShell, render_page},
    state::AppState,
    validation::validate_registration,
};

/// Create the application router.
///
/// API routes live under `/api`; anything else is offered to the SSR layer
/// first and ends in the not-found fallback.
pub fn create_router(state: AppState, shell: PageShell, frontend_url: Option<&str>) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/user", get(list_users))
        .route("/user/page", get(list_users_page))
        .route("/user/register", get(register))
        .route("/user/login", post(login))
        .nest("/examples", showcase::router());

    Router::new()
        .nest("/api", api)
        .merge(SwaggerUi::new("/api/swagger").url("/api/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.run_mode,
            normalize_errors,
        ))
        .layer(middleware::from_fn_with_state(shell, render_page))
        .layer(middleware::from_fn(log_requests))
        .layer(cors_layer(frontend_url))
        .with_state(state)
}

/// CORS for the configured frontend origin, or any origin when unset
fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match frontend_url.and_then(|url| HeaderValue::from_str(url).ok()) {
        Some(origin) => cors.allow_origin(origin),
        None => cors.allow_origin(Any),
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses((status = 200, description = "Service health", body = HealthEnvelope))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let database = common::database::health_check(&state.db_pool).await;
    let status = if database { "ok" } else { "degraded" };

    Json(ApiResponse::success(HealthStatus {
        status: status.to_string(),
        database,
    }))
}

/// List all users
#[utoipa::path(
    get,
    path = "/api/user",
    tag = "user",
    responses(
        (status = 200, description = "All users", body = UserListEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.user_repository.get_all().await.map_err(|e| {
        error!("Failed to get users: {}", e);
        ApiError::Internal(e)
    })?;

    Ok(Json(ApiResponse::success_with(users, "user list fetched")))
}

/// List users one page at a time
#[utoipa::path(
    get,
    path = "/api/user/page",
    tag = "user",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of users", body = UserPageEnvelope),
        (status = 400, description = "Malformed query", body = ErrorEnvelope)
    )
)]
pub async fn list_users_page(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, ApiError>,
) -> ApiResult<Json<ApiResponse<Page<User>>>> {
    let (page, page_size) = (query.page(), query.page_size());

    let (users, total) = state
        .user_repository
        .get_page(page_size, query.offset())
        .await
        .map_err(|e| {
            error!("Failed to get user page: {}", e);
            ApiError::Internal(e)
        })?;

    let total = u64::try_from(total).unwrap_or_default();
    Ok(Json(ApiResponse::page(Page::new(
        users, total, page, page_size,
    ))))
}

/// Register a new user from query parameters
#[utoipa::path(
    get,
    path = "/api/user/register",
    tag = "user",
    params(RegisterUser),
    responses(
        (status = 200, description = "The stored user, as a one-element list", body = UserListEnvelope),
        (status = 400, description = "Invalid parameters", body = ErrorEnvelope),
        (status = 409, description = "Username already taken", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<RegisterUser>, ApiError>,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    validate_registration(&query).map_err(ApiError::Validation)?;

    let user = state.user_repository.create(&query).await.map_err(|e| {
        if is_unique_violation(&e) {
            return ApiError::from(BusinessError::Conflict {
                resource: "username".to_string(),
                field: "username".to_string(),
            });
        }

        error!("Failed to create user: {}", e);
        ApiError::Internal(e)
    })?;

    Ok(Json(ApiResponse::success_with(
        vec![user],
        "registration succeeded",
    )))
}

/// Look a user up by username.
///
/// The password is not checked, and an unknown username still yields a
/// success envelope with an empty list.
#[utoipa::path(
    post,
    path = "/api/user/login",
    tag = "user",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Matching users (at most one)", body = UserListEnvelope),
        (status = 400, description = "Malformed body", body = ErrorEnvelope)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let users = state
        .user_repository
        .find_by_username(&payload.username)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            ApiError::Internal(e)
        })?;

    if users.is_empty() {
        warn!(
            username = %payload.username,
            "login for unknown username answered with an empty success"
        );
    }

    Ok(Json(ApiResponse::success_with(users, "login succeeded")))
}
