//! OpenAPI document for the HTTP API
//!
//! The envelope types below only describe response bodies for the generated
//! document; handlers build the real envelopes with [`common::ApiResponse`].

use serde::Serialize;
use serde_json::Value;
use utoipa::{OpenApi, ToSchema};

use crate::models::{HealthStatus, LoginRequest, User};

/// Envelope carrying a list of users
#[derive(Serialize, ToSchema)]
pub struct UserListEnvelope {
    #[schema(example = 200)]
    pub code: i64,
    #[schema(example = "user list fetched")]
    pub message: String,
    pub data: Vec<User>,
}

/// Pagination metadata
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMetaSchema {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// One page of users
#[derive(Serialize, ToSchema)]
pub struct UserPageSchema {
    pub items: Vec<User>,
    pub meta: PageMetaSchema,
}

/// Envelope carrying a page of users
#[derive(Serialize, ToSchema)]
pub struct UserPageEnvelope {
    pub code: i64,
    pub message: String,
    pub data: UserPageSchema,
}

/// Envelope carrying the health status
#[derive(Serialize, ToSchema)]
pub struct HealthEnvelope {
    pub code: i64,
    pub message: String,
    pub data: HealthStatus,
}

/// Error envelope; `data` depends on the error kind and run mode
#[derive(Serialize, ToSchema)]
pub struct ErrorEnvelope {
    #[schema(example = 400)]
    pub code: i64,
    #[schema(example = "request parameters are malformed")]
    pub message: String,
    #[schema(value_type = Object, nullable)]
    pub data: Value,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "User management API",
        description = "User registration, login and listing behind a uniform {code, message, data} envelope."
    ),
    paths(
        crate::routes::health_check,
        crate::routes::list_users,
        crate::routes::list_users_page,
        crate::routes::register,
        crate::routes::login,
    ),
    components(schemas(
        User,
        LoginRequest,
        HealthStatus,
        UserListEnvelope,
        UserPageEnvelope,
        UserPageSchema,
        PageMetaSchema,
        HealthEnvelope,
        ErrorEnvelope,
    )),
    tags(
        (name = "user", description = "User registration, login and listing"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
