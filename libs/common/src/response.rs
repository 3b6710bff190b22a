//! Uniform response envelope shared by every API route
//!
//! Every JSON body produced by the API has the shape
//! `{ "code": <integer>, "message": <string>, "data": <payload> }`. Paginated
//! payloads nest `{ "items": [...], "meta": {...} }` inside `data`.

use serde::{Deserialize, Serialize};

/// Default message of a success envelope
pub const SUCCESS_MESSAGE: &str = "operation succeeded";
/// Default message of an error envelope built from an error-shaped value
pub const FAILURE_MESSAGE: &str = "operation failed";

/// Default code of a success envelope
pub const SUCCESS_CODE: i64 = 200;

/// The `{code, message, data}` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Build an envelope from its three parts
    pub fn new(code: i64, message: impl Into<String>, data: T) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Success envelope with the default message and code
    pub fn success(data: T) -> Self {
        Self::new(SUCCESS_CODE, SUCCESS_MESSAGE, data)
    }

    /// Success envelope with a custom message
    pub fn success_with(data: T, message: impl Into<String>) -> Self {
        Self::new(SUCCESS_CODE, message, data)
    }
}

impl<T> ApiResponse<Page<T>> {
    /// Success envelope carrying a page of items
    pub fn page(page: Page<T>) -> Self {
        Self::success(page)
    }
}

impl ApiResponse<serde_json::Value> {
    /// Error envelope; `data` is usually `null`
    pub fn error(message: impl Into<String>, code: i64, data: serde_json::Value) -> Self {
        Self::new(code, message, data)
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl PageMeta {
    /// Compute metadata for `total` rows split into pages of `page_size`
    pub fn new(total: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total.div_ceil(u64::from(page_size))
        };

        Self {
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// A page of items with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            meta: PageMeta::new(total, page, page_size),
        }
    }
}
