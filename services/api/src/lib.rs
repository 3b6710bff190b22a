//! User management API service
//!
//! Users are registered, listed and looked up behind a uniform
//! `{code, message, data}` envelope. Errors from every route are normalized
//! by one global layer, and non-API paths known to the client router are
//! rendered server-side.

pub mod config;
pub mod doc;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod showcase;
pub mod ssr;
pub mod state;
pub mod telemetry;
pub mod validation;
pub mod wrap;

pub use state::AppState;
