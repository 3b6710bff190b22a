//! Server-side rendering of the client application shell
//!
//! Every request that is not handled elsewhere first passes through
//! [`render_page`]: a fresh [`ClientApp`] resolves the path against the client
//! route table and, on a match, the rendered page is spliced into the HTML
//! template at [`ROOT_PLACEHOLDER`]. Paths the client router does not know fall
//! through to the API routes untouched.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use tracing::debug;

/// Marker replaced by the rendered application markup
pub const ROOT_PLACEHOLDER: &str = "%root%";

const DEFAULT_TEMPLATE: &str = include_str!("../templates/index.html");

/// Pages known to the client router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Login,
    Register,
    Users,
}

impl Page {
    pub fn path(self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Login => "/login",
            Page::Register => "/register",
            Page::Users => "/users",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Login => "Sign in",
            Page::Register => "Create an account",
            Page::Users => "Users",
        }
    }

    fn body(self) -> &'static str {
        match self {
            Page::Home => {
                r#"<p>Welcome. <a href="/login">Sign in</a> or <a href="/register">create an account</a>.</p>"#
            }
            Page::Login => concat!(
                r#"<form method="post" action="/api/user/login" data-form="login">"#,
                r#"<label>Username <input name="username" required></label>"#,
                r#"<label>Password <input name="password" type="password" required></label>"#,
                r#"<button type="submit">Sign in</button></form>"#
            ),
            Page::Register => concat!(
                r#"<form method="get" action="/api/user/register" data-form="register">"#,
                r#"<label>Username <input name="username" required></label>"#,
                r#"<label>Email <input name="email" type="email" required></label>"#,
                r#"<label>Password <input name="password" type="password" required></label>"#,
                r#"<button type="submit">Register</button></form>"#
            ),
            Page::Users => r#"<section data-source="/api/user/page"><p>Loading users…</p></section>"#,
        }
    }
}

/// Route table of the client application
#[derive(Debug, Clone)]
pub struct ClientRouter {
    routes: Vec<Page>,
}

impl Default for ClientRouter {
    fn default() -> Self {
        Self {
            routes: vec![Page::Home, Page::Login, Page::Register, Page::Users],
        }
    }
}

impl ClientRouter {
    /// Match a request path; trailing slashes are ignored
    pub fn resolve(&self, path: &str) -> Option<Page> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };

        self.routes
            .iter()
            .copied()
            .find(|page| page.path() == normalized)
    }
}

/// Client application instance, built per request
#[derive(Debug, Default)]
pub struct ClientApp {
    router: ClientRouter,
}

impl ClientApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router(&self) -> &ClientRouter {
        &self.router
    }

    /// Render the application with `page` as the current route
    pub fn render_to_string(&self, page: Page) -> String {
        let nav: String = self
            .router
            .routes
            .iter()
            .map(|route| {
                let current = if *route == page {
                    r#" aria-current="page""#
                } else {
                    ""
                };
                format!(
                    r#"<a href="{}"{}>{}</a>"#,
                    route.path(),
                    current,
                    route.title()
                )
            })
            .collect();

        format!(
            r#"<nav>{nav}</nav><main data-route="{path}"><h1>{title}</h1>{body}</main>"#,
            path = page.path(),
            title = page.title(),
            body = page.body(),
        )
    }
}

/// HTML document the rendered application is spliced into
#[derive(Debug, Clone)]
pub struct PageShell {
    template: Arc<str>,
}

impl Default for PageShell {
    fn default() -> Self {
        Self {
            template: Arc::from(DEFAULT_TEMPLATE),
        }
    }
}

impl PageShell {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(ROOT_PLACEHOLDER) {
            bail!("HTML template has no {} placeholder", ROOT_PLACEHOLDER);
        }

        Ok(Self {
            template: Arc::from(template),
        })
    }

    /// Load the template from `path`, or use the built-in one
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let template = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read HTML template {}", path.display()))?;
                Self::new(template)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn render(&self, app_html: &str) -> String {
        self.template.replacen(ROOT_PLACEHOLDER, app_html, 1)
    }
}

/// Catch-all hook rendering client routes ahead of the API
pub async fn render_page(
    State(shell): State<PageShell>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let app = ClientApp::new();
    let resolved = app.router().resolve(request.uri().path());
    match resolved {
        Some(page) => {
            debug!(path = page.path(), "rendering page");
            Html(shell.render(&app.render_to_string(page))).into_response()
        }
        None => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    #[test]
    fn test_resolve() {
        let router = ClientRouter::default();
        assert_eq!(router.resolve("/"), Some(Page::Home));
        assert_eq!(router.resolve(""), Some(Page::Home));
        assert_eq!(router.resolve("/login"), Some(Page::Login));
        assert_eq!(router.resolve("/users/"), Some(Page::Users));
        assert_eq!(router.resolve("/api/user"), None);
        assert_eq!(router.resolve("/login/extra"), None);
    }

    #[test]
    fn test_render_marks_current_route() {
        let html = ClientApp::new().render_to_string(Page::Login);
        assert!(html.contains(r#"<main data-route="/login">"#));
        assert!(html.contains(r#"<a href="/login" aria-current="page">Sign in</a>"#));
        assert!(html.contains(r#"<a href="/">Home</a>"#));
    }

    #[test]
    fn test_shell_requires_placeholder() {
        assert!(PageShell::new("<html></html>").is_err());

        let shell = PageShell::new("<div>%root%</div><!-- %root% -->").unwrap();
        assert_eq!(shell.render("x"), "<div>x</div><!-- %root% -->");
    }

    #[test]
    fn test_default_shell_has_placeholder() {
        assert!(PageShell::load(None).unwrap().render("APP").contains("APP"));
    }

    fn app() -> Router {
        Router::new()
            .route("/api/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(PageShell::default(), render_page))
    }

    #[tokio::test]
    async fn test_client_routes_are_rendered() {
        let response = app()
            .oneshot(Request::builder().uri("/register").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains(r#"<div id="app"><nav>"#));
        assert!(body.contains(r#"data-form="register""#));
    }

    #[tokio::test]
    async fn test_other_paths_fall_through() {
        let response = app()
            .oneshot(Request::builder().uri("/api/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"pong");

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
