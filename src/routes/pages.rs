// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Placeholder HTML pages. The real UI is served by the frontend; these
//! exist so the session gate has page routes to guard and redirect to.

use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{response::Html, routing::get, Extension, Router};
use std::sync::Arc;

/// Public pages.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(home))
}

/// Sign-in pages; the already-signed-in redirect is layered in routes/mod.rs.
pub fn sign_in_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_page))
        .route("/register", get(register_page))
}

/// Pages behind the session gate.
pub fn gated_routes() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard", get(dashboard))
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title} | TaskPilot</title></head>\
         <body><main><h1>{title}</h1>{body}</main></body></html>"
    ))
}

async fn home() -> Html<String> {
    page(
        "TaskPilot",
        "<p>Turn meeting notes into tasks.</p><p><a href=\"/login\">Sign in</a> or <a href=\"/register\">create an account</a>.</p>",
    )
}

async fn login_page() -> Html<String> {
    page("Sign in", "<p>POST your email and password to /api/auth/login.</p>")
}

async fn register_page() -> Html<String> {
    page(
        "Create account",
        "<p>POST your name, email and password to /api/auth/register.</p>",
    )
}

async fn dashboard(Extension(user): Extension<AuthUser>) -> Html<String> {
    page(
        "Dashboard",
        &format!("<p>Signed in as {}.</p>", html_escape(&user.email)),
    )
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<a href=\"x\">'&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }
}
