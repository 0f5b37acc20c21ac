// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie transport.
//!
//! Both tokens travel as HttpOnly, SameSite=Lax cookies scoped to `/`, with
//! max-ages matching their token lifetimes. Removal cookies repeat the same
//! attributes so browsers match them to the originals.

use crate::services::session::TokenPair;
use crate::services::token::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build(name)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Add both session cookies for a freshly issued token pair.
pub fn set_session_cookies(jar: CookieJar, tokens: &TokenPair, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        tokens.access.token.clone(),
        ACCESS_TOKEN_TTL_SECS,
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        tokens.refresh.token.clone(),
        REFRESH_TOKEN_TTL_SECS,
        secure,
    ))
}

/// Expire both session cookies. Only cookies the request carried produce a
/// removal header.
pub fn clear_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.remove(removal_cookie(ACCESS_COOKIE, secure))
        .remove(removal_cookie(REFRESH_COOKIE, secure))
}

pub fn access_token(jar: &CookieJar) -> Option<&str> {
    jar.get(ACCESS_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
}

pub fn refresh_token(jar: &CookieJar) -> Option<&str> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
}
