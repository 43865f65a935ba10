//! Session cookie handling and the viewer extractors built on it.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Uri, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, warn};

use crate::application::auth::{IssuedSession, SessionError, Viewer};

use super::HttpState;

pub const SESSION_COOKIE: &str = "blogicum_session";
pub const LOGIN_PATH: &str = "/auth/login";

/// Resolves the session cookie into a [`Viewer`] request extension.
/// Stale cookies are removed from the response.
pub async fn resolve_viewer(
    State(state): State<HttpState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(&jar) else {
        return next.run(request).await;
    };

    match state.auth.authenticate(&token).await {
        Ok(viewer) => {
            request.extensions_mut().insert(viewer);
            next.run(request).await
        }
        Err(SessionError::Repo(err)) => {
            warn!(
                target = "blogicum::http::session",
                error = %err,
                "session lookup failed; continuing anonymously"
            );
            next.run(request).await
        }
        Err(err) => {
            debug!(
                target = "blogicum::http::session",
                reason = %err,
                "discarding stale session cookie"
            );
            let response = next.run(request).await;
            (clear_session_cookie(jar), response).into_response()
        }
    }
}

pub fn set_session_cookie(jar: CookieJar, session: &IssuedSession, secure: bool) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .expires(session.expires_at);
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string())
}

/// The viewer if signed in, anonymous otherwise.
pub struct CurrentViewer(pub Option<Viewer>);

impl<S> FromRequestParts<S> for CurrentViewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Viewer>().cloned()))
    }
}

/// Rejects anonymous requests with a redirect to the login page.
pub struct RequireViewer(pub Viewer);

impl<S> FromRequestParts<S> for RequireViewer
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Viewer>()
            .cloned()
            .map(Self)
            .ok_or_else(|| login_redirect(&parts.uri))
    }
}

pub fn login_redirect(uri: &Uri) -> Redirect {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Redirect::to(&format!(
        "{LOGIN_PATH}?next={}",
        utf8_percent_encode(next, NON_ALPHANUMERIC)
    ))
}

/// Only same-site absolute paths are followed after sign-in.
pub fn safe_next(raw: Option<&str>) -> Option<String> {
    let next = raw?.trim();
    let local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    local.then(|| next.to_string())
}
