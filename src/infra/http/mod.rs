mod account;
mod auth;
mod comments;
mod middleware;
mod posts;
mod public;
pub mod session;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use crate::application::{
    auth::{AuthService, Viewer},
    comments::CommentService,
    error::{ErrorReport, HttpError},
    feed::FeedService,
    posts::PostService,
    profile::ProfileService,
    repos::{HealthRepo, RepoError},
};
use crate::presentation::views::{LayoutChrome, render_not_found_response};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub auth: Arc<AuthService>,
    pub profile: Arc<ProfileService>,
    pub health: Arc<dyn HealthRepo>,
    pub site_title: Arc<str>,
    pub secure_cookies: bool,
}

impl HttpState {
    pub(crate) fn chrome(&self, viewer: Option<&Viewer>) -> LayoutChrome {
        LayoutChrome::new(&self.site_title, viewer.map(|viewer| &viewer.user))
    }

    pub(crate) fn not_found(&self, viewer: Option<&Viewer>) -> Response {
        render_not_found_response(self.chrome(viewer))
    }
}

pub fn build_router(state: HttpState) -> Router {
    let routes = Router::new()
        .route("/", get(public::index))
        .route("/category/{slug}", get(public::category))
        .route("/profile/{username}", get(public::profile))
        .route("/pages/about", get(public::about))
        .route("/pages/rules", get(public::rules))
        .route("/_health/db", get(public::db_health))
        .route(
            "/posts/create",
            get(posts::create_form).post(posts::create_submit),
        )
        .route("/posts/{id}", get(public::post_detail))
        .route(
            "/posts/{id}/edit",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route(
            "/posts/{id}/delete",
            get(posts::delete_form).post(posts::delete_submit),
        )
        .route("/posts/{id}/comment", post(comments::add))
        .route(
            "/posts/{id}/edit_comment/{comment_id}",
            get(comments::edit_form).post(comments::edit_submit),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}",
            get(comments::delete_form).post(comments::delete_submit),
        )
        .route(
            "/edit_profile",
            get(account::edit_profile_form).post(account::edit_profile_submit),
        )
        .route(
            "/auth/registration",
            get(auth::registration_form).post(auth::registration_submit),
        )
        .route("/auth/login", get(auth::login_form).post(auth::login_submit))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/auth/password_change",
            get(account::password_change_form).post(account::password_change_submit),
        )
        .fallback(public::fallback);

    routes
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session::resolve_viewer,
        ))
        .layer(axum_middleware::from_fn(set_request_context))
        .with_state(state)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Database timeout",
            "Database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}

/// Ids in paths are parsed by hand so malformed ones render the 404 page.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}
