use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tracing::info;

use crate::application::{
    auth::{AuthError, LoginForm, RegistrationForm, Viewer},
    error::{ErrorReport, HttpError},
};
use crate::presentation::views::{
    ErrorPageView, ErrorTemplate, LayoutContext, LoginTemplate, LoginView, RegistrationTemplate,
    RegistrationView, render_template_response,
};

use super::{
    HttpState, repo_error_to_http,
    session::{
        CurrentViewer, LOGIN_PATH, clear_session_cookie, safe_next, session_token,
        set_session_cookie,
    },
};

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Both fields may be case-sensitive.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginQuery {
    next: Option<String>,
}

pub(super) async fn login_form(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<LoginQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    render_login(&state, viewer.as_ref(), String::new(), next, Vec::new())
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    match state.auth.login(&form).await {
        Ok(session) => {
            let jar = set_session_cookie(jar, &session, state.secure_cookies);
            let target = next.unwrap_or_else(|| "/".to_string());
            (jar, Redirect::to(&target)).into_response()
        }
        Err(AuthError::InvalidCredentials) => render_login(
            &state,
            viewer.as_ref(),
            form.username,
            next,
            vec![INVALID_LOGIN.to_string()],
        ),
        Err(err) => auth_error_to_response(&state, viewer.as_ref(), "infra::http::auth::login", err),
    }
}

pub(super) async fn registration_form(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
) -> Response {
    render_registration(&state, viewer.as_ref(), &RegistrationForm::default(), Vec::new())
}

pub(super) async fn registration_submit(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Form(form): Form<RegistrationForm>,
) -> Response {
    match state.auth.register(&form).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(AuthError::Invalid(errors)) => {
            render_registration(&state, viewer.as_ref(), &form, errors)
        }
        Err(err) => auth_error_to_response(
            &state,
            viewer.as_ref(),
            "infra::http::auth::registration",
            err,
        ),
    }
}

pub(super) async fn logout(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    jar: CookieJar,
) -> Response {
    if let Some(token) = session_token(&jar) {
        if let Err(err) = state.auth.logout(&token).await {
            return auth_error_to_response(
                &state,
                viewer.as_ref(),
                "infra::http::auth::logout",
                err,
            );
        }
    }
    if let Some(viewer) = viewer.as_ref() {
        info!(
            target = "blogicum::http::auth",
            user_id = %viewer.user.id,
            "user signed out"
        );
    }
    (clear_session_cookie(jar), Redirect::to("/")).into_response()
}

fn render_login(
    state: &HttpState,
    viewer: Option<&Viewer>,
    username: String,
    next: Option<String>,
    errors: Vec<String>,
) -> Response {
    let action = match next {
        Some(next) => format!(
            "{LOGIN_PATH}?next={}",
            utf8_percent_encode(&next, NON_ALPHANUMERIC)
        ),
        None => LOGIN_PATH.to_string(),
    };
    let content = LoginView {
        username,
        action,
        errors,
    };
    let view = LayoutContext::new(state.chrome(viewer).with_title("Sign in"), content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn render_registration(
    state: &HttpState,
    viewer: Option<&Viewer>,
    form: &RegistrationForm,
    errors: Vec<String>,
) -> Response {
    let content = RegistrationView {
        username: form.username.clone(),
        email: form.email.clone(),
        errors,
    };
    let view = LayoutContext::new(state.chrome(viewer).with_title("Sign up"), content);
    render_template_response(RegistrationTemplate { view }, StatusCode::OK)
}

pub(super) fn auth_error_to_response(
    state: &HttpState,
    viewer: Option<&Viewer>,
    source: &'static str,
    err: AuthError,
) -> Response {
    match err {
        AuthError::Throttled { retry_after_secs } => {
            let content = ErrorPageView::too_many_attempts(retry_after_secs);
            let chrome = state.chrome(viewer).with_title(content.title.clone());
            let view = LayoutContext::new(chrome, content);
            let mut response =
                render_template_response(ErrorTemplate { view }, StatusCode::TOO_MANY_REQUESTS);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
            ErrorReport::from_error(source, StatusCode::TOO_MANY_REQUESTS, &err).attach(&mut response);
            response
        }
        AuthError::InvalidCredentials | AuthError::Invalid(_) => {
            HttpError::from_error(source, StatusCode::BAD_REQUEST, "Invalid submission", &err)
                .into_response()
        }
        AuthError::Hashing(_) => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password processing failed",
            &err,
        )
        .into_response(),
        AuthError::Repo(err) => repo_error_to_http(source, err).into_response(),
    }
}
