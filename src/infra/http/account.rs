use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::application::{
    auth::{AuthError, PasswordChangeForm, Viewer},
    profile::{ProfileError, ProfileForm},
};
use crate::presentation::views::{
    EditProfileTemplate, EditProfileView, LayoutContext, PasswordChangeTemplate,
    PasswordChangeView, profile_href, render_template_response,
};

use super::{HttpState, auth::auth_error_to_response, repo_error_to_http, session::RequireViewer};

pub(super) async fn edit_profile_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
) -> Response {
    let form = ProfileForm::from_user(&viewer.user);
    render_edit_profile(&state, &viewer, &form, Vec::new())
}

pub(super) async fn edit_profile_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Form(form): Form<ProfileForm>,
) -> Response {
    match state.profile.update(&viewer.user, &form).await {
        Ok(user) => Redirect::to(&profile_href(&user.username)).into_response(),
        Err(ProfileError::Invalid(errors)) => render_edit_profile(&state, &viewer, &form, errors),
        Err(ProfileError::Repo(err)) => {
            repo_error_to_http("infra::http::account::edit_profile", err).into_response()
        }
    }
}

pub(super) async fn password_change_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
) -> Response {
    render_password_change(&state, &viewer, Vec::new())
}

/// The current session survives; every other session of the user is revoked.
pub(super) async fn password_change_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Form(form): Form<PasswordChangeForm>,
) -> Response {
    match state.auth.change_password(&viewer, &form).await {
        Ok(()) => Redirect::to(&profile_href(&viewer.user.username)).into_response(),
        Err(AuthError::Invalid(errors)) => render_password_change(&state, &viewer, errors),
        Err(err) => auth_error_to_response(
            &state,
            Some(&viewer),
            "infra::http::account::password_change",
            err,
        ),
    }
}

fn render_edit_profile(
    state: &HttpState,
    viewer: &Viewer,
    form: &ProfileForm,
    errors: Vec<String>,
) -> Response {
    let content = EditProfileView {
        username: form.username.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        email: form.email.clone(),
        errors,
    };
    let chrome = state.chrome(Some(viewer)).with_title("Edit profile");
    let view = LayoutContext::new(chrome, content);
    render_template_response(EditProfileTemplate { view }, StatusCode::OK)
}

fn render_password_change(state: &HttpState, viewer: &Viewer, errors: Vec<String>) -> Response {
    let content = PasswordChangeView { errors };
    let chrome = state.chrome(Some(viewer)).with_title("Change password");
    let view = LayoutContext::new(chrome, content);
    render_template_response(PasswordChangeTemplate { view }, StatusCode::OK)
}
