use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::{
    auth::Viewer,
    posts::{PostError, PostForm},
    repos::RepoError,
};
use crate::presentation::views::{
    ConfirmDeleteTemplate, ConfirmDeleteView, LayoutContext, PostFormTemplate, PostFormView,
    profile_href, render_template_response,
};

use super::{HttpState, parse_id, repo_error_to_http, session::RequireViewer};

pub(super) async fn create_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
) -> Response {
    let form = PostForm::blank(OffsetDateTime::now_utc());
    render_post_form(&state, &viewer, FormTarget::Create, &form, Vec::new()).await
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Form(form): Form<PostForm>,
) -> Response {
    match state.posts.create(&viewer.user, &form).await {
        Ok(_) => Redirect::to(&profile_href(&viewer.user.username)).into_response(),
        Err(PostError::Invalid(errors)) => {
            render_post_form(&state, &viewer, FormTarget::Create, &form, errors).await
        }
        Err(err) => post_error_to_response(&state, &viewer, "infra::http::posts::create", err),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return state.not_found(Some(&viewer));
    };
    match state.posts.load_for_edit(&viewer.user, id).await {
        Ok(listing) => {
            let form = PostForm::from_listing(&listing);
            render_post_form(&state, &viewer, FormTarget::Edit(id), &form, Vec::new()).await
        }
        Err(err) => post_error_to_response(&state, &viewer, "infra::http::posts::edit", err),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return state.not_found(Some(&viewer));
    };
    match state.posts.update(&viewer.user, id, &form).await {
        Ok(record) => Redirect::to(&format!("/posts/{}", record.id)).into_response(),
        Err(PostError::Invalid(errors)) => {
            render_post_form(&state, &viewer, FormTarget::Edit(id), &form, errors).await
        }
        Err(err) => post_error_to_response(&state, &viewer, "infra::http::posts::edit", err),
    }
}

pub(super) async fn delete_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return state.not_found(Some(&viewer));
    };
    match state.posts.load_for_edit(&viewer.user, id).await {
        Ok(listing) => {
            let content = ConfirmDeleteView {
                heading: "Delete post".to_string(),
                summary: listing.post.title.clone(),
                action: format!("/posts/{id}/delete"),
                cancel_href: format!("/posts/{id}"),
            };
            let chrome = state.chrome(Some(&viewer)).with_title("Delete post");
            let view = LayoutContext::new(chrome, content);
            render_template_response(ConfirmDeleteTemplate { view }, StatusCode::OK)
        }
        Err(err) => post_error_to_response(&state, &viewer, "infra::http::posts::delete", err),
    }
}

pub(super) async fn delete_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return state.not_found(Some(&viewer));
    };
    match state.posts.delete(&viewer.user, id).await {
        Ok(()) => Redirect::to(&profile_href(&viewer.user.username)).into_response(),
        Err(err) => post_error_to_response(&state, &viewer, "infra::http::posts::delete", err),
    }
}

#[derive(Clone, Copy)]
enum FormTarget {
    Create,
    Edit(Uuid),
}

impl FormTarget {
    fn heading(self) -> &'static str {
        match self {
            Self::Create => "Publish post",
            Self::Edit(_) => "Save changes",
        }
    }

    fn action(self) -> String {
        match self {
            Self::Create => "/posts/create".to_string(),
            Self::Edit(id) => format!("/posts/{id}/edit"),
        }
    }
}

async fn render_post_form(
    state: &HttpState,
    viewer: &Viewer,
    target: FormTarget,
    form: &PostForm,
    errors: Vec<String>,
) -> Response {
    let choices = match state.posts.form_choices().await {
        Ok(choices) => choices,
        Err(err) => {
            return post_error_to_response(state, viewer, "infra::http::posts::form", err);
        }
    };
    let content = PostFormView::new(target.heading(), target.action(), form, &choices, errors);
    let chrome = state.chrome(Some(viewer)).with_title(target.heading());
    let view = LayoutContext::new(chrome, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

/// Non-authors are sent back to the post rather than shown an error.
fn post_error_to_response(
    state: &HttpState,
    viewer: &Viewer,
    source: &'static str,
    err: PostError,
) -> Response {
    match err {
        PostError::NotFound => state.not_found(Some(viewer)),
        PostError::Forbidden { post_id } => {
            Redirect::to(&format!("/posts/{post_id}")).into_response()
        }
        PostError::Invalid(errors) => repo_error_to_http(
            source,
            RepoError::InvalidInput {
                message: errors.join("; "),
            },
        )
        .into_response(),
        PostError::Repo(err) => repo_error_to_http(source, err).into_response(),
    }
}
