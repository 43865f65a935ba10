use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::application::{
    auth::Viewer,
    comments::{CommentError, CommentForm},
};
use crate::presentation::views::{
    CommentFormTemplate, CommentFormView, ConfirmDeleteTemplate, ConfirmDeleteView, LayoutContext,
    excerpt, render_template_response,
};

use super::{HttpState, parse_id, repo_error_to_http, session::RequireViewer};

/// An empty comment is dropped silently; the reader lands back on the post.
pub(super) async fn add(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(post_id) = parse_id(&id) else {
        return state.not_found(Some(&viewer));
    };
    match state.comments.add(&viewer.user, post_id, &form).await {
        Ok(_) | Err(CommentError::EmptyText) => post_redirect(post_id),
        Err(err) => comment_error_to_response(&state, &viewer, "infra::http::comments::add", err),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path((id, comment_id)): Path<(String, String)>,
) -> Response {
    let Some((post_id, comment_id)) = parse_ids(&id, &comment_id) else {
        return state.not_found(Some(&viewer));
    };
    match state
        .comments
        .load_for_edit(&viewer.user, post_id, comment_id)
        .await
    {
        Ok(comment) => {
            render_comment_form(&state, &viewer, post_id, comment_id, comment.text, Vec::new())
        }
        Err(err) => comment_error_to_response(&state, &viewer, "infra::http::comments::edit", err),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path((id, comment_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some((post_id, comment_id)) = parse_ids(&id, &comment_id) else {
        return state.not_found(Some(&viewer));
    };
    match state
        .comments
        .update(&viewer.user, post_id, comment_id, &form)
        .await
    {
        Ok(_) => post_redirect(post_id),
        Err(CommentError::EmptyText) => render_comment_form(
            &state,
            &viewer,
            post_id,
            comment_id,
            form.text,
            vec![CommentError::EmptyText.to_string()],
        ),
        Err(err) => comment_error_to_response(&state, &viewer, "infra::http::comments::edit", err),
    }
}

pub(super) async fn delete_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path((id, comment_id)): Path<(String, String)>,
) -> Response {
    let Some((post_id, comment_id)) = parse_ids(&id, &comment_id) else {
        return state.not_found(Some(&viewer));
    };
    match state
        .comments
        .load_for_delete(&viewer.user, post_id, comment_id)
        .await
    {
        Ok(comment) => {
            let content = ConfirmDeleteView {
                heading: "Delete comment".to_string(),
                summary: excerpt(&comment.text),
                action: format!("/posts/{post_id}/delete_comment/{comment_id}"),
                cancel_href: format!("/posts/{post_id}"),
            };
            let chrome = state.chrome(Some(&viewer)).with_title("Delete comment");
            let view = LayoutContext::new(chrome, content);
            render_template_response(ConfirmDeleteTemplate { view }, StatusCode::OK)
        }
        Err(err) => {
            comment_error_to_response(&state, &viewer, "infra::http::comments::delete", err)
        }
    }
}

pub(super) async fn delete_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path((id, comment_id)): Path<(String, String)>,
) -> Response {
    let Some((post_id, comment_id)) = parse_ids(&id, &comment_id) else {
        return state.not_found(Some(&viewer));
    };
    match state
        .comments
        .delete(&viewer.user, post_id, comment_id)
        .await
    {
        Ok(()) => post_redirect(post_id),
        Err(err) => {
            comment_error_to_response(&state, &viewer, "infra::http::comments::delete", err)
        }
    }
}

fn parse_ids(post_id: &str, comment_id: &str) -> Option<(Uuid, Uuid)> {
    Some((parse_id(post_id)?, parse_id(comment_id)?))
}

fn post_redirect(post_id: Uuid) -> Response {
    Redirect::to(&format!("/posts/{post_id}")).into_response()
}

fn render_comment_form(
    state: &HttpState,
    viewer: &Viewer,
    post_id: Uuid,
    comment_id: Uuid,
    text: String,
    errors: Vec<String>,
) -> Response {
    let content = CommentFormView {
        action: format!("/posts/{post_id}/edit_comment/{comment_id}"),
        cancel_href: format!("/posts/{post_id}"),
        text,
        errors,
    };
    let chrome = state.chrome(Some(viewer)).with_title("Edit comment");
    let view = LayoutContext::new(chrome, content);
    render_template_response(CommentFormTemplate { view }, StatusCode::OK)
}

fn comment_error_to_response(
    state: &HttpState,
    viewer: &Viewer,
    source: &'static str,
    err: CommentError,
) -> Response {
    match err {
        CommentError::NotFound => state.not_found(Some(viewer)),
        CommentError::EmptyText => {
            (StatusCode::BAD_REQUEST, "Comment text must not be empty").into_response()
        }
        CommentError::Repo(err) => repo_error_to_http(source, err).into_response(),
    }
}
