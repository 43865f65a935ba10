use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::application::{auth::Viewer, feed::FeedError};
use crate::presentation::views::{
    AboutTemplate, CategoryTemplate, FeedView, IndexTemplate, LayoutContext, PostDetailTemplate,
    PostDetailView, ProfileHeader, ProfileTemplate, RulesTemplate, profile_href,
    render_template_response,
};

use super::{HttpState, db_health_response, parse_id, repo_error_to_http, session::CurrentViewer};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

pub(super) async fn index(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.index(query.page.as_deref()).await {
        Ok(page) => {
            let content = FeedView::new("Latest posts", &page, "/", OffsetDateTime::now_utc());
            let view = LayoutContext::new(state.chrome(viewer.as_ref()), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(&state, viewer.as_ref(), "infra::http::index", err),
    }
}

pub(super) async fn category(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.category(&slug, query.page.as_deref()).await {
        Ok(feed) => {
            let base = format!("/category/{}", feed.category.slug);
            let mut content = FeedView::new(
                feed.category.title.clone(),
                &feed.page,
                &base,
                OffsetDateTime::now_utc(),
            );
            content.description =
                Some(feed.category.description.clone()).filter(|text| !text.trim().is_empty());
            let chrome = state
                .chrome(viewer.as_ref())
                .with_title(feed.category.title.clone());
            let view = LayoutContext::new(chrome, content);
            render_template_response(CategoryTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(&state, viewer.as_ref(), "infra::http::category", err),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer_user = viewer.as_ref().map(|viewer| &viewer.user);
    match state
        .feed
        .profile(&username, viewer_user, query.page.as_deref())
        .await
    {
        Ok(feed) => {
            let base = profile_href(&feed.profile.username);
            let mut content = FeedView::new(
                format!("Posts by {}", feed.profile.username),
                &feed.page,
                &base,
                OffsetDateTime::now_utc(),
            );
            content.profile = Some(ProfileHeader::new(&feed.profile, feed.is_owner));
            let chrome = state
                .chrome(viewer.as_ref())
                .with_title(feed.profile.username.clone());
            let view = LayoutContext::new(chrome, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(&state, viewer.as_ref(), "infra::http::profile", err),
    }
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return state.not_found(viewer.as_ref());
    };
    let viewer_user = viewer.as_ref().map(|viewer| &viewer.user);

    match state.feed.post_detail(id, viewer_user).await {
        Ok(detail) => {
            let content = PostDetailView::new(
                &detail.listing,
                &detail.comments,
                viewer_user,
                detail.can_edit,
                OffsetDateTime::now_utc(),
            );
            let chrome = state
                .chrome(viewer.as_ref())
                .with_title(detail.listing.post.title.clone());
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => {
            feed_error_to_response(&state, viewer.as_ref(), "infra::http::post_detail", err)
        }
    }
}

pub(super) async fn about(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
) -> Response {
    let view = LayoutContext::new(state.chrome(viewer.as_ref()).with_title("About"), ());
    render_template_response(AboutTemplate { view }, StatusCode::OK)
}

pub(super) async fn rules(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
) -> Response {
    let view = LayoutContext::new(state.chrome(viewer.as_ref()).with_title("Rules"), ());
    render_template_response(RulesTemplate { view }, StatusCode::OK)
}

pub(super) async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

pub(super) async fn fallback(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
) -> Response {
    state.not_found(viewer.as_ref())
}

fn feed_error_to_response(
    state: &HttpState,
    viewer: Option<&Viewer>,
    source: &'static str,
    err: FeedError,
) -> Response {
    match err {
        FeedError::NotFound => state.not_found(viewer),
        FeedError::Repo(err) => repo_error_to_http(source, err).into_response(),
    }
}
