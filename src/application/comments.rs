//! Comments on posts. Anyone signed in may comment on a post they can see;
//! only the author edits a comment, while superusers may also delete it.

use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::domain::entities::{CommentRecord, UserRecord};
use crate::domain::visibility;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment or post not found")]
    NotFound,
    #[error("comment text must not be empty")]
    EmptyText,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    pub async fn add(
        &self,
        viewer: &UserRecord,
        post_id: Uuid,
        form: &CommentForm,
    ) -> Result<CommentRecord, CommentError> {
        let now = OffsetDateTime::now_utc();
        self.posts
            .find_post(post_id)
            .await?
            .filter(|listing| visibility::can_view_listing(listing, Some(viewer.id), now))
            .ok_or(CommentError::NotFound)?;

        let text = clean_text(form)?;
        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: viewer.id,
                text,
            })
            .await
            .map_err(not_found_or_repo)?;

        counter!("blogicum_comments_created_total").increment(1);
        info!(
            target = "application::comments::add",
            post_id = %post_id,
            comment_id = %comment.id,
            author = %viewer.username,
            "comment added"
        );
        Ok(comment)
    }

    /// Only the comment's author gets the comment; anybody else sees a 404.
    pub async fn load_for_edit(
        &self,
        viewer: &UserRecord,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentRecord, CommentError> {
        let comment = self.find_on_post(post_id, comment_id).await?;
        if !visibility::can_edit_comment(&comment, viewer) {
            return Err(CommentError::NotFound);
        }
        Ok(comment)
    }

    pub async fn update(
        &self,
        viewer: &UserRecord,
        post_id: Uuid,
        comment_id: Uuid,
        form: &CommentForm,
    ) -> Result<CommentRecord, CommentError> {
        self.load_for_edit(viewer, post_id, comment_id).await?;
        let text = clean_text(form)?;
        let comment = self
            .comments
            .update_comment(comment_id, &text)
            .await
            .map_err(not_found_or_repo)?;

        info!(
            target = "application::comments::update",
            comment_id = %comment_id,
            "comment updated"
        );
        Ok(comment)
    }

    pub async fn load_for_delete(
        &self,
        viewer: &UserRecord,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentRecord, CommentError> {
        let comment = self.find_on_post(post_id, comment_id).await?;
        if !visibility::can_delete_comment(&comment, viewer) {
            return Err(CommentError::NotFound);
        }
        Ok(comment)
    }

    pub async fn delete(
        &self,
        viewer: &UserRecord,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), CommentError> {
        let comment = self.load_for_delete(viewer, post_id, comment_id).await?;
        self.comments
            .delete_comment(comment.id)
            .await
            .map_err(not_found_or_repo)?;

        info!(
            target = "application::comments::delete",
            comment_id = %comment_id,
            by_author = comment.author_id == viewer.id,
            "comment deleted"
        );
        Ok(())
    }

    async fn find_on_post(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentRecord, CommentError> {
        self.comments
            .find_comment(comment_id)
            .await?
            .filter(|comment| comment.post_id == post_id)
            .ok_or(CommentError::NotFound)
    }
}

fn clean_text(form: &CommentForm) -> Result<String, CommentError> {
    let text = form.text.trim();
    if text.is_empty() {
        Err(CommentError::EmptyText)
    } else {
        Ok(text.to_string())
    }
}

fn not_found_or_repo(err: RepoError) -> CommentError {
    match err {
        RepoError::NotFound => CommentError::NotFound,
        other => CommentError::Repo(other),
    }
}
