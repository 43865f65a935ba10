//! Who may see and who may change which content.
//!
//! A post is publicly visible when the post and its category are published
//! and its publish time has arrived. Authors always see their own posts.
//! The SQL listing filters in `infra::db::posts` apply the same rule.

use time::OffsetDateTime;
use uuid::Uuid;

use super::entities::{
    CategoryRecord, CommentRecord, LocationRecord, PostListing, PostRecord, UserRecord,
};

pub fn is_publicly_visible(
    post: &PostRecord,
    category: Option<&CategoryRecord>,
    now: OffsetDateTime,
) -> bool {
    post.is_published && category.is_some_and(|c| c.is_published) && post.pub_date <= now
}

pub fn can_view_post(
    post: &PostRecord,
    category: Option<&CategoryRecord>,
    viewer: Option<Uuid>,
    now: OffsetDateTime,
) -> bool {
    viewer == Some(post.author_id) || is_publicly_visible(post, category, now)
}

pub fn can_view_listing(listing: &PostListing, viewer: Option<Uuid>, now: OffsetDateTime) -> bool {
    can_view_post(&listing.post, listing.category.as_ref(), viewer, now)
}

pub fn can_edit_post(post: &PostRecord, user: &UserRecord) -> bool {
    post.author_id == user.id
}

pub fn can_delete_post(post: &PostRecord, user: &UserRecord) -> bool {
    can_edit_post(post, user)
}

pub fn can_edit_comment(comment: &CommentRecord, user: &UserRecord) -> bool {
    comment.author_id == user.id
}

/// Superusers moderate comments; they may delete but not rewrite them.
pub fn can_delete_comment(comment: &CommentRecord, user: &UserRecord) -> bool {
    comment.author_id == user.id || user.is_superuser
}

/// Locations carry their own flag; a hidden location does not hide the post.
pub fn visible_location(listing: &PostListing) -> Option<&LocationRecord> {
    listing.location.as_ref().filter(|location| location.is_published)
}
