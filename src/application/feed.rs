//! Read side: the index, category and profile feeds and the post page.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{
    CategoriesRepo, CommentsRepo, PostListScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CategoryRecord, CommentListing, PostListing, UserRecord};
use crate::domain::visibility;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CategoryFeed {
    pub category: CategoryRecord,
    pub page: Page<PostListing>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub profile: UserRecord,
    pub is_owner: bool,
    pub page: Page<PostListing>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub listing: PostListing,
    pub comments: Vec<CommentListing>,
    pub can_edit: bool,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            categories,
            users,
            comments,
            paginator,
        }
    }

    pub async fn index(&self, page: Option<&str>) -> Result<Page<PostListing>, FeedError> {
        self.load_page(PostListScope::Public, page).await
    }

    pub async fn category(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<CategoryFeed, FeedError> {
        let category = self
            .categories
            .find_by_slug(slug)
            .await?
            .filter(|category| category.is_published)
            .ok_or(FeedError::NotFound)?;

        let page = self
            .load_page(PostListScope::Category(category.id), page)
            .await?;
        Ok(CategoryFeed { category, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&UserRecord>,
        page: Option<&str>,
    ) -> Result<ProfileFeed, FeedError> {
        let profile = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::NotFound)?;

        let is_owner = viewer.is_some_and(|viewer| viewer.id == profile.id);
        let scope = PostListScope::Author {
            author_id: profile.id,
            include_hidden: is_owner,
        };
        let page = self.load_page(scope, page).await?;

        Ok(ProfileFeed {
            profile,
            is_owner,
            page,
        })
    }

    pub async fn post_detail(
        &self,
        id: Uuid,
        viewer: Option<&UserRecord>,
    ) -> Result<PostDetail, FeedError> {
        let now = OffsetDateTime::now_utc();
        let viewer_id = viewer.map(|viewer| viewer.id);
        let listing = self
            .posts
            .find_post(id)
            .await?
            .filter(|listing| visibility::can_view_listing(listing, viewer_id, now))
            .ok_or(FeedError::NotFound)?;

        let comments = self.comments.list_for_post(listing.post.id).await?;
        let can_edit = viewer.is_some_and(|viewer| visibility::can_edit_post(&listing.post, viewer));

        Ok(PostDetail {
            listing,
            comments,
            can_edit,
        })
    }

    async fn load_page(
        &self,
        scope: PostListScope,
        page: Option<&str>,
    ) -> Result<Page<PostListing>, FeedError> {
        let now = OffsetDateTime::now_utc();
        let total = self.posts.count_posts(scope, now).await?;
        let request = self.paginator.resolve(page, total);
        let items = self.posts.list_posts(scope, now, request).await?;
        Ok(Page::new(items, request, total))
    }
}
