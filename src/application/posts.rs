//! Write side for posts: create, edit and delete by their author.

use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CategoriesRepo, CreatePostParams, LocationsRepo, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::{
    CategoryRecord, LocationRecord, POST_TITLE_MAX_LEN, PostListing, PostRecord, UserRecord,
    normalize_required,
};
use crate::domain::visibility;

/// `<input type="datetime-local">` submits minutes, browsers with `step` add seconds.
const PUB_DATE_MINUTES: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const PUB_DATE_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,
    #[error("only the author may change this post")]
    Forbidden { post_id: Uuid },
    #[error("invalid post: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Raw post form fields as submitted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
}

impl PostForm {
    pub fn from_listing(listing: &PostListing) -> Self {
        Self {
            title: listing.post.title.clone(),
            text: listing.post.text.clone(),
            pub_date: format_pub_date(listing.post.pub_date),
            category: listing
                .post
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            location: listing
                .post
                .location_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }

    /// An empty form whose publish time defaults to now.
    pub fn blank(now: OffsetDateTime) -> Self {
        Self {
            pub_date: format_pub_date(now),
            ..Self::default()
        }
    }

    fn clean(&self) -> Result<CleanPost, Vec<String>> {
        let mut errors = Vec::new();

        let title = normalize_required(&self.title, POST_TITLE_MAX_LEN);
        if title.is_none() {
            errors.push(format!(
                "Title is required and must be at most {POST_TITLE_MAX_LEN} characters."
            ));
        }

        let text = self.text.trim();
        if text.is_empty() {
            errors.push("Text is required.".to_string());
        }

        let pub_date = parse_pub_date(&self.pub_date);
        if pub_date.is_none() {
            errors.push("Enter a valid publication date and time.".to_string());
        }

        let category_id = Uuid::parse_str(self.category.trim()).ok();
        if category_id.is_none() {
            errors.push("Choose a category.".to_string());
        }

        let location_id = match self.location.trim() {
            "" => Ok(None),
            raw => Uuid::parse_str(raw).map(Some),
        };
        if location_id.is_err() {
            errors.push("Choose a valid location.".to_string());
        }

        match (title, pub_date, category_id, location_id) {
            (Some(title), Some(pub_date), Some(category_id), Ok(location_id))
                if errors.is_empty() =>
            {
                Ok(CleanPost {
                    title,
                    text: text.to_string(),
                    pub_date,
                    category_id,
                    location_id,
                })
            }
            _ => Err(errors),
        }
    }
}

struct CleanPost {
    title: String,
    text: String,
    pub_date: OffsetDateTime,
    category_id: Uuid,
    location_id: Option<Uuid>,
}

pub fn parse_pub_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    PrimitiveDateTime::parse(raw, PUB_DATE_MINUTES)
        .or_else(|_| PrimitiveDateTime::parse(raw, PUB_DATE_SECONDS))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

pub fn format_pub_date(value: OffsetDateTime) -> String {
    value.format(PUB_DATE_MINUTES).unwrap_or_default()
}

/// Categories and locations offered by the post form.
#[derive(Debug, Clone, Default)]
pub struct PostFormChoices {
    pub categories: Vec<CategoryRecord>,
    pub locations: Vec<LocationRecord>,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    locations: Arc<dyn LocationsRepo>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        locations: Arc<dyn LocationsRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            locations,
        }
    }

    pub async fn form_choices(&self) -> Result<PostFormChoices, PostError> {
        Ok(PostFormChoices {
            categories: self.categories.list_categories().await?,
            locations: self.locations.list_locations().await?,
        })
    }

    /// New posts are published; scheduling is done through the publish date.
    pub async fn create(&self, author: &UserRecord, form: &PostForm) -> Result<PostRecord, PostError> {
        let clean = self.validate(form).await?;

        let record = self
            .writer
            .create_post(CreatePostParams {
                title: clean.title,
                text: clean.text,
                pub_date: clean.pub_date,
                author_id: author.id,
                category_id: Some(clean.category_id),
                location_id: clean.location_id,
                is_published: true,
            })
            .await?;

        counter!("blogicum_posts_created_total").increment(1);
        info!(
            target = "application::posts::create",
            post_id = %record.id,
            author = %author.username,
            "post created"
        );
        Ok(record)
    }

    pub async fn load_for_edit(
        &self,
        viewer: &UserRecord,
        id: Uuid,
    ) -> Result<PostListing, PostError> {
        let listing = self.reader.find_post(id).await?.ok_or(PostError::NotFound)?;
        if !visibility::can_edit_post(&listing.post, viewer) {
            return Err(PostError::Forbidden { post_id: id });
        }
        Ok(listing)
    }

    pub async fn update(
        &self,
        viewer: &UserRecord,
        id: Uuid,
        form: &PostForm,
    ) -> Result<PostRecord, PostError> {
        self.load_for_edit(viewer, id).await?;
        let clean = self.validate(form).await?;

        let record = self
            .writer
            .update_post(UpdatePostParams {
                id,
                title: clean.title,
                text: clean.text,
                pub_date: clean.pub_date,
                category_id: Some(clean.category_id),
                location_id: clean.location_id,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PostError::NotFound,
                other => PostError::Repo(other),
            })?;

        info!(
            target = "application::posts::update",
            post_id = %record.id,
            "post updated"
        );
        Ok(record)
    }

    pub async fn delete(&self, viewer: &UserRecord, id: Uuid) -> Result<(), PostError> {
        let listing = self.reader.find_post(id).await?.ok_or(PostError::NotFound)?;
        if !visibility::can_delete_post(&listing.post, viewer) {
            return Err(PostError::Forbidden { post_id: id });
        }

        self.writer.delete_post(id).await.map_err(|err| match err {
            RepoError::NotFound => PostError::NotFound,
            other => PostError::Repo(other),
        })?;

        info!(
            target = "application::posts::delete",
            post_id = %id,
            "post deleted"
        );
        Ok(())
    }

    async fn validate(&self, form: &PostForm) -> Result<CleanPost, PostError> {
        let clean = form.clean().map_err(PostError::Invalid)?;

        let mut errors = Vec::new();
        if self.categories.find_category(clean.category_id).await?.is_none() {
            errors.push("Choose a category.".to_string());
        }
        if let Some(location_id) = clean.location_id
            && self.locations.find_location(location_id).await?.is_none()
        {
            errors.push("Choose a valid location.".to_string());
        }

        if errors.is_empty() {
            Ok(clean)
        } else {
            Err(PostError::Invalid(errors))
        }
    }
}
