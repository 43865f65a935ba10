use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{CategoryRecord, LocationRecord, PostListing, PostRecord};

pub(super) const POST_COLUMNS: &str = "id, title, text, pub_date, author_id, location_id, \
                                       category_id, is_published, created_at";

#[derive(sqlx::FromRow)]
pub(super) struct PostRow {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub author_id: Uuid,
    pub location_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            text: row.text,
            pub_date: row.pub_date,
            author_id: row.author_id,
            location_id: row.location_id,
            category_id: row.category_id,
            is_published: row.is_published,
            created_at: row.created_at,
        }
    }
}

/// A post joined with its author, category, location and comment count.
/// Category and location columns are NULL when the reference is unset.
#[derive(sqlx::FromRow)]
pub(super) struct PostListingRow {
    #[sqlx(flatten)]
    pub post: PostRow,
    pub author_username: String,
    pub category_title: Option<String>,
    pub category_description: Option<String>,
    pub category_slug: Option<String>,
    pub category_is_published: Option<bool>,
    pub category_created_at: Option<OffsetDateTime>,
    pub location_name: Option<String>,
    pub location_is_published: Option<bool>,
    pub location_created_at: Option<OffsetDateTime>,
    pub comment_count: i64,
}

impl PostListingRow {
    pub fn into_listing(self) -> PostListing {
        let category = match (
            self.post.category_id,
            self.category_title,
            self.category_slug,
            self.category_is_published,
            self.category_created_at,
        ) {
            (Some(id), Some(title), Some(slug), Some(is_published), Some(created_at)) => {
                Some(CategoryRecord {
                    id,
                    title,
                    description: self.category_description.unwrap_or_default(),
                    slug,
                    is_published,
                    created_at,
                })
            }
            _ => None,
        };

        let location = match (
            self.post.location_id,
            self.location_name,
            self.location_is_published,
            self.location_created_at,
        ) {
            (Some(id), Some(name), Some(is_published), Some(created_at)) => Some(LocationRecord {
                id,
                name,
                is_published,
                created_at,
            }),
            _ => None,
        };

        PostListing {
            post: PostRecord::from(self.post),
            author_username: self.author_username,
            category,
            location,
            comment_count: u64::try_from(self.comment_count).unwrap_or(0),
        }
    }
}
