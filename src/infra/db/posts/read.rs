use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{MAX_PER_PAGE, PageRequest};
use crate::application::repos::{PostListScope, PostsRepo, RepoError};
use crate::domain::entities::PostListing;

use super::types::PostListingRow;
use crate::infra::db::{PostgresRepositories, map_sqlx_error};

const LISTING_SELECT: &str = "SELECT p.id, p.title, p.text, p.pub_date, p.author_id, \
        p.location_id, p.category_id, p.is_published, p.created_at, \
        u.username AS author_username, \
        c.title AS category_title, c.description AS category_description, \
        c.slug AS category_slug, c.is_published AS category_is_published, \
        c.created_at AS category_created_at, \
        l.name AS location_name, l.is_published AS location_is_published, \
        l.created_at AS location_created_at, \
        (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count ";

const LISTING_FROM: &str = "FROM posts p \
        INNER JOIN users u ON u.id = p.author_id \
        LEFT JOIN categories c ON c.id = p.category_id \
        LEFT JOIN locations l ON l.id = p.location_id ";

impl PostgresRepositories {
    fn listing_query<'q>() -> QueryBuilder<'q, Postgres> {
        let mut qb = QueryBuilder::new(LISTING_SELECT);
        qb.push(LISTING_FROM);
        qb
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostListing>, RepoError> {
        let limit = i64::from(page.limit.clamp(1, MAX_PER_PAGE));
        let offset = i64::try_from(page.offset)
            .map_err(|_| RepoError::InvalidInput {
                message: "page offset out of range".to_string(),
            })?;

        let mut qb = Self::listing_query();
        qb.push(" WHERE 1=1 ");
        Self::apply_scope_conditions(&mut qb, scope, now);
        qb.push(" ORDER BY p.pub_date DESC, p.title ASC, p.id ASC ");
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostListingRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostListingRow::into_listing).collect())
    }

    async fn count_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) ");
        qb.push(LISTING_FROM);
        qb.push(" WHERE 1=1 ");
        Self::apply_scope_conditions(&mut qb, scope, now);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostListing>, RepoError> {
        let mut qb = Self::listing_query();
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostListingRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostListingRow::into_listing))
    }
}
