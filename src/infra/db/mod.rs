//! Postgres-backed repository implementations.

mod categories;
mod comments;
mod locations;
mod posts;
mod sessions;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};
use time::OffsetDateTime;

use crate::application::repos::{HealthRepo, PostListScope, RepoError};

/// `domain::visibility::is_publicly_visible` as a SQL predicate over `p` and `c`.
const PUBLICLY_VISIBLE_SQL: &str = " AND p.is_published AND c.is_published AND p.pub_date <= ";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    fn apply_scope_conditions<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        scope: PostListScope,
        now: OffsetDateTime,
    ) {
        match scope {
            PostListScope::Public => {
                qb.push(PUBLICLY_VISIBLE_SQL);
                qb.push_bind(now);
            }
            PostListScope::Category(category_id) => {
                qb.push(" AND p.category_id = ");
                qb.push_bind(category_id);
                qb.push(PUBLICLY_VISIBLE_SQL);
                qb.push_bind(now);
            }
            PostListScope::Author {
                author_id,
                include_hidden,
            } => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
                if !include_hidden {
                    qb.push(PUBLICLY_VISIBLE_SQL);
                    qb.push_bind(now);
                }
            }
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn health_check(&self) -> Result<(), RepoError> {
        query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}
