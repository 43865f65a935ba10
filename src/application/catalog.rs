//! Categories and locations, managed from the command line.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CategoriesRepo, CreateCategoryParams, CreateLocationParams, LocationsRepo, RepoError,
};
use crate::domain::entities::{
    CATEGORY_TITLE_MAX_LEN, CategoryRecord, LOCATION_NAME_MAX_LEN, LocationRecord,
    normalize_required,
};
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, is_valid_slug};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid `{0}`")]
    ConstraintViolation(&'static str),
    #[error("slug `{0}` is already taken")]
    SlugTaken(String),
    #[error("category `{0}` not found")]
    UnknownCategory(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateCategoryCommand {
    pub title: String,
    pub description: String,
    pub slug: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct CreateLocationCommand {
    pub name: String,
    pub is_published: bool,
}

#[derive(Clone)]
pub struct CatalogService {
    categories: Arc<dyn CategoriesRepo>,
    locations: Arc<dyn LocationsRepo>,
}

impl CatalogService {
    pub fn new(categories: Arc<dyn CategoriesRepo>, locations: Arc<dyn LocationsRepo>) -> Self {
        Self {
            categories,
            locations,
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryRecord>, CatalogError> {
        self.categories
            .list_categories()
            .await
            .map_err(CatalogError::from)
    }

    pub async fn list_locations(&self) -> Result<Vec<LocationRecord>, CatalogError> {
        self.locations
            .list_locations()
            .await
            .map_err(CatalogError::from)
    }

    /// An explicit slug is used verbatim; otherwise one is derived from the title.
    pub async fn create_category(
        &self,
        command: CreateCategoryCommand,
    ) -> Result<CategoryRecord, CatalogError> {
        let title = normalize_required(&command.title, CATEGORY_TITLE_MAX_LEN)
            .ok_or(CatalogError::ConstraintViolation("title"))?;
        let description = command.description.trim().to_string();

        let slug = match command.slug.as_deref().map(str::trim) {
            Some(explicit) => {
                if !is_valid_slug(explicit) {
                    return Err(CatalogError::ConstraintViolation("slug"));
                }
                if self.categories.find_by_slug(explicit).await?.is_some() {
                    return Err(CatalogError::SlugTaken(explicit.to_string()));
                }
                explicit.to_string()
            }
            None => self.unique_slug(&title).await?,
        };

        let category = self
            .categories
            .create_category(CreateCategoryParams {
                title,
                description,
                slug: slug.clone(),
                is_published: command.is_published,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => CatalogError::SlugTaken(slug),
                other => CatalogError::Repo(other),
            })?;

        info!(
            target = "application::catalog::create_category",
            slug = %category.slug,
            is_published = category.is_published,
            "category created"
        );
        Ok(category)
    }

    pub async fn set_category_published(
        &self,
        slug: &str,
        is_published: bool,
    ) -> Result<CategoryRecord, CatalogError> {
        let category = self
            .categories
            .set_published(slug, is_published)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => CatalogError::UnknownCategory(slug.to_string()),
                other => CatalogError::Repo(other),
            })?;

        info!(
            target = "application::catalog::set_category_published",
            slug = %category.slug,
            is_published,
            "category publication changed"
        );
        Ok(category)
    }

    pub async fn create_location(
        &self,
        command: CreateLocationCommand,
    ) -> Result<LocationRecord, CatalogError> {
        let name = normalize_required(&command.name, LOCATION_NAME_MAX_LEN)
            .ok_or(CatalogError::ConstraintViolation("name"))?;

        let location = self
            .locations
            .create_location(CreateLocationParams {
                name,
                is_published: command.is_published,
            })
            .await?;

        info!(
            target = "application::catalog::create_location",
            location_id = %location.id,
            "location created"
        );
        Ok(location)
    }

    async fn unique_slug(&self, title: &str) -> Result<String, CatalogError> {
        let categories = self.categories.clone();
        match generate_unique_slug_async(title, move |candidate| {
            let categories = categories.clone();
            let candidate = candidate.to_string();
            async move {
                categories
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await
        {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Slug(
                SlugError::EmptyInput | SlugError::Unrepresentable { .. },
            )) => Err(CatalogError::ConstraintViolation("title")),
            Err(SlugAsyncError::Slug(SlugError::Exhausted { .. })) => {
                Err(CatalogError::ConstraintViolation("slug"))
            }
            Err(SlugAsyncError::Predicate(err)) => Err(CatalogError::Repo(err)),
        }
    }
}
