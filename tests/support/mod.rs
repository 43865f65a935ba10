//! In-memory repositories and fixtures shared by the integration tests.
#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::Router;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use blogicum::application::{
    auth::{AuthService, LoginForm, hash_password},
    comments::CommentService,
    feed::FeedService,
    pagination::{PageRequest, Paginator},
    posts::PostService,
    profile::ProfileService,
    repos::{
        CategoriesRepo, CommentsRepo, CreateCategoryParams, CreateCommentParams,
        CreateLocationParams, CreatePostParams, CreateSessionParams, CreateUserParams, HealthRepo,
        LocationsRepo, PostListScope, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo,
        UpdatePostParams, UpdateProfileParams, UsersRepo,
    },
    throttle::LoginThrottle,
};
use blogicum::domain::entities::{
    CategoryRecord, CommentListing, CommentRecord, LocationRecord, PostListing, PostRecord,
    SessionRecord, UserRecord,
};
use blogicum::domain::visibility;
use blogicum::infra::http::{HttpState, build_router};

pub const PASSWORD: &str = "correct-horse-42";

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    sessions: Vec<SessionRecord>,
    categories: Vec<CategoryRecord>,
    locations: Vec<LocationRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
}

impl Tables {
    fn listing(&self, post: &PostRecord) -> PostListing {
        let author_username = self
            .users
            .iter()
            .find(|user| user.id == post.author_id)
            .map(|user| user.username.clone())
            .unwrap_or_default();
        PostListing {
            post: post.clone(),
            author_username,
            category: post
                .category_id
                .and_then(|id| self.categories.iter().find(|c| c.id == id).cloned()),
            location: post
                .location_id
                .and_then(|id| self.locations.iter().find(|l| l.id == id).cloned()),
            comment_count: self
                .comments
                .iter()
                .filter(|comment| comment.post_id == post.id)
                .count() as u64,
        }
    }

    fn scoped(&self, scope: PostListScope, now: OffsetDateTime) -> Vec<PostListing> {
        let mut listings: Vec<PostListing> = self
            .posts
            .iter()
            .map(|post| self.listing(post))
            .filter(|listing| {
                let public = visibility::is_publicly_visible(
                    &listing.post,
                    listing.category.as_ref(),
                    now,
                );
                match scope {
                    PostListScope::Public => public,
                    PostListScope::Category(id) => public && listing.post.category_id == Some(id),
                    PostListScope::Author {
                        author_id,
                        include_hidden,
                    } => listing.post.author_id == author_id && (include_hidden || public),
                }
            })
            .collect();
        listings.sort_by(|a, b| {
            b.post
                .pub_date
                .cmp(&a.post.pub_date)
                .then_with(|| a.post.title.cmp(&b.post.title))
                .then_with(|| a.post.id.cmp(&b.post.id))
        });
        listings
    }
}

/// Every repository trait backed by plain vectors.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.tables.lock().await.comments.len()
    }

    pub async fn post(&self, id: Uuid) -> Option<PostRecord> {
        self.tables
            .lock()
            .await
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub async fn comment(&self, id: Uuid) -> Option<CommentRecord> {
        self.tables
            .lock()
            .await
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .cloned()
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".into(),
            });
        }
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            is_superuser: params.is_superuser,
            is_active: true,
            date_joined: OffsetDateTime::now_utc(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .iter()
            .any(|user| user.username == params.username && user.id != params.id)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".into(),
            });
        }
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == params.id)
            .ok_or(RepoError::NotFound)?;
        user.username = params.username;
        user.first_name = params.first_name;
        user.last_name = params.last_name;
        user.email = params.email;
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let session = SessionRecord {
            id: params.id,
            user_id: params.user_id,
            secret_hash: params.secret_hash,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        self.tables.lock().await.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|s| s.id != id);
        if tables.sessions.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_user_sessions(
        &self,
        user_id: Uuid,
        keep: Option<Uuid>,
    ) -> Result<u64, RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|s| s.user_id != user_id || Some(s.id) == keep);
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|s| s.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut categories = self.tables.lock().await.categories.clone();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.categories.iter().any(|c| c.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "categories_slug_key".into(),
            });
        }
        let category = CategoryRecord {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            slug: params.slug,
            is_published: params.is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn set_published(
        &self,
        slug: &str,
        is_published: bool,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let category = tables
            .categories
            .iter_mut()
            .find(|c| c.slug == slug)
            .ok_or(RepoError::NotFound)?;
        category.is_published = is_published;
        Ok(category.clone())
    }
}

#[async_trait]
impl LocationsRepo for MemoryStore {
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError> {
        let mut locations = self.tables.lock().await.locations.clone();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    async fn find_location(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.locations.iter().find(|l| l.id == id).cloned())
    }

    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        let location = LocationRecord {
            id: Uuid::new_v4(),
            name: params.name,
            is_published: params.is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.lock().await.locations.push(location.clone());
        Ok(location)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostListing>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .scoped(scope, now)
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn count_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.scoped(scope, now).len() as u64)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostListing>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| tables.listing(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let post = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            text: params.text,
            pub_date: params.pub_date,
            author_id: params.author_id,
            location_id: params.location_id,
            category_id: params.category_id,
            is_published: params.is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.lock().await.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.text = params.text;
        post.pub_date = params.pub_date;
        post.category_id = params.category_id;
        post.location_id = params.location_id;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != id);
        if tables.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentListing>, RepoError> {
        let tables = self.tables.lock().await;
        let mut comments: Vec<CommentListing> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| CommentListing {
                comment: comment.clone(),
                author_username: tables
                    .users
                    .iter()
                    .find(|user| user.id == comment.author_id)
                    .map(|user| user.username.clone())
                    .unwrap_or_default(),
            })
            .collect();
        comments.sort_by(|a, b| a.comment.created_at.cmp(&b.comment.created_at));
        Ok(comments)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if !tables.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::NotFound);
        }
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            text: params.text,
            post_id: params.post_id,
            author_id: params.author_id,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: Uuid, text: &str) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let comment = tables
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.text = text.to_string();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// A store plus the services wired over it, as `main` would assemble them.
pub struct TestApp {
    pub store: MemoryStore,
    pub state: HttpState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_page_size(10)
    }

    pub fn with_page_size(per_page: u32) -> Self {
        let store = MemoryStore::default();
        let repo = Arc::new(store.clone());
        let paginator = Paginator::new(std::num::NonZeroU32::new(per_page).expect("page size"));

        let auth = AuthService::new(
            repo.clone(),
            repo.clone(),
            time::Duration::hours(1),
            LoginThrottle::new(Duration::from_secs(300), 3),
        );
        let state = HttpState {
            feed: Arc::new(FeedService::new(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo.clone(),
                paginator,
            )),
            posts: Arc::new(PostService::new(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo.clone(),
            )),
            comments: Arc::new(CommentService::new(repo.clone(), repo.clone())),
            auth: Arc::new(auth),
            profile: Arc::new(ProfileService::new(repo.clone())),
            health: repo,
            site_title: Arc::from("Blogicum"),
            secure_cookies: false,
        };
        Self { store, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn user(&self, username: &str) -> UserRecord {
        self.create_user(username, false).await
    }

    pub async fn superuser(&self, username: &str) -> UserRecord {
        self.create_user(username, true).await
    }

    async fn create_user(&self, username: &str, is_superuser: bool) -> UserRecord {
        UsersRepo::create_user(
            &self.store,
            CreateUserParams {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: format!("{username}@example.com"),
                password_hash: hash_password(PASSWORD).expect("hash"),
                is_superuser,
            },
        )
        .await
        .expect("create user")
    }

    /// Signs in and returns the `Cookie` header value carrying the session.
    pub async fn cookie_for(&self, user: &UserRecord) -> String {
        let session = self
            .state
            .auth
            .login(&LoginForm {
                username: user.username.clone(),
                password: PASSWORD.to_string(),
            })
            .await
            .expect("login");
        format!("blogicum_session={}", session.token)
    }

    pub async fn category(&self, title: &str, slug: &str, is_published: bool) -> CategoryRecord {
        CategoriesRepo::create_category(
            &self.store,
            CreateCategoryParams {
                title: title.to_string(),
                description: format!("All about {title}"),
                slug: slug.to_string(),
                is_published,
            },
        )
        .await
        .expect("create category")
    }

    pub async fn location(&self, name: &str, is_published: bool) -> LocationRecord {
        LocationsRepo::create_location(
            &self.store,
            CreateLocationParams {
                name: name.to_string(),
                is_published,
            },
        )
        .await
        .expect("create location")
    }

    pub async fn post(&self, spec: PostSpec<'_>) -> PostRecord {
        PostsWriteRepo::create_post(
            &self.store,
            CreatePostParams {
                title: spec.title.to_string(),
                text: format!("Body of {}", spec.title),
                pub_date: spec.pub_date,
                author_id: spec.author.id,
                category_id: spec.category.map(|c| c.id),
                location_id: spec.location.map(|l| l.id),
                is_published: spec.is_published,
            },
        )
        .await
        .expect("create post")
    }

    pub async fn comment(&self, post: &PostRecord, author: &UserRecord, text: &str) -> CommentRecord {
        CommentsRepo::create_comment(
            &self.store,
            CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text: text.to_string(),
            },
        )
        .await
        .expect("create comment")
    }
}

pub struct PostSpec<'a> {
    pub title: &'a str,
    pub author: &'a UserRecord,
    pub category: Option<&'a CategoryRecord>,
    pub location: Option<&'a LocationRecord>,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
}

impl<'a> PostSpec<'a> {
    /// A published post, live an hour ago.
    pub fn live(title: &'a str, author: &'a UserRecord, category: &'a CategoryRecord) -> Self {
        Self {
            title,
            author,
            category: Some(category),
            location: None,
            pub_date: OffsetDateTime::now_utc() - time::Duration::hours(1),
            is_published: true,
        }
    }
}
