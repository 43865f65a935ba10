use std::{process, sync::Arc, time::Duration};

use blogicum::{
    application::{
        auth::{AuthService, CreateUserCommand},
        catalog::{CatalogService, CreateCategoryCommand, CreateLocationCommand},
        comments::CommentService,
        error::AppError,
        feed::FeedService,
        pagination::Paginator,
        posts::PostService,
        profile::ProfileService,
        repos::{
            CategoriesRepo, CommentsRepo, HealthRepo, LocationsRepo, PostsRepo, PostsWriteRepo,
            SessionsRepo, UsersRepo,
        },
        throttle::LoginThrottle,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateUser(args) => run_create_user(settings, args).await,
        config::Command::Categories(args) => run_categories(settings, args).await,
        config::Command::Locations(args) => run_locations(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings)?;

    let purge_handle = spawn_session_purger(state.auth.clone());
    let result = serve_http(&settings, state).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

async fn run_create_user(
    settings: config::Settings,
    args: config::CreateUserArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let auth = build_auth_service(&repositories, &settings)?;

    let user = auth
        .create_user(CreateUserCommand {
            username: args.username,
            email: args.email,
            password: args.password,
            is_superuser: args.superuser,
        })
        .await
        .map_err(|err| AppError::validation(err.to_string()))?;

    info!(
        target = "blogicum::create_user",
        user_id = %user.id,
        username = %user.username,
        superuser = user.is_superuser,
        "user created"
    );
    Ok(())
}

async fn run_categories(
    settings: config::Settings,
    args: config::CategoriesArgs,
) -> Result<(), AppError> {
    let catalog = build_catalog_service(init_repositories(&settings).await?);

    match args.command {
        config::CategoriesCommand::List => {
            let categories = catalog
                .list_categories()
                .await
                .map_err(|err| AppError::unexpected(err.to_string()))?;
            for category in categories {
                println!(
                    "{}\t{}\t{}",
                    category.slug,
                    if category.is_published { "published" } else { "hidden" },
                    category.title
                );
            }
        }
        config::CategoriesCommand::Create {
            title,
            description,
            slug,
            unpublished,
        } => {
            let category = catalog
                .create_category(CreateCategoryCommand {
                    title,
                    description,
                    slug,
                    is_published: !unpublished,
                })
                .await
                .map_err(|err| AppError::validation(err.to_string()))?;
            println!("{}", category.slug);
        }
        config::CategoriesCommand::Publish { slug } => {
            catalog
                .set_category_published(&slug, true)
                .await
                .map_err(|err| AppError::validation(err.to_string()))?;
        }
        config::CategoriesCommand::Unpublish { slug } => {
            catalog
                .set_category_published(&slug, false)
                .await
                .map_err(|err| AppError::validation(err.to_string()))?;
        }
    }
    Ok(())
}

async fn run_locations(
    settings: config::Settings,
    args: config::LocationsArgs,
) -> Result<(), AppError> {
    let catalog = build_catalog_service(init_repositories(&settings).await?);

    match args.command {
        config::LocationsCommand::List => {
            let locations = catalog
                .list_locations()
                .await
                .map_err(|err| AppError::unexpected(err.to_string()))?;
            for location in locations {
                println!(
                    "{}\t{}\t{}",
                    location.id,
                    if location.is_published { "published" } else { "hidden" },
                    location.name
                );
            }
        }
        config::LocationsCommand::Create { name, unpublished } => {
            let location = catalog
                .create_location(CreateLocationCommand {
                    name,
                    is_published: !unpublished,
                })
                .await
                .map_err(|err| AppError::validation(err.to_string()))?;
            println!("{}", location.id);
        }
    }
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_auth_service(
    repositories: &Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<AuthService, AppError> {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();

    let session_ttl = time::Duration::try_from(settings.auth.session_ttl)
        .map_err(|err| InfraError::configuration(format!("auth.session_ttl_hours: {err}")))?;
    let throttle = LoginThrottle::new(
        settings.auth.login_window,
        settings.auth.login_max_attempts.get(),
    );

    Ok(AuthService::new(
        users_repo,
        sessions_repo,
        session_ttl,
        throttle,
    ))
}

fn build_catalog_service(repositories: Arc<PostgresRepositories>) -> CatalogService {
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let locations_repo: Arc<dyn LocationsRepo> = repositories;
    CatalogService::new(categories_repo, locations_repo)
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let locations_repo: Arc<dyn LocationsRepo> = repositories.clone();
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories.clone();

    let paginator = Paginator::new(settings.site.posts_per_page);
    let auth = build_auth_service(&repositories, settings)?;

    let feed = FeedService::new(
        posts_repo.clone(),
        categories_repo.clone(),
        users_repo.clone(),
        comments_repo.clone(),
        paginator,
    );
    let posts = PostService::new(
        posts_repo.clone(),
        posts_write_repo,
        categories_repo,
        locations_repo,
    );
    let comments = CommentService::new(posts_repo, comments_repo);
    let profile = ProfileService::new(users_repo);

    Ok(HttpState {
        feed: Arc::new(feed),
        posts: Arc::new(posts),
        comments: Arc::new(comments),
        auth: Arc::new(auth),
        profile: Arc::new(profile),
        health: health_repo,
        site_title: Arc::from(settings.site.title.as_str()),
        secure_cookies: settings.auth.secure_cookies,
    })
}

fn spawn_session_purger(auth: Arc<AuthService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let swept = auth.sweep_login_throttle();
            if swept > 0 {
                info!(
                    target = "blogicum::sessions",
                    swept,
                    "stale sign-in throttle entries removed"
                );
            }
            match auth.purge_expired_sessions().await {
                Ok(purged) => {
                    if purged > 0 {
                        info!(
                            target = "blogicum::sessions",
                            purged,
                            "expired sessions removed"
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        target = "blogicum::sessions",
                        error = %err,
                        "failed to purge expired sessions"
                    );
                }
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "blogicum::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "blogicum::serve", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = "blogicum::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "blogicum::serve", "shutdown requested");
}
