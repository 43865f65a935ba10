mod support;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use blogicum::application::posts::{PostError, PostForm, format_pub_date};
use support::{PostSpec, TestApp};

fn form(title: &str, category: Uuid) -> PostForm {
    PostForm {
        title: title.to_string(),
        text: "Snow everywhere.".to_string(),
        pub_date: format_pub_date(OffsetDateTime::now_utc() - Duration::hours(1)),
        category: category.to_string(),
        location: String::new(),
    }
}

#[tokio::test]
async fn create_publishes_the_post_for_its_author() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let travel = app.category("Travel", "travel", true).await;
    let kazan = app.location("Kazan", true).await;

    let record = app
        .state
        .posts
        .create(
            &author,
            &PostForm {
                location: kazan.id.to_string(),
                ..form("  Winter  ", travel.id)
            },
        )
        .await
        .expect("create");

    assert_eq!(record.title, "Winter");
    assert_eq!(record.author_id, author.id);
    assert_eq!(record.category_id, Some(travel.id));
    assert_eq!(record.location_id, Some(kazan.id));
    assert!(record.is_published);

    let page = app.state.feed.index(None).await.expect("index");
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn create_reports_every_invalid_field() {
    let app = TestApp::new();
    let author = app.user("leo").await;

    let err = app
        .state
        .posts
        .create(
            &author,
            &PostForm {
                title: "   ".to_string(),
                text: String::new(),
                pub_date: "tomorrow".to_string(),
                category: String::new(),
                location: "nowhere".to_string(),
            },
        )
        .await
        .expect_err("invalid");

    match err {
        PostError::Invalid(errors) => assert_eq!(errors.len(), 5),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn create_rejects_unknown_category_and_location() {
    let app = TestApp::new();
    let author = app.user("leo").await;

    let err = app
        .state
        .posts
        .create(
            &author,
            &PostForm {
                location: Uuid::new_v4().to_string(),
                ..form("Winter", Uuid::new_v4())
            },
        )
        .await
        .expect_err("unknown references");

    match err {
        PostError::Invalid(errors) => {
            assert_eq!(
                errors,
                vec![
                    "Choose a category.".to_string(),
                    "Choose a valid location.".to_string()
                ]
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn titles_longer_than_the_limit_are_rejected() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let travel = app.category("Travel", "travel", true).await;

    let long = "x".repeat(257);
    let result = app.state.posts.create(&author, &form(&long, travel.id)).await;
    assert!(matches!(result, Err(PostError::Invalid(_))));

    let exact = "x".repeat(256);
    assert!(app.state.posts.create(&author, &form(&exact, travel.id)).await.is_ok());
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let admin = app.superuser("root").await;
    let travel = app.category("Travel", "travel", true).await;
    let post = app.post(PostSpec::live("Kazan", &author, &travel)).await;

    assert!(matches!(
        app.state.posts.load_for_edit(&admin, post.id).await,
        Err(PostError::Forbidden { post_id }) if post_id == post.id
    ));
    assert!(matches!(
        app.state.posts.update(&admin, post.id, &form("Hijack", travel.id)).await,
        Err(PostError::Forbidden { .. })
    ));
    assert!(matches!(
        app.state.posts.delete(&admin, post.id).await,
        Err(PostError::Forbidden { .. })
    ));
    assert!(matches!(
        app.state.posts.load_for_edit(&author, Uuid::new_v4()).await,
        Err(PostError::NotFound)
    ));

    let listing = app
        .state
        .posts
        .load_for_edit(&author, post.id)
        .await
        .expect("author loads post");
    assert_eq!(listing.post.id, post.id);
}

#[tokio::test]
async fn update_keeps_author_and_publication_flag() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let travel = app.category("Travel", "travel", true).await;
    let food = app.category("Food", "food", true).await;
    let post = app
        .post(PostSpec {
            is_published: false,
            ..PostSpec::live("Draft", &author, &travel)
        })
        .await;

    let updated = app
        .state
        .posts
        .update(&author, post.id, &form("Renamed", food.id))
        .await
        .expect("update");

    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.category_id, Some(food.id));
    assert_eq!(updated.author_id, author.id);
    assert!(!updated.is_published);
    assert_eq!(updated.created_at, post.created_at);
}

#[tokio::test]
async fn edit_form_round_trips_the_stored_values() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let travel = app.category("Travel", "travel", true).await;
    let post = app.post(PostSpec::live("Kazan", &author, &travel)).await;

    let listing = app
        .state
        .posts
        .load_for_edit(&author, post.id)
        .await
        .expect("load");
    let prefilled = PostForm::from_listing(&listing);
    assert_eq!(prefilled.title, "Kazan");
    assert_eq!(prefilled.category, travel.id.to_string());
    assert!(prefilled.location.is_empty());

    app.state
        .posts
        .update(&author, post.id, &prefilled)
        .await
        .expect("unchanged form is valid");
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let reader = app.user("anna").await;
    let travel = app.category("Travel", "travel", true).await;
    let post = app.post(PostSpec::live("Kazan", &author, &travel)).await;
    app.comment(&post, &reader, "Nice").await;

    app.state
        .posts
        .delete(&author, post.id)
        .await
        .expect("delete");

    assert!(app.store.post(post.id).await.is_none());
    assert_eq!(app.store.comment_count().await, 0);
    assert!(matches!(
        app.state.posts.delete(&author, post.id).await,
        Err(PostError::NotFound)
    ));
}

#[tokio::test]
async fn form_choices_list_every_category_and_location() {
    let app = TestApp::new();
    app.category("Travel", "travel", true).await;
    app.category("Drafts", "drafts", false).await;
    app.location("Kazan", true).await;

    let choices = app.state.posts.form_choices().await.expect("choices");
    assert_eq!(choices.categories.len(), 2);
    assert_eq!(choices.locations.len(), 1);
}

#[tokio::test]
async fn blank_text_is_never_stored() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let travel = app.category("Travel", "travel", true).await;
    let post = app.post(PostSpec::live("Kazan", &author, &travel)).await;

    let blank = PostForm {
        text: " \n ".to_string(),
        ..form("Winter", travel.id)
    };
    assert!(matches!(
        app.state.posts.create(&author, &blank).await,
        Err(PostError::Invalid(errors)) if errors == vec!["Text is required.".to_string()]
    ));
    assert!(matches!(
        app.state.posts.update(&author, post.id, &blank).await,
        Err(PostError::Invalid(_))
    ));
    let stored = app.store.post(post.id).await.expect("post kept");
    assert!(!stored.text.trim().is_empty());
}
