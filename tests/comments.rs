mod support;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use blogicum::application::comments::{CommentError, CommentForm};
use support::{PostSpec, TestApp};

fn text(value: &str) -> CommentForm {
    CommentForm {
        text: value.to_string(),
    }
}

#[tokio::test]
async fn readers_comment_on_visible_posts() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let reader = app.user("anna").await;
    let travel = app.category("Travel", "travel", true).await;
    let post = app.post(PostSpec::live("Kazan", &author, &travel)).await;

    let comment = app
        .state
        .comments
        .add(&reader, post.id, &text("  Beautiful!  "))
        .await
        .expect("comment");

    assert_eq!(comment.text, "Beautiful!");
    assert_eq!(comment.author_id, reader.id);
    assert_eq!(comment.post_id, post.id);
}

#[tokio::test]
async fn hidden_and_missing_posts_cannot_be_commented() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let reader = app.user("anna").await;
    let travel = app.category("Travel", "travel", true).await;
    let scheduled = app
        .post(PostSpec {
            pub_date: OffsetDateTime::now_utc() + Duration::days(1),
            ..PostSpec::live("Soon", &author, &travel)
        })
        .await;

    assert!(matches!(
        app.state.comments.add(&reader, scheduled.id, &text("Early")).await,
        Err(CommentError::NotFound)
    ));
    assert!(matches!(
        app.state.comments.add(&reader, Uuid::new_v4(), &text("Lost")).await,
        Err(CommentError::NotFound)
    ));

    app.state
        .comments
        .add(&author, scheduled.id, &text("Note to self"))
        .await
        .expect("author comments on own scheduled post");
}

#[tokio::test]
async fn blank_comments_are_rejected() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let travel = app.category("Travel", "travel", true).await;
    let post = app.post(PostSpec::live("Kazan", &author, &travel)).await;

    assert!(matches!(
        app.state.comments.add(&author, post.id, &text("   ")).await,
        Err(CommentError::EmptyText)
    ));
    assert_eq!(app.store.comment_count().await, 0);
}

#[tokio::test]
async fn only_the_comment_author_may_edit() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let reader = app.user("anna").await;
    let admin = app.superuser("root").await;
    let travel = app.category("Travel", "travel", true).await;
    let post = app.post(PostSpec::live("Kazan", &author, &travel)).await;
    let comment = app.comment(&post, &reader, "First").await;

    for outsider in [&author, &admin] {
        assert!(matches!(
            app.state
                .comments
                .update(outsider, post.id, comment.id, &text("Edited"))
                .await,
            Err(CommentError::NotFound)
        ));
    }

    let updated = app
        .state
        .comments
        .update(&reader, post.id, comment.id, &text("Second thoughts"))
        .await
        .expect("author edits");
    assert_eq!(updated.text, "Second thoughts");

    assert!(matches!(
        app.state
            .comments
            .update(&reader, post.id, comment.id, &text(""))
            .await,
        Err(CommentError::EmptyText)
    ));
}

#[tokio::test]
async fn superusers_may_delete_any_comment() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let reader = app.user("anna").await;
    let admin = app.superuser("root").await;
    let travel = app.category("Travel", "travel", true).await;
    let post = app.post(PostSpec::live("Kazan", &author, &travel)).await;
    let first = app.comment(&post, &reader, "First").await;
    let second = app.comment(&post, &reader, "Spam").await;

    assert!(matches!(
        app.state.comments.delete(&author, post.id, first.id).await,
        Err(CommentError::NotFound)
    ));

    app.state
        .comments
        .delete(&reader, post.id, first.id)
        .await
        .expect("author deletes");
    app.state
        .comments
        .load_for_delete(&admin, post.id, second.id)
        .await
        .expect("superuser may confirm");
    app.state
        .comments
        .delete(&admin, post.id, second.id)
        .await
        .expect("superuser deletes");

    assert_eq!(app.store.comment_count().await, 0);
}

#[tokio::test]
async fn comments_must_belong_to_the_post_in_the_url() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let reader = app.user("anna").await;
    let travel = app.category("Travel", "travel", true).await;
    let kazan = app.post(PostSpec::live("Kazan", &author, &travel)).await;
    let sochi = app.post(PostSpec::live("Sochi", &author, &travel)).await;
    let comment = app.comment(&kazan, &reader, "Kazan comment").await;

    assert!(matches!(
        app.state
            .comments
            .load_for_edit(&reader, sochi.id, comment.id)
            .await,
        Err(CommentError::NotFound)
    ));
    assert!(matches!(
        app.state.comments.delete(&reader, sochi.id, comment.id).await,
        Err(CommentError::NotFound)
    ));
    assert!(app.store.comment(comment.id).await.is_some());
}
