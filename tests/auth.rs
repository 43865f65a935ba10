mod support;

use blogicum::application::{
    auth::{AuthError, LoginForm, PasswordChangeForm, RegistrationForm, SessionError},
    profile::{ProfileError, ProfileForm},
};
use support::{PASSWORD, TestApp};

fn registration(username: &str, password1: &str, password2: &str) -> RegistrationForm {
    RegistrationForm {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password1: password1.to_string(),
        password2: password2.to_string(),
    }
}

fn login(username: &str, password: &str) -> LoginForm {
    LoginForm {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn registered_users_can_sign_in() {
    let app = TestApp::new();

    let user = app
        .state
        .auth
        .register(&registration(" masha ", PASSWORD, PASSWORD))
        .await
        .expect("register");
    assert_eq!(user.username, "masha");
    assert!(!user.is_superuser);
    assert_ne!(user.password_hash, PASSWORD);

    let session = app
        .state
        .auth
        .login(&login("masha", PASSWORD))
        .await
        .expect("login");
    let viewer = app
        .state
        .auth
        .authenticate(&session.token)
        .await
        .expect("authenticate");
    assert_eq!(viewer.user.id, user.id);
}

#[tokio::test]
async fn registration_reports_password_and_username_problems() {
    let app = TestApp::new();

    let err = app
        .state
        .auth
        .register(&registration("bad name!", "12345678", "12345679"))
        .await
        .expect_err("invalid");
    match err {
        AuthError::Invalid(errors) => {
            assert_eq!(errors.len(), 3);
            assert!(errors.iter().any(|e| e.contains("didn't match")));
            assert!(errors.iter().any(|e| e.contains("entirely numeric")));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = app
        .state
        .auth
        .register(&registration("masha", "short", "short"))
        .await
        .expect_err("too short");
    assert!(matches!(err, AuthError::Invalid(errors) if errors[0].contains("too short")));
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() {
    let app = TestApp::new();
    app.user("leo").await;

    let err = app
        .state
        .auth
        .register(&registration("leo", PASSWORD, PASSWORD))
        .await
        .expect_err("duplicate");
    assert!(matches!(
        err,
        AuthError::Invalid(errors) if errors == vec!["A user with that username already exists.".to_string()]
    ));
}

#[tokio::test]
async fn wrong_passwords_and_unknown_users_fail_the_same_way() {
    let app = TestApp::new();
    app.user("leo").await;

    assert!(matches!(
        app.state.auth.login(&login("leo", "wrong-password")).await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        app.state.auth.login(&login("nobody", PASSWORD)).await,
        Err(AuthError::InvalidCredentials)
    ));
    assert_eq!(app.store.session_count().await, 0);
}

#[tokio::test]
async fn repeated_failures_throttle_the_username() {
    let app = TestApp::new();
    app.user("leo").await;
    app.user("anna").await;

    for _ in 0..3 {
        assert!(matches!(
            app.state.auth.login(&login("leo", "wrong-password")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    match app.state.auth.login(&login("LEO", PASSWORD)).await {
        Err(AuthError::Throttled { retry_after_secs }) => {
            assert!((1..=300).contains(&retry_after_secs));
        }
        other => panic!("expected throttling, got {other:?}"),
    }

    app.state
        .auth
        .login(&login("anna", PASSWORD))
        .await
        .expect("other users are unaffected");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    app.user("leo").await;
    let session = app
        .state
        .auth
        .login(&login("leo", PASSWORD))
        .await
        .expect("login");

    app.state.auth.logout(&session.token).await.expect("logout");
    assert!(matches!(
        app.state.auth.authenticate(&session.token).await,
        Err(SessionError::Unknown)
    ));

    app.state
        .auth
        .logout("not-a-token")
        .await
        .expect("garbage tokens are ignored");
    assert!(matches!(
        app.state.auth.authenticate("not-a-token").await,
        Err(SessionError::Malformed)
    ));
}

#[tokio::test]
async fn tampered_secrets_are_rejected() {
    let app = TestApp::new();
    app.user("leo").await;
    let session = app
        .state
        .auth
        .login(&login("leo", PASSWORD))
        .await
        .expect("login");

    let (id, _) = session.token.split_once('_').expect("token shape");
    let forged = format!("{id}_{}", "x".repeat(43));
    assert!(matches!(
        app.state.auth.authenticate(&forged).await,
        Err(SessionError::Unknown)
    ));
}

#[tokio::test]
async fn password_change_revokes_other_sessions() {
    let app = TestApp::new();
    app.user("leo").await;
    let current = app
        .state
        .auth
        .login(&login("leo", PASSWORD))
        .await
        .expect("first login");
    let other = app
        .state
        .auth
        .login(&login("leo", PASSWORD))
        .await
        .expect("second login");
    let viewer = app
        .state
        .auth
        .authenticate(&current.token)
        .await
        .expect("viewer");

    let wrong_old = PasswordChangeForm {
        old_password: "not-it".to_string(),
        new_password1: "brand-new-secret".to_string(),
        new_password2: "brand-new-secret".to_string(),
    };
    assert!(matches!(
        app.state.auth.change_password(&viewer, &wrong_old).await,
        Err(AuthError::Invalid(_))
    ));

    let form = PasswordChangeForm {
        old_password: PASSWORD.to_string(),
        ..wrong_old
    };
    app.state
        .auth
        .change_password(&viewer, &form)
        .await
        .expect("change password");

    assert!(app.state.auth.authenticate(&current.token).await.is_ok());
    assert!(app.state.auth.authenticate(&other.token).await.is_err());
    assert!(matches!(
        app.state.auth.login(&login("leo", PASSWORD)).await,
        Err(AuthError::InvalidCredentials)
    ));
    app.state
        .auth
        .login(&login("leo", "brand-new-secret"))
        .await
        .expect("new password works");
}

#[tokio::test]
async fn profile_update_rejects_taken_usernames() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    app.user("anna").await;

    let taken = ProfileForm {
        username: "anna".to_string(),
        ..ProfileForm::from_user(&leo)
    };
    assert!(matches!(
        app.state.profile.update(&leo, &taken).await,
        Err(ProfileError::Invalid(_))
    ));

    let renamed = ProfileForm {
        username: "leo.t".to_string(),
        first_name: "Lev".to_string(),
        last_name: "Tolstoy".to_string(),
        email: "lev@example.com".to_string(),
    };
    let updated = app
        .state
        .profile
        .update(&leo, &renamed)
        .await
        .expect("update profile");
    assert_eq!(updated.username, "leo.t");
    assert_eq!(updated.first_name, "Lev");

    let bad_email = ProfileForm {
        email: "not-an-email".to_string(),
        ..renamed
    };
    assert!(matches!(
        app.state.profile.update(&updated, &bad_email).await,
        Err(ProfileError::Invalid(errors)) if errors == vec!["Enter a valid email address.".to_string()]
    ));
}

#[tokio::test]
async fn sweeping_keeps_failures_inside_the_window() {
    let app = TestApp::new();
    app.user("leo").await;

    for _ in 0..3 {
        let _ = app.state.auth.login(&login("leo", "wrong-password")).await;
    }
    assert_eq!(app.state.auth.sweep_login_throttle(), 0);
    assert!(matches!(
        app.state.auth.login(&login("leo", PASSWORD)).await,
        Err(AuthError::Throttled { .. })
    ));
}
