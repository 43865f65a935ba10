//! Accounts and cookie sessions.
//!
//! Passwords are stored as Argon2 PHC strings. A session token has the form
//! `<session-id>_<secret>`; only the SHA-256 digest of the secret is persisted
//! and it is compared in constant time.

use std::sync::{Arc, OnceLock};

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use metrics::counter;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo,
};
use crate::application::throttle::LoginThrottle;
use crate::domain::entities::{UserRecord, validate_username};

pub const MIN_PASSWORD_LEN: usize = 8;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("too many failed sign-in attempts, retry in {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },
    #[error("invalid input: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed session token")]
    Malformed,
    #[error("unknown session")]
    Unknown,
    #[error("session expired")]
    Expired,
    #[error("session owner is missing or inactive")]
    Inactive,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

/// Account created from the command line.
#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// The signed-in user behind a request.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user: UserRecord,
    pub session_id: Uuid,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
    throttle: LoginThrottle,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
        throttle: LoginThrottle,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
            throttle,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<UserRecord, AuthError> {
        let username = form.username.trim();
        let mut errors = Vec::new();
        if let Err(err) = validate_username(username) {
            errors.push(err.into_message());
        }
        errors.extend(password_problems(&form.password1, &form.password2));
        if !errors.is_empty() {
            return Err(AuthError::Invalid(errors));
        }

        let user = self
            .insert_user(CreateUserCommand {
                username: username.to_string(),
                email: form.email.trim().to_string(),
                password: form.password1.clone(),
                is_superuser: false,
            })
            .await?;

        info!(
            target = "application::auth::register",
            user_id = %user.id,
            username = %user.username,
            "user registered"
        );
        Ok(user)
    }

    pub async fn create_user(&self, command: CreateUserCommand) -> Result<UserRecord, AuthError> {
        let mut errors = Vec::new();
        if let Err(err) = validate_username(&command.username) {
            errors.push(err.into_message());
        }
        errors.extend(password_problems(&command.password, &command.password));
        if !errors.is_empty() {
            return Err(AuthError::Invalid(errors));
        }
        self.insert_user(command).await
    }

    pub async fn login(&self, form: &LoginForm) -> Result<IssuedSession, AuthError> {
        let username = form.username.trim();
        if let Err(retry_after_secs) = self.throttle.check(username) {
            warn!(
                target = "application::auth::login",
                username = %username,
                retry_after_secs,
                "sign-in throttled"
            );
            return Err(AuthError::Throttled { retry_after_secs });
        }

        let found = self.users.find_by_username(username).await?;
        let verified = match found.as_ref() {
            Some(user) => verify_password(&form.password, &user.password_hash),
            None => {
                verify_password(&form.password, missing_user_hash());
                false
            }
        };
        let user = match found {
            Some(user) if verified && user.is_active => user,
            _ => {
                self.throttle.record_failure(username);
                counter!("blogicum_sign_in_failed_total").increment(1);
                return Err(AuthError::InvalidCredentials);
            }
        };
        self.throttle.reset(username);

        let issued = self.issue_session(user).await?;
        counter!("blogicum_sign_in_total").increment(1);
        info!(
            target = "application::auth::login",
            user_id = %issued.user.id,
            "user signed in"
        );
        Ok(issued)
    }

    pub async fn authenticate(&self, token: &str) -> Result<Viewer, SessionError> {
        let (session_id, secret) = parse_token(token).ok_or(SessionError::Malformed)?;
        let session = self
            .sessions
            .find_session(session_id)
            .await?
            .ok_or(SessionError::Unknown)?;

        if session.expires_at <= OffsetDateTime::now_utc() {
            return Err(SessionError::Expired);
        }
        if session.secret_hash.ct_eq(&hash_secret(secret)).unwrap_u8() == 0 {
            return Err(SessionError::Unknown);
        }

        let user = self
            .users
            .find_user(session.user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(SessionError::Inactive)?;

        Ok(Viewer {
            user,
            session_id: session.id,
        })
    }

    /// Ends the session named by `token`; unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let Some((session_id, _)) = parse_token(token) else {
            return Ok(());
        };
        match self.sessions.delete_session(session_id).await {
            Ok(()) | Err(RepoError::NotFound) => Ok(()),
            Err(err) => Err(AuthError::Repo(err)),
        }
    }

    /// Changes the password and signs out every other session of the user.
    pub async fn change_password(
        &self,
        viewer: &Viewer,
        form: &PasswordChangeForm,
    ) -> Result<(), AuthError> {
        if !verify_password(&form.old_password, &viewer.user.password_hash) {
            return Err(AuthError::Invalid(vec![
                "Your old password was entered incorrectly.".to_string(),
            ]));
        }
        let errors = password_problems(&form.new_password1, &form.new_password2);
        if !errors.is_empty() {
            return Err(AuthError::Invalid(errors));
        }

        let password_hash = hash_password(&form.new_password1)?;
        self.users
            .update_password(viewer.user.id, &password_hash)
            .await?;
        let revoked = self
            .sessions
            .delete_user_sessions(viewer.user.id, Some(viewer.session_id))
            .await?;

        info!(
            target = "application::auth::change_password",
            user_id = %viewer.user.id,
            revoked_sessions = revoked,
            "password changed"
        );
        Ok(())
    }

    /// Forgets throttle buckets whose failures have left the window.
    pub fn sweep_login_throttle(&self) -> usize {
        self.throttle.sweep()
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        Ok(self
            .sessions
            .purge_expired(OffsetDateTime::now_utc())
            .await?)
    }

    async fn insert_user(&self, command: CreateUserCommand) -> Result<UserRecord, AuthError> {
        if self
            .users
            .find_by_username(&command.username)
            .await?
            .is_some()
        {
            return Err(duplicate_username());
        }

        let password_hash = hash_password(&command.password)?;
        self.users
            .create_user(CreateUserParams {
                username: command.username,
                first_name: String::new(),
                last_name: String::new(),
                email: command.email,
                password_hash,
                is_superuser: command.is_superuser,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => duplicate_username(),
                other => AuthError::Repo(other),
            })
    }

    async fn issue_session(&self, user: UserRecord) -> Result<IssuedSession, AuthError> {
        let session_id = Uuid::new_v4();
        let secret = generate_secret();
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;

        self.sessions
            .create_session(CreateSessionParams {
                id: session_id,
                user_id: user.id,
                secret_hash: hash_secret(&secret),
                expires_at,
            })
            .await?;

        Ok(IssuedSession {
            user,
            token: format!("{}_{secret}", session_id.simple()),
            expires_at,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|err| AuthError::Hashing(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

/// Unknown usernames are verified against this hash so they cost as much as a wrong password.
fn missing_user_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password("blogicum:no-such-user").unwrap_or_default())
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Messages for every rule `password` breaks.
pub fn password_problems(password: &str, confirmation: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password != confirmation {
        problems.push("The two password fields didn't match.".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."
        ));
    }
    if !password.is_empty() && password.chars().all(|ch| ch.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    problems
}

fn duplicate_username() -> AuthError {
    AuthError::Invalid(vec!["A user with that username already exists.".to_string()])
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn parse_token(token: &str) -> Option<(Uuid, &str)> {
    let (id, secret) = token.split_once('_')?;
    if secret.len() < MIN_SECRET_LEN {
        return None;
    }
    let id = Uuid::try_parse(id).ok()?;
    Some((id, secret))
}
