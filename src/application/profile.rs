use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::application::repos::{RepoError, UpdateProfileParams, UsersRepo};
use crate::domain::entities::{UserRecord, validate_username};

const NAME_MAX_LEN: usize = 150;
const EMAIL_MAX_LEN: usize = 254;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl ProfileForm {
    pub fn from_user(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }

    fn clean(&self) -> Result<UpdateProfileFields, Vec<String>> {
        let mut errors = Vec::new();
        let username = self.username.trim();
        if let Err(err) = validate_username(username) {
            errors.push(err.into_message());
        }

        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        if first_name.chars().count() > NAME_MAX_LEN || last_name.chars().count() > NAME_MAX_LEN {
            errors.push(format!("Names must be at most {NAME_MAX_LEN} characters."));
        }

        let email = self.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.push("Enter a valid email address.".to_string());
        }

        if errors.is_empty() {
            Ok(UpdateProfileFields {
                username: username.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
            })
        } else {
            Err(errors)
        }
    }
}

struct UpdateProfileFields {
    username: String,
    first_name: String,
    last_name: String,
    email: String,
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().count() > EMAIL_MAX_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UsersRepo>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    pub async fn update(
        &self,
        viewer: &UserRecord,
        form: &ProfileForm,
    ) -> Result<UserRecord, ProfileError> {
        let fields = form.clean().map_err(ProfileError::Invalid)?;

        if fields.username != viewer.username
            && self.users.find_by_username(&fields.username).await?.is_some()
        {
            return Err(duplicate_username());
        }

        let updated = self
            .users
            .update_profile(UpdateProfileParams {
                id: viewer.id,
                username: fields.username,
                first_name: fields.first_name,
                last_name: fields.last_name,
                email: fields.email,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => duplicate_username(),
                other => ProfileError::Repo(other),
            })?;

        info!(
            target = "application::profile::update",
            user_id = %updated.id,
            username = %updated.username,
            "profile updated"
        );
        Ok(updated)
    }
}

fn duplicate_username() -> ProfileError {
    ProfileError::Invalid(vec!["A user with that username already exists.".to_string()])
}
