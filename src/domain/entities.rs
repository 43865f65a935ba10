//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

pub const USERNAME_MAX_LEN: usize = 150;
pub const POST_TITLE_MAX_LEN: usize = 256;
pub const CATEGORY_TITLE_MAX_LEN: usize = 256;
pub const LOCATION_NAME_MAX_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: OffsetDateTime,
}

impl UserRecord {
    /// Full name when present, falling back to the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub secret_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRecord {
    pub id: Uuid,
    pub name: String,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub author_id: Uuid,
    pub location_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
}

/// A post joined with the rows it references, as shown in feeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostListing {
    pub post: PostRecord,
    pub author_username: String,
    pub category: Option<CategoryRecord>,
    pub location: Option<LocationRecord>,
    pub comment_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub text: String,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentListing {
    pub comment: CommentRecord,
    pub author_username: String,
}

/// Usernames are 1..=150 characters of letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::validation("username must not be empty"));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    let allowed = |ch: char| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err(DomainError::validation(
            "username may contain only letters, digits and @/./+/-/_",
        ));
    }
    Ok(())
}

/// Trim and bound a required single-line text field.
pub fn normalize_required(value: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_len {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("reader_01").is_ok());
        assert!(validate_username("a.b+c-d@e").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
    }

    #[test]
    fn username_errors_carry_the_user_facing_message() {
        let err = validate_username("").expect_err("empty username");
        assert_eq!(err.to_string(), "username must not be empty");
        assert_eq!(err.into_message(), "username must not be empty");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut user = UserRecord {
            id: Uuid::new_v4(),
            username: "leo".to_string(),
            first_name: String::new(),
            last_name: " ".to_string(),
            email: String::new(),
            password_hash: String::new(),
            is_superuser: false,
            is_active: true,
            date_joined: OffsetDateTime::now_utc(),
        };
        assert_eq!(user.display_name(), "leo");

        user.first_name = "Leo".to_string();
        user.last_name = "Tolstoy".to_string();
        assert_eq!(user.display_name(), "Leo Tolstoy");
    }

    #[test]
    fn normalize_required_bounds_length() {
        assert_eq!(normalize_required("  hi ", 5).as_deref(), Some("hi"));
        assert_eq!(normalize_required("   ", 5), None);
        assert_eq!(normalize_required("toolong", 3), None);
    }
}
