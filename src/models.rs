use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

/// Minimum length accepted for a plaintext password.
pub const MIN_PASSWORD_LEN: usize = 8;

// --- Core Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field of an author. Stored as the Postgres enum `author_role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "author_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Author
///
/// The canonical author record from the `authors` table. Serialized with the
/// document-style `_id` key and camelCase field names.
///
/// The password hash is loaded for credential checks but is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// AuthorSummary
///
/// The reduced author shape joined into blog posts: identity plus display name only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthorSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl From<&Author> for AuthorSummary {
    fn from(author: &Author) -> Self {
        Self {
            id: author.id,
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReadTime {
    pub value: i32,
    pub unit: String,
}

/// BlogPost
///
/// A post from `blog_posts`, returned with its `authors` resolved to [`AuthorSummary`].
/// This service never writes posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BlogPost {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub category: String,
    pub title: String,
    pub cover: String,
    pub read_time: ReadTime,
    pub content: String,
    pub authors: Vec<AuthorSummary>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewBlogPost
///
/// Seed input for the in-memory store. `authors` holds raw author ids.
#[derive(Debug, Clone, Default)]
pub struct NewBlogPost {
    pub category: String,
    pub title: String,
    pub cover: String,
    pub read_time: ReadTime,
    pub content: String,
    pub authors: Vec<Uuid>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateAuthorRequest
///
/// Input payload for `POST /`. The plaintext password is hashed before it
/// reaches the repository.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateAuthorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl CreateAuthorRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_name("firstName", &self.first_name)?;
        require_name("lastName", &self.last_name)?;
        require_email(&self.email)?;
        if let Some(password) = &self.password {
            require_password(password)?;
        }
        if let Some(avatar) = &self.avatar {
            require_non_blank("avatar", avatar)?;
        }
        Ok(())
    }

    /// Builds the repository input. Call [`Self::validate`] first.
    pub fn into_new_author(self, password_hash: Option<String>) -> NewAuthor {
        NewAuthor {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            password_hash,
            role: self.role.unwrap_or_default(),
            avatar: self.avatar,
        }
    }
}

/// UpdateAuthorRequest
///
/// Partial update payload for `PUT /me` and `PUT /{authorId}`. Every field is
/// optional; absent fields are left untouched by the store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateAuthorRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UpdateAuthorRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(first_name) = &self.first_name {
            require_name("firstName", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            require_name("lastName", last_name)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        if let Some(password) = &self.password {
            require_password(password)?;
        }
        if let Some(avatar) = &self.avatar {
            require_non_blank("avatar", avatar)?;
        }
        Ok(())
    }

    /// Builds the repository input. Call [`Self::validate`] first.
    pub fn into_changes(self, password_hash: Option<String>) -> AuthorChanges {
        AuthorChanges {
            first_name: self.first_name.map(|name| name.trim().to_string()),
            last_name: self.last_name.map(|name| name.trim().to_string()),
            email: self.email.as_deref().map(normalize_email),
            password_hash,
            role: self.role,
            avatar: self.avatar,
        }
    }
}

// --- Repository Inputs ---

/// A validated author ready for insertion.
#[derive(Debug, Clone, Default)]
pub struct NewAuthor {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub avatar: Option<String>,
}

/// A validated set of field replacements. `None` leaves the stored value as is.
#[derive(Debug, Clone, Default)]
pub struct AuthorChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub avatar: Option<String>,
}

impl AuthorChanges {
    /// Applies the provided fields onto `author` in place.
    pub fn apply_to(self, author: &mut Author) {
        if let Some(first_name) = self.first_name {
            author.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            author.last_name = last_name;
        }
        if let Some(email) = self.email {
            author.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            author.password_hash = Some(password_hash);
        }
        if let Some(role) = self.role {
            author.role = role;
        }
        if let Some(avatar) = self.avatar {
            author.avatar = Some(avatar);
        }
    }
}

/// ErrorBody
///
/// Shape of every error response, documented for the OpenAPI schema.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

// --- Field Validation ---

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty.")));
    }
    Ok(())
}

fn require_name(field: &str, value: &str) -> Result<(), ApiError> {
    require_non_blank(field, value)?;
    if value.trim().chars().count() > 100 {
        return Err(ApiError::Validation(format!(
            "{field} must be at most 100 characters."
        )));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<(), ApiError> {
    let email = value.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::Validation(format!(
            "{email} is not a valid email address."
        )));
    }
    Ok(())
}

fn require_password(value: &str) -> Result<(), ApiError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}
