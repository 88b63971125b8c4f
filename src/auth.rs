use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{
    config::AdminSeed,
    error::ApiError,
    models::{Author, NewAuthor, Role, normalize_email},
    repository::RepositoryState,
};

/// Guard
///
/// One capability check in front of a handler. Guards run in the order given to
/// [`evaluate_guards`]; the first failure short-circuits the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Resolve the caller from HTTP Basic credentials.
    Credentials,
    /// Require the resolved caller to hold [`Role::Admin`].
    AdminRole,
}

/// Guard list for routes open to any authenticated author.
pub const AUTHENTICATED: &[Guard] = &[Guard::Credentials];
/// Guard list for mutating routes restricted to admins.
pub const ADMIN_ONLY: &[Guard] = &[Guard::Credentials, Guard::AdminRole];

/// CurrentAuthor
///
/// The resolved identity of an authenticated request. Inserted into request
/// extensions by the credential middleware and readable as a handler argument.
#[derive(Debug, Clone)]
pub struct CurrentAuthor(pub Author);

/// AdminAuthor
///
/// Like [`CurrentAuthor`], but extraction fails with 403 unless the caller is an admin.
/// Extraction happens before the body is read, so a rejected request never reaches the store.
#[derive(Debug, Clone)]
pub struct AdminAuthor(pub Author);

fn invalid_credentials() -> ApiError {
    ApiError::Unauthenticated("Credentials are not correct.".to_string())
}

/// evaluate_guards
///
/// Runs `guards` in order against the request and returns the resolved author.
/// An identity already placed in the extensions by the middleware is reused
/// instead of verifying the password a second time.
pub async fn evaluate_guards(
    guards: &[Guard],
    parts: &Parts,
    repo: &RepositoryState,
) -> Result<Author, ApiError> {
    let mut identity = parts
        .extensions
        .get::<CurrentAuthor>()
        .map(|current| current.0.clone());

    for guard in guards {
        match guard {
            Guard::Credentials => {
                if identity.is_none() {
                    identity = Some(authenticate(&parts.headers, repo).await?);
                }
            }
            Guard::AdminRole => {
                let author = identity.as_ref().ok_or_else(|| {
                    ApiError::Unauthenticated("Please provide credentials.".to_string())
                })?;
                if author.role != Role::Admin {
                    tracing::warn!(author_id = %author.id, "admin route refused");
                    return Err(ApiError::Forbidden("Admin only endpoint!".to_string()));
                }
            }
        }
    }

    identity.ok_or_else(|| ApiError::Unauthenticated("Please provide credentials.".to_string()))
}

/// authenticate
///
/// The credential check: decode `Authorization: Basic`, look the author up by
/// email and verify the password against the stored argon2 hash.
pub async fn authenticate(headers: &HeaderMap, repo: &RepositoryState) -> Result<Author, ApiError> {
    let (email, password) = parse_basic_credentials(headers).ok_or_else(|| {
        ApiError::Unauthenticated(
            "Please provide credentials in the Authorization header.".to_string(),
        )
    })?;

    let author = repo
        .find_author_by_email(&normalize_email(&email))
        .await?
        .ok_or_else(invalid_credentials)?;

    let hash = author
        .password_hash
        .clone()
        .ok_or_else(invalid_credentials)?;

    if !verify_password(password, hash).await? {
        tracing::debug!(author_id = %author.id, "password mismatch");
        return Err(invalid_credentials());
    }

    Ok(author)
}

/// Extracts `(email, password)` from an `Authorization: Basic` header.
pub fn parse_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

/// Hashes a plaintext password with argon2id on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
}

/// Verifies a plaintext password against a PHC-formatted argon2 hash.
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .map_err(|e| ApiError::Internal(format!("password verification task failed: {e}")))
}

/// ensure_admin_account
///
/// Creates the bootstrap admin from configuration if no author owns that email yet.
/// Safe to call on every start.
pub async fn ensure_admin_account(repo: &RepositoryState, seed: &AdminSeed) -> Result<(), ApiError> {
    let email = normalize_email(&seed.email);

    if let Some(existing) = repo.find_author_by_email(&email).await? {
        if existing.role != Role::Admin {
            tracing::warn!(%email, "bootstrap admin email belongs to a non-admin author");
        } else {
            tracing::info!(%email, "bootstrap admin already exists");
        }
        return Ok(());
    }

    let password_hash = hash_password(seed.password.clone()).await?;
    let admin = repo
        .create_author(NewAuthor {
            first_name: "Admin".to_string(),
            last_name: "Admin".to_string(),
            email: email.clone(),
            password_hash: Some(password_hash),
            role: Role::Admin,
            avatar: None,
        })
        .await?;

    tracing::info!(author_id = %admin.id, %email, "created bootstrap admin");
    Ok(())
}

impl<S> FromRequestParts<S> for CurrentAuthor
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        evaluate_guards(AUTHENTICATED, parts, &repo)
            .await
            .map(CurrentAuthor)
    }
}

impl<S> FromRequestParts<S> for AdminAuthor
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        evaluate_guards(ADMIN_ONLY, parts, &repo)
            .await
            .map(AdminAuthor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn basic(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(raw));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        headers
    }

    #[test]
    fn parses_basic_header() {
        let creds = parse_basic_credentials(&basic("ada@x.com:pa:ss"));
        assert_eq!(creds, Some(("ada@x.com".to_string(), "pa:ss".to_string())));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let value = format!("basic {}", STANDARD.encode("ada@x.com:secret-pass"));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        assert_eq!(
            parse_basic_credentials(&headers),
            Some(("ada@x.com".to_string(), "secret-pass".to_string()))
        );

        let value = format!("BASIC {}", STANDARD.encode("ada@x.com:secret-pass"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        assert!(parse_basic_credentials(&headers).is_some());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(parse_basic_credentials(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(parse_basic_credentials(&headers).is_none());

        assert!(parse_basic_credentials(&basic("no-colon")).is_none());
        assert!(parse_basic_credentials(&HeaderMap::new()).is_none());
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".to_string(), hash).await.unwrap());
        assert!(!verify_password("x".to_string(), "not-a-hash".to_string()).await.unwrap());
    }
}
