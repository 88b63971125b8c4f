use crate::{
    AppState,
    auth::{self, AdminAuthor, CurrentAuthor},
    error::ApiError,
    models::{
        Author, AuthorChanges, BlogPost, CreateAuthorRequest, ErrorBody, UpdateAuthorRequest,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

fn not_found_by_id(author_id: Uuid) -> ApiError {
    ApiError::NotFound(format!(
        "Author with id {author_id} does not exist or has been deleted."
    ))
}

fn already_deleted(author_id: Uuid) -> ApiError {
    ApiError::NotFound(format!(
        "Author with id {author_id} does not exist or had already been deleted."
    ))
}

/// Validates a patch and hashes its password, if any.
async fn prepare_changes(payload: UpdateAuthorRequest) -> Result<AuthorChanges, ApiError> {
    payload.validate()?;
    let password_hash = match payload.password.clone() {
        Some(password) => Some(auth::hash_password(password).await?),
        None => None,
    };
    Ok(payload.into_changes(password_hash))
}

// --- Handlers ---

/// create_author
///
/// [Admin Route] Validates the payload, hashes the password and inserts a new author.
#[utoipa::path(
    post,
    path = "/",
    request_body = CreateAuthorRequest,
    responses(
        (status = 201, description = "Created", body = Author),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 409, description = "Email taken", body = ErrorBody)
    )
)]
pub async fn create_author(
    AdminAuthor(admin): AdminAuthor,
    State(state): State<AppState>,
    Json(payload): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<Author>), ApiError> {
    payload.validate()?;
    let password_hash = match payload.password.clone() {
        Some(password) => Some(auth::hash_password(password).await?),
        None => None,
    };

    let author = state
        .repo
        .create_author(payload.into_new_author(password_hash))
        .await?;

    tracing::info!(author_id = %author.id, admin_id = %admin.id, "author created");
    Ok((StatusCode::CREATED, Json(author)))
}

/// list_authors
///
/// [Authenticated Route] Returns every author.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "All authors", body = [Author]))
)]
pub async fn list_authors(
    _current: CurrentAuthor,
    State(state): State<AppState>,
) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.repo.list_authors().await?))
}

/// get_me
///
/// [Authenticated Route] Returns the identity resolved by the credential check.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current author", body = Author))
)]
pub async fn get_me(CurrentAuthor(author): CurrentAuthor) -> Json<Author> {
    Json(author)
}

/// update_me
///
/// [Authenticated Route] Applies a patch to the caller's own record.
/// A `role` in the body is ignored here; roles change only through the admin route.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Updated", body = Author),
        (status = 404, description = "Caller no longer exists", body = ErrorBody)
    )
)]
pub async fn update_me(
    CurrentAuthor(author): CurrentAuthor,
    State(state): State<AppState>,
    Json(mut payload): Json<UpdateAuthorRequest>,
) -> Result<Json<Author>, ApiError> {
    if payload.role.take().is_some() {
        tracing::warn!(author_id = %author.id, "ignoring role change on /me");
    }
    let changes = prepare_changes(payload).await?;

    state
        .repo
        .update_author(author.id, changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Author with id {} not found.", author.id)))
}

/// delete_me
///
/// [Authenticated Route] Deletes the caller's own record. Their posts are left as they are.
#[utoipa::path(
    delete,
    path = "/me",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Already deleted", body = ErrorBody)
    )
)]
pub async fn delete_me(
    CurrentAuthor(author): CurrentAuthor,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    match state.repo.delete_author(author.id).await? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(already_deleted(author.id)),
    }
}

/// get_my_stories
///
/// [Authenticated Route] Lists the posts that name the caller among their authors,
/// with each author reduced to `_id`, `firstName` and `lastName`. No posts is `200 []`.
#[utoipa::path(
    get,
    path = "/me/stories",
    responses((status = 200, description = "Posts by the current author", body = [BlogPost]))
)]
pub async fn get_my_stories(
    CurrentAuthor(author): CurrentAuthor,
    State(state): State<AppState>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.repo.get_posts_by_author(author.id).await?))
}

/// get_author
///
/// [Authenticated Route] Fetches a single author by id.
#[utoipa::path(
    get,
    path = "/{author_id}",
    params(("author_id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Found", body = Author),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_author(
    _current: CurrentAuthor,
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> Result<Json<Author>, ApiError> {
    state
        .repo
        .get_author(author_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found_by_id(author_id))
}

/// update_author
///
/// [Admin Route] Applies a patch to any author, including a role change.
#[utoipa::path(
    put,
    path = "/{author_id}",
    params(("author_id" = Uuid, Path, description = "Author ID")),
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Updated", body = Author),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_author(
    AdminAuthor(admin): AdminAuthor,
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
    Json(payload): Json<UpdateAuthorRequest>,
) -> Result<Json<Author>, ApiError> {
    let changes = prepare_changes(payload).await?;

    let updated = state
        .repo
        .update_author(author_id, changes)
        .await?
        .ok_or_else(|| not_found_by_id(author_id))?;

    tracing::info!(%author_id, admin_id = %admin.id, "author updated");
    Ok(Json(updated))
}

/// delete_author
///
/// [Admin Route] Deletes any author by id.
#[utoipa::path(
    delete,
    path = "/{author_id}",
    params(("author_id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_author(
    AdminAuthor(admin): AdminAuthor,
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.repo.delete_author(author_id).await? {
        Some(_) => {
            tracing::info!(%author_id, admin_id = %admin.id, "author deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(already_deleted(author_id)),
    }
}
