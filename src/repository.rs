use crate::models::{
    Author, AuthorChanges, AuthorSummary, BlogPost, NewAuthor, NewBlogPost, ReadTime,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// RepositoryError
///
/// Failures surfaced by the store. Handlers forward these unchanged through `ApiError`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint (author email) was violated.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// The store contract consumed by the author handlers. Every method is a single
/// store operation; "absent" is `Ok(None)`, never an error.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_author(&self, author: NewAuthor) -> Result<Author, RepositoryError>;
    async fn list_authors(&self) -> Result<Vec<Author>, RepositoryError>;
    async fn get_author(&self, id: Uuid) -> Result<Option<Author>, RepositoryError>;
    // Credential lookup. `email` is expected to be normalized already.
    async fn find_author_by_email(&self, email: &str) -> Result<Option<Author>, RepositoryError>;

    /// Replaces the provided fields and returns the record as it is after the update.
    async fn update_author(
        &self,
        id: Uuid,
        changes: AuthorChanges,
    ) -> Result<Option<Author>, RepositoryError>;

    /// Removes the author and returns what was deleted. Posts referencing the
    /// author are left untouched.
    async fn delete_author(&self, id: Uuid) -> Result<Option<Author>, RepositoryError>;

    /// Posts whose author set includes `author_id`, with authors reduced to names.
    async fn get_posts_by_author(&self, author_id: Uuid) -> Result<Vec<BlogPost>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

fn email_conflict(email: &str) -> RepositoryError {
    RepositoryError::Conflict(format!("An author with email {email} already exists."))
}

// --- Postgres ---

const AUTHOR_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, role, avatar, created_at, updated_at";

#[derive(FromRow)]
struct PostRow {
    id: Uuid,
    category: String,
    title: String,
    cover: String,
    read_time_value: i32,
    read_time_unit: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PostAuthorRow {
    post_id: Uuid,
    id: Uuid,
    first_name: String,
    last_name: String,
}

/// PostgresRepository
///
/// The `Repository` implementation backed by Postgres. Queries are built at
/// runtime so the crate compiles without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Maps unique violations on `authors.email` to `RepositoryError::Conflict`.
    fn map_write_error(err: sqlx::Error, email: Option<&str>) -> RepositoryError {
        let unique_violation = err
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation());
        match (unique_violation, email) {
            (true, Some(email)) => email_conflict(email),
            (true, None) => RepositoryError::Conflict("Email already in use.".to_string()),
            _ => RepositoryError::Database(err),
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_author(&self, author: NewAuthor) -> Result<Author, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO authors (id, first_name, last_name, email, password_hash, role, avatar, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {AUTHOR_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Author>(&query)
            .bind(Uuid::new_v4())
            .bind(&author.first_name)
            .bind(&author.last_name)
            .bind(&author.email)
            .bind(&author.password_hash)
            .bind(author.role)
            .bind(&author.avatar)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(e, Some(&author.email)))
    }

    async fn list_authors(&self) -> Result<Vec<Author>, RepositoryError> {
        let query = format!("SELECT {AUTHOR_COLUMNS} FROM authors ORDER BY created_at ASC, id ASC");
        Ok(sqlx::query_as::<_, Author>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_author(&self, id: Uuid) -> Result<Option<Author>, RepositoryError> {
        let query = format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = $1");
        Ok(sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_author_by_email(&self, email: &str) -> Result<Option<Author>, RepositoryError> {
        let query = format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE email = $1");
        Ok(sqlx::query_as::<_, Author>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// update_author
    ///
    /// Uses `COALESCE` so that only the `Some` fields of `changes` overwrite a column.
    async fn update_author(
        &self,
        id: Uuid,
        changes: AuthorChanges,
    ) -> Result<Option<Author>, RepositoryError> {
        let query = format!(
            r#"
            UPDATE authors
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                password_hash = COALESCE($5, password_hash),
                role = COALESCE($6, role),
                avatar = COALESCE($7, avatar),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {AUTHOR_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(&changes.email)
            .bind(&changes.password_hash)
            .bind(changes.role)
            .bind(&changes.avatar)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(e, changes.email.as_deref()))
    }

    async fn delete_author(&self, id: Uuid) -> Result<Option<Author>, RepositoryError> {
        let query = format!("DELETE FROM authors WHERE id = $1 RETURNING {AUTHOR_COLUMNS}");
        Ok(sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// get_posts_by_author
    ///
    /// Two queries: the matching posts, then the names of every author attached to
    /// them. Authors that no longer exist drop out of the inner join.
    async fn get_posts_by_author(&self, author_id: Uuid) -> Result<Vec<BlogPost>, RepositoryError> {
        let posts = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.category, p.title, p.cover, p.read_time_value, p.read_time_unit,
                   p.content, p.created_at, p.updated_at
            FROM blog_posts p
            JOIN blog_post_authors pa ON pa.post_id = p.id
            WHERE pa.author_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        if posts.is_empty() {
            return Ok(vec![]);
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let author_rows = sqlx::query_as::<_, PostAuthorRow>(
            r#"
            SELECT pa.post_id, a.id, a.first_name, a.last_name
            FROM blog_post_authors pa
            JOIN authors a ON a.id = pa.author_id
            WHERE pa.post_id = ANY($1)
            ORDER BY a.last_name, a.first_name
            "#,
        )
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut authors_by_post: HashMap<Uuid, Vec<AuthorSummary>> = HashMap::new();
        for row in author_rows {
            authors_by_post
                .entry(row.post_id)
                .or_default()
                .push(AuthorSummary {
                    id: row.id,
                    first_name: row.first_name,
                    last_name: row.last_name,
                });
        }

        Ok(posts
            .into_iter()
            .map(|row| BlogPost {
                authors: authors_by_post.remove(&row.id).unwrap_or_default(),
                id: row.id,
                category: row.category,
                title: row.title,
                cover: row.cover,
                read_time: ReadTime {
                    value: row.read_time_value,
                    unit: row.read_time_unit,
                },
                content: row.content,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

// --- In-Memory ---

struct StoredPost {
    id: Uuid,
    post: NewBlogPost,
    created_at: DateTime<Utc>,
}

/// MemoryRepository
///
/// A `Repository` kept entirely in process. Used by the test suites and when the
/// service runs locally without `DATABASE_URL`. Authors are kept in insertion order.
#[derive(Default)]
pub struct MemoryRepository {
    authors: RwLock<Vec<Author>>,
    posts: RwLock<Vec<StoredPost>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a blog post. Posts are owned by another service, so this is not part
    /// of the `Repository` contract.
    pub async fn insert_post(&self, post: NewBlogPost) -> Uuid {
        let id = Uuid::new_v4();
        self.posts.write().await.push(StoredPost {
            id,
            post,
            created_at: Utc::now(),
        });
        id
    }

    fn resolve_post(stored: &StoredPost, authors: &[Author]) -> BlogPost {
        let mut resolved: Vec<AuthorSummary> = stored
            .post
            .authors
            .iter()
            .filter_map(|id| authors.iter().find(|a| a.id == *id))
            .map(AuthorSummary::from)
            .collect();
        // Same order as the Postgres join.
        resolved.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });

        BlogPost {
            id: stored.id,
            category: stored.post.category.clone(),
            title: stored.post.title.clone(),
            cover: stored.post.cover.clone(),
            read_time: stored.post.read_time.clone(),
            content: stored.post.content.clone(),
            authors: resolved,
            created_at: stored.created_at,
            updated_at: stored.created_at,
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_author(&self, author: NewAuthor) -> Result<Author, RepositoryError> {
        let mut authors = self.authors.write().await;
        if authors.iter().any(|a| a.email == author.email) {
            return Err(email_conflict(&author.email));
        }

        let now = Utc::now();
        let created = Author {
            id: Uuid::new_v4(),
            first_name: author.first_name,
            last_name: author.last_name,
            email: author.email,
            password_hash: author.password_hash,
            role: author.role,
            avatar: author.avatar,
            created_at: now,
            updated_at: now,
        };
        authors.push(created.clone());
        Ok(created)
    }

    async fn list_authors(&self) -> Result<Vec<Author>, RepositoryError> {
        Ok(self.authors.read().await.clone())
    }

    async fn get_author(&self, id: Uuid) -> Result<Option<Author>, RepositoryError> {
        Ok(self.authors.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn find_author_by_email(&self, email: &str) -> Result<Option<Author>, RepositoryError> {
        Ok(self
            .authors
            .read()
            .await
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn update_author(
        &self,
        id: Uuid,
        changes: AuthorChanges,
    ) -> Result<Option<Author>, RepositoryError> {
        let mut authors = self.authors.write().await;

        // A missing target wins over an email conflict, as with the Postgres UPDATE.
        let Some(index) = authors.iter().position(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            if authors.iter().any(|a| a.id != id && &a.email == email) {
                return Err(email_conflict(email));
            }
        }

        let author = &mut authors[index];
        changes.apply_to(author);
        author.updated_at = Utc::now();
        Ok(Some(author.clone()))
    }

    async fn delete_author(&self, id: Uuid) -> Result<Option<Author>, RepositoryError> {
        let mut authors = self.authors.write().await;
        Ok(authors
            .iter()
            .position(|a| a.id == id)
            .map(|index| authors.remove(index)))
    }

    async fn get_posts_by_author(&self, author_id: Uuid) -> Result<Vec<BlogPost>, RepositoryError> {
        let authors = self.authors.read().await;
        let posts = self.posts.read().await;
        Ok(posts
            .iter()
            .rev()
            .filter(|stored| stored.post.authors.contains(&author_id))
            .map(|stored| Self::resolve_post(stored, &authors))
            .collect())
    }
}
