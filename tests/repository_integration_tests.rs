use blog_authors::{
    models::{AuthorChanges, NewAuthor, NewBlogPost, ReadTime, Role},
    repository::{MemoryRepository, PostgresRepository, Repository, RepositoryError},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the database pool for the Postgres-backed tests.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }

    /// Inserts a post and its author links directly; the service itself never writes posts.
    async fn insert_post(&self, title: &str, authors: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO blog_posts (id, category, title, cover, read_time_value, read_time_unit, content)
            VALUES ($1, 'History', $2, 'https://img/cover.png', 5, 'minute', 'Body')
            "#,
        )
        .bind(id)
        .bind(title)
        .execute(&self.pool)
        .await
        .expect("Failed to insert post");

        for author_id in authors {
            sqlx::query("INSERT INTO blog_post_authors (post_id, author_id) VALUES ($1, $2)")
                .bind(id)
                .bind(author_id)
                .execute(&self.pool)
                .await
                .expect("Failed to link post author");
        }
        id
    }
}

// --- Test Data Helpers ---

/// A new author with a unique email so tests can share one database.
fn new_author(first_name: &str, last_name: &str) -> NewAuthor {
    NewAuthor {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!("{}@test.com", Uuid::new_v4()),
        password_hash: None,
        role: Role::User,
        avatar: None,
    }
}

fn new_post(title: &str, authors: Vec<Uuid>) -> NewBlogPost {
    NewBlogPost {
        category: "History".to_string(),
        title: title.to_string(),
        cover: "https://img/cover.png".to_string(),
        read_time: ReadTime {
            value: 5,
            unit: "minute".to_string(),
        },
        content: "Body".to_string(),
        authors,
    }
}

// --- Postgres (require DATABASE_URL) ---

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn test_pg_author_crud_cycle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let created = repo.create_author(new_author("Ada", "Lovelace")).await.unwrap();
    assert_eq!(created.role, Role::User);

    let fetched = repo.get_author(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.email, created.email);

    let by_email = repo.find_author_by_email(&created.email).await.unwrap().unwrap();
    assert_eq!(by_email.id, created.id);

    let updated = repo
        .update_author(
            created.id,
            AuthorChanges {
                first_name: Some("Augusta".to_string()),
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.first_name, "Augusta");
    assert_eq!(updated.last_name, "Lovelace");
    assert_eq!(updated.role, Role::Admin);
    assert!(updated.updated_at >= created.updated_at);

    let deleted = repo.delete_author(created.id).await.unwrap().unwrap();
    assert_eq!(deleted.id, created.id);
    assert!(repo.get_author(created.id).await.unwrap().is_none());
    assert!(repo.delete_author(created.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn test_pg_duplicate_email_is_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let first = repo.create_author(new_author("Ada", "Lovelace")).await.unwrap();
    let duplicate = NewAuthor {
        email: first.email.clone(),
        ..new_author("Other", "Person")
    };

    let err = repo.create_author(duplicate).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let second = repo.create_author(new_author("Grace", "Hopper")).await.unwrap();
    let err = repo
        .update_author(
            second.id,
            AuthorChanges {
                email: Some(first.email.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn test_pg_update_missing_author_is_none() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let result = repo
        .update_author(Uuid::new_v4(), AuthorChanges::default())
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
#[ignore = "requires a Postgres database in DATABASE_URL"]
async fn test_pg_posts_by_author() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let ada = repo.create_author(new_author("Ada", "Lovelace")).await.unwrap();
    let grace = repo.create_author(new_author("Grace", "Hopper")).await.unwrap();

    let shared = ctx.insert_post("Shared", &[ada.id, grace.id]).await;
    ctx.insert_post("Grace only", &[grace.id]).await;

    let posts = repo.get_posts_by_author(ada.id).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, shared);
    assert_eq!(posts[0].read_time.unit, "minute");

    let names: Vec<&str> = posts[0]
        .authors
        .iter()
        .map(|a| a.first_name.as_str())
        .collect();
    assert_eq!(names, vec!["Grace", "Ada"]);

    // A deleted co-author drops out of the embedded list; the post stays.
    repo.delete_author(grace.id).await.unwrap();
    let posts = repo.get_posts_by_author(ada.id).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].authors.len(), 1);
    assert_eq!(posts[0].authors[0].id, ada.id);

    assert!(repo.get_posts_by_author(Uuid::new_v4()).await.unwrap().is_empty());
}

// --- In-Memory ---

#[tokio::test]
async fn test_memory_lists_in_insertion_order() {
    let repo = MemoryRepository::new();
    let ada = repo.create_author(new_author("Ada", "Lovelace")).await.unwrap();
    let grace = repo.create_author(new_author("Grace", "Hopper")).await.unwrap();

    let ids: Vec<Uuid> = repo
        .list_authors()
        .await
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![ada.id, grace.id]);
}

#[tokio::test]
async fn test_memory_rejects_duplicate_email() {
    let repo = MemoryRepository::new();
    let ada = repo.create_author(new_author("Ada", "Lovelace")).await.unwrap();

    let err = repo
        .create_author(NewAuthor {
            email: ada.email.clone(),
            ..new_author("Other", "Person")
        })
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("An author with email {} already exists.", ada.email)
    );
}

#[tokio::test]
async fn test_memory_update_keeps_own_email() {
    let repo = MemoryRepository::new();
    let ada = repo.create_author(new_author("Ada", "Lovelace")).await.unwrap();

    let updated = repo
        .update_author(
            ada.id,
            AuthorChanges {
                email: Some(ada.email.clone()),
                last_name: Some("King".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.last_name, "King");
    assert_eq!(updated.email, ada.email);
}

#[tokio::test]
async fn test_memory_update_and_delete_missing_author() {
    let repo = MemoryRepository::new();
    let missing = Uuid::new_v4();

    assert!(
        repo.update_author(missing, AuthorChanges::default())
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.delete_author(missing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_update_missing_author_ignores_email_conflict() {
    let repo = MemoryRepository::new();
    let ada = repo.create_author(new_author("Ada", "Lovelace")).await.unwrap();

    let result = repo
        .update_author(
            Uuid::new_v4(),
            AuthorChanges {
                email: Some(ada.email.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_memory_posts_newest_first_and_skip_deleted_authors() {
    let repo = MemoryRepository::new();
    let ada = repo.create_author(new_author("Ada", "Lovelace")).await.unwrap();
    let grace = repo.create_author(new_author("Grace", "Hopper")).await.unwrap();

    let older = repo.insert_post(new_post("Older", vec![ada.id])).await;
    let newer = repo
        .insert_post(new_post("Newer", vec![ada.id, grace.id]))
        .await;
    repo.insert_post(new_post("Unrelated", vec![grace.id])).await;

    let posts = repo.get_posts_by_author(ada.id).await.unwrap();
    let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![newer, older]);

    repo.delete_author(grace.id).await.unwrap();
    let posts = repo.get_posts_by_author(ada.id).await.unwrap();
    assert_eq!(posts[0].authors.len(), 1);
    assert_eq!(posts[0].authors[0].id, ada.id);
}
