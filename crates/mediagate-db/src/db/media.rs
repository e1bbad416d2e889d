use std::sync::Arc;

use mediagate_core::models::Media;
use mediagate_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

#[cfg(feature = "postgres")]
use sqlx::{PgPool, Postgres};

/// Trait for media repository operations
/// This abstracts the backing store (PostgreSQL or in-process)
#[async_trait::async_trait]
pub trait MediaRepository: Send + Sync {
    /// Fetch one listing; `AppError::NotFound` when the id is unknown.
    async fn get_media_by_id(&self, id: Uuid) -> Result<Media, AppError>;

    /// Persist a listing and return its identifier.
    async fn create_media(&self, media: Media) -> Result<Uuid, AppError>;

    /// All listings, newest first.
    async fn list_media(&self) -> Result<Vec<Media>, AppError>;
}

/// Pick the backing store: Postgres when a pool is supplied, memory otherwise.
#[cfg(feature = "postgres")]
pub fn create_media_repository(pool: Option<PgPool>) -> Arc<dyn MediaRepository> {
    match pool {
        Some(pool) => Arc::new(PgMediaRepository::new(pool)),
        None => Arc::new(InMemoryMediaRepository::new()),
    }
}

#[cfg(not(feature = "postgres"))]
pub fn create_media_repository() -> Arc<dyn MediaRepository> {
    Arc::new(InMemoryMediaRepository::new())
}

#[cfg(feature = "postgres")]
#[derive(Clone)]
pub struct PgMediaRepository {
    pool: PgPool,
}

#[cfg(feature = "postgres")]
impl PgMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "postgres")]
#[async_trait::async_trait]
impl MediaRepository for PgMediaRepository {
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = %id))]
    async fn get_media_by_id(&self, id: Uuid) -> Result<Media, AppError> {
        let media = sqlx::query_as::<Postgres, Media>(
            r#"
            SELECT id, user_id, country, city, go_credits, subscription_credits, created_at
            FROM media
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        media.ok_or_else(|| AppError::NotFound(format!("media {} not found", id)))
    }

    #[tracing::instrument(skip(self, media), fields(db.table = "media", db.operation = "insert", db.record_id = %media.id))]
    async fn create_media(&self, media: Media) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO media (id, user_id, country, city, go_credits, subscription_credits, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(media.id)
        .bind(&media.user_id)
        .bind(&media.country)
        .bind(&media.city)
        .bind(media.go_credits)
        .bind(media.subscription_credits)
        .bind(media.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    async fn list_media(&self) -> Result<Vec<Media>, AppError> {
        let media = sqlx::query_as::<Postgres, Media>(
            r#"
            SELECT id, user_id, country, city, go_credits, subscription_credits, created_at
            FROM media
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(media)
    }
}

/// Process-local media store for development and tests.
#[derive(Clone, Default)]
pub struct InMemoryMediaRepository {
    items: Arc<RwLock<Vec<Media>>>,
}

impl InMemoryMediaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored listings.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn get_media_by_id(&self, id: Uuid) -> Result<Media, AppError> {
        self.items
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("media {} not found", id)))
    }

    async fn create_media(&self, media: Media) -> Result<Uuid, AppError> {
        let mut items = self.items.write().await;
        if items.iter().any(|m| m.id == media.id) {
            return Err(AppError::BadRequest(format!(
                "media {} already exists",
                media.id
            )));
        }
        let id = media.id;
        items.push(media);
        Ok(id)
    }

    async fn list_media(&self) -> Result<Vec<Media>, AppError> {
        let mut items = self.items.read().await.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}
