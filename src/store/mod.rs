use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryTrait,
};
use thiserror::Error;
use tokio::time::timeout;

use crate::dao::generated::media;

pub const DB_TIMEOUT_MS: u64 = 5000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Database query timed out")]
    Timeout,
}

/// Cache of resolved media rows keyed by mint.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn find(&self, mint: &str) -> Result<Option<media::Model>, StoreError>;

    /// Inserts the row, or overwrites every column of the existing row for the same mint.
    async fn upsert(&self, model: media::Model) -> Result<(), StoreError>;

    /// Returns the number of rows removed.
    async fn delete_many(&self, mints: &[String]) -> Result<u64, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

pub struct SeaOrmMediaStore {
    conn: Arc<DatabaseConnection>,
    timeout: Duration,
}

impl From<Arc<DatabaseConnection>> for SeaOrmMediaStore {
    fn from(conn: Arc<DatabaseConnection>) -> Self {
        SeaOrmMediaStore {
            conn,
            timeout: Duration::from_millis(DB_TIMEOUT_MS),
        }
    }
}

impl SeaOrmMediaStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self::from(Arc::new(conn))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    async fn bounded<T>(
        &self,
        query: impl Future<Output = Result<T, DbErr>>,
    ) -> Result<T, StoreError> {
        match timeout(self.timeout, query).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

fn to_active_model(model: media::Model) -> media::ActiveModel {
    media::ActiveModel {
        mint: Set(model.mint),
        decimals: Set(model.decimals),
        image_uri: Set(model.image_uri),
        image_type: Set(model.image_type),
        media_uri: Set(model.media_uri),
        media_type: Set(model.media_type),
        local_path: Set(model.local_path),
        name: Set(model.name),
        symbol: Set(model.symbol),
        update_authority: Set(model.update_authority),
        created_at: Set(model.created_at),
    }
}

#[async_trait]
impl MediaStore for SeaOrmMediaStore {
    async fn find(&self, mint: &str) -> Result<Option<media::Model>, StoreError> {
        self.bounded(media::Entity::find_by_id(mint.to_string()).one(self.conn.as_ref()))
            .await
    }

    async fn upsert(&self, model: media::Model) -> Result<(), StoreError> {
        let query = media::Entity::insert(to_active_model(model))
            .on_conflict(
                OnConflict::column(media::Column::Mint)
                    .update_columns([
                        media::Column::Decimals,
                        media::Column::ImageUri,
                        media::Column::ImageType,
                        media::Column::MediaUri,
                        media::Column::MediaType,
                        media::Column::LocalPath,
                        media::Column::Name,
                        media::Column::Symbol,
                        media::Column::UpdateAuthority,
                        media::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .build(self.conn.get_database_backend());
        self.bounded(self.conn.execute(query)).await?;
        Ok(())
    }

    async fn delete_many(&self, mints: &[String]) -> Result<u64, StoreError> {
        if mints.is_empty() {
            return Ok(0);
        }
        let result = self
            .bounded(
                media::Entity::delete_many()
                    .filter(media::Column::Mint.is_in(mints.iter().cloned()))
                    .exec(self.conn.as_ref()),
            )
            .await?;
        Ok(result.rows_affected)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count = self
            .bounded(media::Entity::find().count(self.conn.as_ref()))
            .await?;
        Ok(count as u64)
    }
}
