use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateNewsletterParams, NewslettersRepo, RepoError, UpdateNewsletterParams,
};
use crate::domain::entities::NewsletterRecord;

use super::{PostgresRepositories, map_sqlx_error};

const NEWSLETTER_COLUMNS: &str =
    "id, title, sender_name, sender_email, base_url, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct NewsletterRow {
    id: Uuid,
    title: String,
    sender_name: String,
    sender_email: String,
    base_url: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<NewsletterRow> for NewsletterRecord {
    fn from(row: NewsletterRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            sender_name: row.sender_name,
            sender_email: row.sender_email,
            base_url: row.base_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl NewslettersRepo for PostgresRepositories {
    async fn list_newsletters(&self) -> Result<Vec<NewsletterRecord>, RepoError> {
        let rows = sqlx::query_as::<_, NewsletterRow>(&format!(
            "SELECT {NEWSLETTER_COLUMNS} FROM newsletters ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(NewsletterRecord::from).collect())
    }

    async fn find_newsletter(&self, id: Uuid) -> Result<Option<NewsletterRecord>, RepoError> {
        let row = sqlx::query_as::<_, NewsletterRow>(&format!(
            "SELECT {NEWSLETTER_COLUMNS} FROM newsletters WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(NewsletterRecord::from))
    }

    async fn create_newsletter(
        &self,
        params: CreateNewsletterParams,
    ) -> Result<NewsletterRecord, RepoError> {
        let CreateNewsletterParams {
            title,
            sender_name,
            sender_email,
            base_url,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, NewsletterRow>(&format!(
            "INSERT INTO newsletters (id, title, sender_name, sender_email, base_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {NEWSLETTER_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(sender_name)
        .bind(sender_email)
        .bind(base_url)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(NewsletterRecord::from(row))
    }

    async fn update_newsletter(
        &self,
        params: UpdateNewsletterParams,
    ) -> Result<NewsletterRecord, RepoError> {
        let UpdateNewsletterParams {
            id,
            title,
            sender_name,
            sender_email,
            base_url,
        } = params;

        let row = sqlx::query_as::<_, NewsletterRow>(&format!(
            "UPDATE newsletters \
             SET title = $2, sender_name = $3, sender_email = $4, base_url = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING {NEWSLETTER_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(sender_name)
        .bind(sender_email)
        .bind(base_url)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(NewsletterRecord::from(row))
    }

    async fn delete_newsletter(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM newsletters WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
