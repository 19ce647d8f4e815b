use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{CursorPage, PageRequest, SubscriberCursor};
use crate::application::repos::{
    CreateSubscriberParams, RepoError, SubscriberQueryFilter, SubscribersRepo,
    UpdateSubscriberParams,
};
use crate::domain::entities::SubscriberRecord;
use crate::domain::types::SubscriberStatus;

use super::{PostgresRepositories, map_sqlx_error};

const SUBSCRIBER_COLUMNS: &str =
    "id, newsletter_id, email, name, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    newsletter_id: Uuid,
    email: String,
    name: Option<String>,
    status: SubscriberStatus,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SubscriberRow> for SubscriberRecord {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: row.id,
            newsletter_id: row.newsletter_id,
            email: row.email,
            name: row.name,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl SubscribersRepo for PostgresRepositories {
    async fn list_subscribers(
        &self,
        filter: &SubscriberQueryFilter,
        page: PageRequest<SubscriberCursor>,
    ) -> Result<CursorPage<SubscriberRecord>, RepoError> {
        let limit = page.limit.clamp(1, 100) as i64;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers s WHERE 1=1 "
        ));
        Self::apply_subscriber_filter(&mut qb, filter);

        if let Some(cursor) = page.cursor {
            qb.push(" AND (s.created_at, s.id) < (");
            qb.push_bind(cursor.created_at());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(") ");
        }

        qb.push(" ORDER BY s.created_at DESC, s.id DESC ");
        qb.push(" LIMIT ");
        qb.push_bind(limit + 1);

        let mut rows = qb
            .build_query_as::<SubscriberRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = (rows.len() as i64) > limit;
        if has_more {
            rows.pop();
        }

        let next_cursor = if has_more {
            rows.last()
                .map(|row| SubscriberCursor::new(row.created_at, row.id).encode())
        } else {
            None
        };

        let records = rows.into_iter().map(SubscriberRecord::from).collect();
        Ok(CursorPage::new(records, next_cursor))
    }

    async fn count_subscribers(&self, filter: &SubscriberQueryFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM subscribers s WHERE 1=1 ");
        Self::apply_subscriber_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_subscriber(&self, id: Uuid) -> Result<Option<SubscriberRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubscriberRecord::from))
    }

    async fn find_subscriber_by_email(
        &self,
        newsletter_id: Uuid,
        email: &str,
    ) -> Result<Option<SubscriberRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers \
             WHERE newsletter_id = $1 AND lower(email) = lower($2)"
        ))
        .bind(newsletter_id)
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubscriberRecord::from))
    }

    async fn list_active_subscribers(
        &self,
        newsletter_id: Uuid,
    ) -> Result<Vec<SubscriberRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers \
             WHERE newsletter_id = $1 AND status = $2 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(newsletter_id)
        .bind(SubscriberStatus::Active)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SubscriberRecord::from).collect())
    }

    async fn create_subscriber(
        &self,
        params: CreateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError> {
        let CreateSubscriberParams {
            newsletter_id,
            email,
            name,
            status,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "INSERT INTO subscribers (id, newsletter_id, email, name, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(id)
        .bind(newsletter_id)
        .bind(email)
        .bind(name)
        .bind(status)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubscriberRecord::from(row))
    }

    async fn update_subscriber(
        &self,
        id: Uuid,
        params: UpdateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError> {
        let UpdateSubscriberParams {
            email,
            name,
            status,
        } = params;

        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "UPDATE subscribers \
             SET email = COALESCE($2, email), \
                 name = COALESCE($3, name), \
                 status = COALESCE($4, status), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(status)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubscriberRecord::from(row))
    }

    async fn set_subscriber_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
    ) -> Result<SubscriberRecord, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "UPDATE subscribers SET status = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubscriberRecord::from(row))
    }

    async fn delete_subscriber(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

impl PostgresRepositories {
    fn apply_subscriber_filter<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        filter: &'q SubscriberQueryFilter,
    ) {
        if let Some(newsletter_id) = filter.newsletter_id {
            qb.push(" AND s.newsletter_id = ");
            qb.push_bind(newsletter_id);
            qb.push(" ");
        }

        if let Some(status) = filter.status {
            qb.push(" AND s.status = ");
            qb.push_bind(status);
            qb.push(" ");
        }

        if let Some(search) = filter.search.as_ref() {
            let pattern = format!("%{}%", search);
            qb.push(" AND (");
            qb.push("s.email ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR COALESCE(s.name, '') ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }
}
