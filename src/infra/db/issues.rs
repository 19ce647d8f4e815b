use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{CursorPage, IssueCursor, PageRequest};
use crate::application::repos::{
    CreateIssueParams, IssueQueryFilter, IssuesRepo, RepoError, UpdateIssueParams,
};
use crate::domain::document::DocumentNode;
use crate::domain::entities::IssueRecord;
use crate::domain::types::IssueStatus;

use super::{PostgresRepositories, map_sqlx_error};

// Sent issues sort by delivery time, drafts by last edit.
const ISSUE_PRIMARY_TIME_EXPR: &str = "COALESCE(i.sent_at, i.updated_at, i.created_at)";

#[derive(sqlx::FromRow)]
struct IssueRow {
    id: Uuid,
    newsletter_id: Uuid,
    subject: String,
    body: serde_json::Value,
    status: IssueStatus,
    sent_at: Option<OffsetDateTime>,
    recipient_count: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct IssueListRow {
    #[sqlx(flatten)]
    issue: IssueRow,
    primary_time: OffsetDateTime,
}

impl IssueRow {
    fn into_record(self) -> Result<IssueRecord, RepoError> {
        let body: DocumentNode = serde_json::from_value(self.body)
            .map_err(|err| RepoError::from_persistence(format!("malformed issue body: {err}")))?;

        Ok(IssueRecord {
            id: self.id,
            newsletter_id: self.newsletter_id,
            subject: self.subject,
            body,
            status: self.status,
            sent_at: self.sent_at,
            recipient_count: self.recipient_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn body_to_json(body: &DocumentNode) -> Result<serde_json::Value, RepoError> {
    serde_json::to_value(body)
        .map_err(|err| RepoError::from_persistence(format!("unserializable issue body: {err}")))
}

#[async_trait]
impl IssuesRepo for PostgresRepositories {
    async fn list_issues(
        &self,
        filter: &IssueQueryFilter,
        page: PageRequest<IssueCursor>,
    ) -> Result<CursorPage<IssueRecord>, RepoError> {
        let limit = page.limit.clamp(1, 100) as i64;

        let mut qb = QueryBuilder::new(
            "SELECT i.id, i.newsletter_id, i.subject, i.body, i.status, \
                    i.sent_at, i.recipient_count, i.created_at, i.updated_at, ",
        );
        qb.push(ISSUE_PRIMARY_TIME_EXPR);
        qb.push(" AS primary_time FROM issues i WHERE 1=1 ");

        Self::apply_issue_filter(&mut qb, filter);

        if let Some(cursor) = page.cursor {
            qb.push(" AND (");
            qb.push(ISSUE_PRIMARY_TIME_EXPR);
            qb.push(", i.id) < (");
            qb.push_bind(cursor.primary_time());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(") ");
        }

        qb.push(" ORDER BY primary_time DESC, i.id DESC ");
        qb.push(" LIMIT ");
        qb.push_bind(limit + 1);

        let mut rows = qb
            .build_query_as::<IssueListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = (rows.len() as i64) > limit;
        if has_more {
            rows.pop();
        }

        let next_cursor = if has_more {
            rows.last()
                .map(|row| IssueCursor::new(row.primary_time, row.issue.id).encode())
        } else {
            None
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(row.issue.into_record()?);
        }

        Ok(CursorPage::new(records, next_cursor))
    }

    async fn find_issue(&self, id: Uuid) -> Result<Option<IssueRecord>, RepoError> {
        let row = sqlx::query_as::<_, IssueRow>(
            "SELECT id, newsletter_id, subject, body, status, sent_at, recipient_count, \
                    created_at, updated_at \
             FROM issues WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(IssueRow::into_record).transpose()
    }

    async fn create_issue(&self, params: CreateIssueParams) -> Result<IssueRecord, RepoError> {
        let CreateIssueParams {
            newsletter_id,
            subject,
            body,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let body = body_to_json(&body)?;

        let row = sqlx::query_as::<_, IssueRow>(
            "INSERT INTO issues (id, newsletter_id, subject, body, status, recipient_count, \
                                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 0, $6, $6) \
             RETURNING id, newsletter_id, subject, body, status, sent_at, recipient_count, \
                       created_at, updated_at",
        )
        .bind(id)
        .bind(newsletter_id)
        .bind(subject)
        .bind(body)
        .bind(IssueStatus::Draft)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.into_record()
    }

    async fn update_issue(&self, params: UpdateIssueParams) -> Result<IssueRecord, RepoError> {
        let UpdateIssueParams { id, subject, body } = params;
        let body = body_to_json(&body)?;

        let row = sqlx::query_as::<_, IssueRow>(
            "UPDATE issues SET subject = $2, body = $3, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, newsletter_id, subject, body, status, sent_at, recipient_count, \
                       created_at, updated_at",
        )
        .bind(id)
        .bind(subject)
        .bind(body)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.into_record()
    }

    async fn claim_issue(&self, id: Uuid) -> Result<Option<IssueRecord>, RepoError> {
        let row = sqlx::query_as::<_, IssueRow>(
            "UPDATE issues \
             SET status = $2, updated_at = now() \
             WHERE id = $1 AND status = $3 \
             RETURNING id, newsletter_id, subject, body, status, sent_at, recipient_count, \
                       created_at, updated_at",
        )
        .bind(id)
        .bind(IssueStatus::Sent)
        .bind(IssueStatus::Draft)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(IssueRow::into_record).transpose()
    }

    async fn mark_issue_sent(
        &self,
        id: Uuid,
        sent_at: OffsetDateTime,
        recipient_count: i32,
    ) -> Result<IssueRecord, RepoError> {
        let row = sqlx::query_as::<_, IssueRow>(
            "UPDATE issues \
             SET status = $2, sent_at = $3, recipient_count = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, newsletter_id, subject, body, status, sent_at, recipient_count, \
                       created_at, updated_at",
        )
        .bind(id)
        .bind(IssueStatus::Sent)
        .bind(sent_at)
        .bind(recipient_count)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.into_record()
    }

    async fn delete_issue(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM issues WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

impl PostgresRepositories {
    fn apply_issue_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q IssueQueryFilter) {
        if let Some(newsletter_id) = filter.newsletter_id {
            qb.push(" AND i.newsletter_id = ");
            qb.push_bind(newsletter_id);
            qb.push(" ");
        }

        if let Some(status) = filter.status {
            qb.push(" AND i.status = ");
            qb.push_bind(status);
            qb.push(" ");
        }
    }
}
