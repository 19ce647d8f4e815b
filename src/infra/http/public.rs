use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    application::{
        delivery::DeliveryService,
        newsletters::NewsletterService,
        subscribers::{CreateSubscriberCommand, SubscriberError, SubscriberService},
    },
    domain::types::SubscriberStatus,
    infra::db::PostgresRepositories,
};

use super::{
    RouterState, db_health_response,
    api::{error::ApiError, rate_limit::ApiRateLimiter},
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub newsletters: Arc<NewsletterService>,
    pub subscribers: Arc<SubscriberService>,
    pub delivery: Arc<DeliveryService>,
    pub db: Arc<PostgresRepositories>,
    pub rate_limiter: Arc<ApiRateLimiter>,
}

pub fn build_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", get(unsubscribe))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    newsletter_id: Uuid,
    email: String,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubscribeResponse {
    status: &'static str,
}

async fn subscribe(
    State(state): State<HttpState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<SubscribeRequest>,
) -> Response {
    let caller = client_key(&headers, addr);
    if !state.rate_limiter.allow(&caller, "/subscribe") {
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    let command = CreateSubscriberCommand {
        newsletter_id: payload.newsletter_id,
        email: payload.email,
        name: payload.name,
        status: SubscriberStatus::Active,
    };

    let subscriber = match state.subscribers.subscribe(command).await {
        Ok(subscriber) => subscriber,
        Err(SubscriberError::Duplicate) => {
            return ApiError::conflict(
                "Email is already subscribed to this newsletter",
                None,
            )
            .into_response();
        }
        Err(SubscriberError::NewsletterNotFound) => {
            return ApiError::not_found("newsletter not found").into_response();
        }
        Err(SubscriberError::ConstraintViolation(message)) => {
            return ApiError::bad_request("Invalid subscription", Some(message.to_string()))
                .into_response();
        }
        Err(err) => {
            return ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                super::api::error::codes::REPO,
                "Subscription failed",
                Some(err.to_string()),
            )
            .into_response();
        }
    };

    // Welcome email is best-effort and must not block the signup response.
    if let Ok(Some(newsletter)) = state.newsletters.find_by_id(subscriber.newsletter_id).await {
        let delivery = state.delivery.clone();
        let subscriber = subscriber.clone();
        tokio::spawn(async move {
            delivery.send_welcome(&newsletter, &subscriber).await;
        });
    }

    (
        StatusCode::CREATED,
        axum::Json(SubscribeResponse {
            status: "subscribed",
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct UnsubscribeQuery {
    id: Uuid,
}

async fn unsubscribe(
    State(state): State<HttpState>,
    Query(query): Query<UnsubscribeQuery>,
) -> Response {
    match state.subscribers.unsubscribe(query.id).await {
        Ok(_) => Html(
            "<!DOCTYPE html><html><body style=\"font-family: sans-serif; text-align: center; \
             padding: 40px;\"><h1>You have been unsubscribed</h1>\
             <p>You will no longer receive emails from this newsletter.</p></body></html>"
                .to_string(),
        )
        .into_response(),
        Err(SubscriberError::NotFound) => (
            StatusCode::NOT_FOUND,
            Html(
                "<!DOCTYPE html><html><body style=\"font-family: sans-serif; text-align: center; \
                 padding: 40px;\"><h1>Subscription not found</h1>\
                 <p>This unsubscribe link is no longer valid.</p></body></html>"
                    .to_string(),
            ),
        )
            .into_response(),
        Err(err) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            super::api::error::codes::REPO,
            "Unsubscribe failed",
            Some(err.to_string()),
        )
        .into_response(),
    }
}

fn client_key(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::OffsetDateTime;

    use super::*;
    use crate::application::pagination::{
        CursorPage, IssueCursor, PageRequest, SubscriberCursor,
    };
    use crate::application::repos::{
        CreateIssueParams, CreateNewsletterParams, CreateSubscriberParams, IssueQueryFilter,
        IssuesRepo, NewslettersRepo, RepoError, SubscriberQueryFilter, SubscribersRepo,
        UpdateIssueParams, UpdateNewsletterParams, UpdateSubscriberParams,
    };
    use crate::domain::entities::{IssueRecord, NewsletterRecord, SubscriberRecord};

    fn newsletter() -> NewsletterRecord {
        let now = OffsetDateTime::now_utc();
        NewsletterRecord {
            id: Uuid::new_v4(),
            title: "Weekly Digest".into(),
            sender_name: "Ada".into(),
            sender_email: "ada@example.com".into(),
            base_url: "https://news.example.com".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn subscriber_for(newsletter_id: Uuid, email: &str) -> SubscriberRecord {
        let now = OffsetDateTime::now_utc();
        SubscriberRecord {
            id: Uuid::new_v4(),
            newsletter_id,
            email: email.to_string(),
            name: None,
            status: SubscriberStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    struct FixedNewsletters {
        newsletter: NewsletterRecord,
    }

    #[async_trait::async_trait]
    impl NewslettersRepo for FixedNewsletters {
        async fn list_newsletters(&self) -> Result<Vec<NewsletterRecord>, RepoError> {
            unimplemented!()
        }

        async fn find_newsletter(&self, id: Uuid) -> Result<Option<NewsletterRecord>, RepoError> {
            Ok((self.newsletter.id == id).then(|| self.newsletter.clone()))
        }

        async fn create_newsletter(
            &self,
            _params: CreateNewsletterParams,
        ) -> Result<NewsletterRecord, RepoError> {
            unimplemented!()
        }

        async fn update_newsletter(
            &self,
            _params: UpdateNewsletterParams,
        ) -> Result<NewsletterRecord, RepoError> {
            unimplemented!()
        }

        async fn delete_newsletter(&self, _id: Uuid) -> Result<(), RepoError> {
            unimplemented!()
        }
    }

    /// Signup-path subscriber store: an optional pre-existing row for the
    /// duplicate case, creation echoes the params back.
    struct SignupSubscribers {
        existing: Option<SubscriberRecord>,
    }

    #[async_trait::async_trait]
    impl SubscribersRepo for SignupSubscribers {
        async fn list_subscribers(
            &self,
            _filter: &SubscriberQueryFilter,
            _page: PageRequest<SubscriberCursor>,
        ) -> Result<CursorPage<SubscriberRecord>, RepoError> {
            unimplemented!()
        }

        async fn count_subscribers(
            &self,
            _filter: &SubscriberQueryFilter,
        ) -> Result<u64, RepoError> {
            unimplemented!()
        }

        async fn find_subscriber(&self, _id: Uuid) -> Result<Option<SubscriberRecord>, RepoError> {
            unimplemented!()
        }

        async fn find_subscriber_by_email(
            &self,
            _newsletter_id: Uuid,
            _email: &str,
        ) -> Result<Option<SubscriberRecord>, RepoError> {
            Ok(self.existing.clone())
        }

        async fn list_active_subscribers(
            &self,
            _newsletter_id: Uuid,
        ) -> Result<Vec<SubscriberRecord>, RepoError> {
            unimplemented!()
        }

        async fn create_subscriber(
            &self,
            params: CreateSubscriberParams,
        ) -> Result<SubscriberRecord, RepoError> {
            let now = OffsetDateTime::now_utc();
            Ok(SubscriberRecord {
                id: Uuid::new_v4(),
                newsletter_id: params.newsletter_id,
                email: params.email,
                name: params.name,
                status: params.status,
                created_at: now,
                updated_at: now,
            })
        }

        async fn update_subscriber(
            &self,
            _id: Uuid,
            _params: UpdateSubscriberParams,
        ) -> Result<SubscriberRecord, RepoError> {
            unimplemented!()
        }

        async fn set_subscriber_status(
            &self,
            _id: Uuid,
            _status: SubscriberStatus,
        ) -> Result<SubscriberRecord, RepoError> {
            unimplemented!()
        }

        async fn delete_subscriber(&self, _id: Uuid) -> Result<(), RepoError> {
            unimplemented!()
        }
    }

    struct NoIssues;

    #[async_trait::async_trait]
    impl IssuesRepo for NoIssues {
        async fn list_issues(
            &self,
            _filter: &IssueQueryFilter,
            _page: PageRequest<IssueCursor>,
        ) -> Result<CursorPage<IssueRecord>, RepoError> {
            unimplemented!()
        }

        async fn find_issue(&self, _id: Uuid) -> Result<Option<IssueRecord>, RepoError> {
            unimplemented!()
        }

        async fn create_issue(&self, _params: CreateIssueParams) -> Result<IssueRecord, RepoError> {
            unimplemented!()
        }

        async fn update_issue(&self, _params: UpdateIssueParams) -> Result<IssueRecord, RepoError> {
            unimplemented!()
        }

        async fn claim_issue(&self, _id: Uuid) -> Result<Option<IssueRecord>, RepoError> {
            unimplemented!()
        }

        async fn mark_issue_sent(
            &self,
            _id: Uuid,
            _sent_at: OffsetDateTime,
            _recipient_count: i32,
        ) -> Result<IssueRecord, RepoError> {
            unimplemented!()
        }

        async fn delete_issue(&self, _id: Uuid) -> Result<(), RepoError> {
            unimplemented!()
        }
    }

    fn state_for(
        newsletter: NewsletterRecord,
        existing: Option<SubscriberRecord>,
    ) -> HttpState {
        let newsletters_repo: Arc<dyn NewslettersRepo> =
            Arc::new(FixedNewsletters { newsletter });
        let subscribers_repo: Arc<dyn SubscribersRepo> =
            Arc::new(SignupSubscribers { existing });
        let issues_repo: Arc<dyn IssuesRepo> = Arc::new(NoIssues);

        HttpState {
            newsletters: Arc::new(NewsletterService::new(newsletters_repo.clone())),
            subscribers: Arc::new(SubscriberService::new(
                subscribers_repo.clone(),
                newsletters_repo.clone(),
            )),
            delivery: Arc::new(DeliveryService::new(
                issues_repo,
                newsletters_repo,
                subscribers_repo,
                None,
                1,
            )),
            db: Arc::new(PostgresRepositories::new(
                sqlx::postgres::PgPoolOptions::new()
                    .connect_lazy("postgres://localhost/lettera")
                    .unwrap(),
            )),
            rate_limiter: Arc::new(ApiRateLimiter::new(Duration::from_secs(60), 30)),
        }
    }

    fn local_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn duplicate_public_signup_returns_conflict() {
        let newsletter = newsletter();
        let existing = subscriber_for(newsletter.id, "reader@example.com");
        let state = state_for(newsletter.clone(), Some(existing));

        let response = subscribe(
            State(state),
            ConnectInfo(local_addr()),
            HeaderMap::new(),
            axum::Json(SubscribeRequest {
                newsletter_id: newsletter.id,
                email: "reader@example.com".to_string(),
                name: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn fresh_public_signup_returns_created() {
        let newsletter = newsletter();
        let state = state_for(newsletter.clone(), None);

        let response = subscribe(
            State(state),
            ConnectInfo(local_addr()),
            HeaderMap::new(),
            axum::Json(SubscribeRequest {
                newsletter_id: newsletter.id,
                email: "reader@example.com".to_string(),
                name: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
