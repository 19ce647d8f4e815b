//! Issue delivery: render once, inject per-subscriber unsubscribe links and
//! fan out to the mailer with bounded concurrency.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::email::add_unsubscribe_link;
use crate::application::issues::render_issue;
use crate::application::repos::{IssuesRepo, NewslettersRepo, RepoError, SubscribersRepo};
use crate::domain::entities::{NewsletterRecord, SubscriberRecord};

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mailer transport failed: {0}")]
    Transport(String),
    #[error("mailer rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// One fully-assembled outbound message.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub from_name: String,
    pub from_email: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Seam to the outbound transactional-email collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailerError>;
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("issue not found")]
    IssueNotFound,
    #[error("newsletter not found")]
    NewsletterNotFound,
    #[error("issue has already been sent")]
    AlreadySent,
    #[error("no mailer is configured")]
    MailerUnconfigured,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeliveryReport {
    pub recipients: u64,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Clone)]
pub struct DeliveryService {
    issues: Arc<dyn IssuesRepo>,
    newsletters: Arc<dyn NewslettersRepo>,
    subscribers: Arc<dyn SubscribersRepo>,
    mailer: Option<Arc<dyn Mailer>>,
    concurrency: usize,
}

impl DeliveryService {
    pub fn new(
        issues: Arc<dyn IssuesRepo>,
        newsletters: Arc<dyn NewslettersRepo>,
        subscribers: Arc<dyn SubscribersRepo>,
        mailer: Option<Arc<dyn Mailer>>,
        concurrency: usize,
    ) -> Self {
        Self {
            issues,
            newsletters,
            subscribers,
            mailer,
            concurrency: concurrency.clamp(1, 32),
        }
    }

    pub fn mailer_configured(&self) -> bool {
        self.mailer.is_some()
    }

    /// Send an issue to every active subscriber of its newsletter.
    ///
    /// The issue is claimed up front with a conditional draft-to-sent status
    /// flip, so concurrent send requests for the same issue deliver at most
    /// once: the loser of the claim gets `AlreadySent`. The body renders
    /// once; only the unsubscribe footer differs per recipient. Individual
    /// send failures are logged and counted, never fatal: the issue is
    /// stamped with the send time and delivered count at the end.
    pub async fn send_issue(&self, issue_id: Uuid) -> Result<DeliveryReport, DeliveryError> {
        let mailer = self
            .mailer
            .clone()
            .ok_or(DeliveryError::MailerUnconfigured)?;

        let issue = match self.issues.claim_issue(issue_id).await? {
            Some(issue) => issue,
            None => {
                return Err(match self.issues.find_issue(issue_id).await? {
                    Some(_) => DeliveryError::AlreadySent,
                    None => DeliveryError::IssueNotFound,
                });
            }
        };

        let newsletter = self
            .newsletters
            .find_newsletter(issue.newsletter_id)
            .await?
            .ok_or(DeliveryError::NewsletterNotFound)?;

        let recipients = self
            .subscribers
            .list_active_subscribers(newsletter.id)
            .await?;
        let rendered = render_issue(&issue, &newsletter.sender_name);

        let delivered = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        stream::iter(recipients.iter())
            .for_each_concurrent(Some(self.concurrency), |subscriber| {
                let mailer = mailer.clone();
                let newsletter = &newsletter;
                let rendered = &rendered;
                let delivered = delivered.clone();
                let failed = failed.clone();
                async move {
                    let subscriber_id = subscriber.id.to_string();
                    let message = OutboundEmail {
                        from_name: newsletter.sender_name.clone(),
                        from_email: newsletter.sender_email.clone(),
                        to: subscriber.email.clone(),
                        subject: rendered.subject.clone(),
                        html: add_unsubscribe_link(
                            &rendered.html,
                            &subscriber_id,
                            &newsletter.base_url,
                            false,
                        ),
                        text: add_unsubscribe_link(
                            &rendered.text,
                            &subscriber_id,
                            &newsletter.base_url,
                            true,
                        ),
                    };

                    match mailer.send(&message).await {
                        Ok(()) => {
                            delivered.fetch_add(1, Ordering::Relaxed);
                            counter!("lettera_emails_sent_total").increment(1);
                        }
                        Err(err) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            counter!("lettera_emails_failed_total").increment(1);
                            warn!(
                                target = "lettera::delivery",
                                issue_id = %issue.id,
                                subscriber_id = %subscriber.id,
                                error = %err,
                                "email delivery failed"
                            );
                        }
                    }
                }
            })
            .await;

        let delivered = delivered.load(Ordering::Relaxed) as u64;
        let failed = failed.load(Ordering::Relaxed) as u64;

        self.issues
            .mark_issue_sent(
                issue.id,
                OffsetDateTime::now_utc(),
                i32::try_from(delivered).unwrap_or(i32::MAX),
            )
            .await?;

        info!(
            target = "lettera::delivery",
            issue_id = %issue.id,
            recipients = recipients.len(),
            delivered,
            failed,
            "issue delivery finished"
        );

        Ok(DeliveryReport {
            recipients: recipients.len() as u64,
            delivered,
            failed,
        })
    }

    /// Greet a fresh signup. Best effort: a failure is logged, not surfaced,
    /// so a flaky mailer can never break the subscribe flow.
    pub async fn send_welcome(&self, newsletter: &NewsletterRecord, subscriber: &SubscriberRecord) {
        let Some(mailer) = self.mailer.clone() else {
            return;
        };

        let greeting = subscriber.name.as_deref().unwrap_or("there");
        let message = OutboundEmail {
            from_name: newsletter.sender_name.clone(),
            from_email: newsletter.sender_email.clone(),
            to: subscriber.email.clone(),
            subject: format!("Welcome to {}", newsletter.title),
            html: format!(
                "<div style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto;\">\
                 <h1>Welcome, {greeting}!</h1>\
                 <p>You are now subscribed to {title}. New issues will arrive in this inbox.</p>\
                 <p>Best regards,<br>{sender}</p></div>",
                title = newsletter.title,
                sender = newsletter.sender_name,
            ),
            text: format!(
                "Welcome, {greeting}!\n\nYou are now subscribed to {}. New issues will arrive in this inbox.\n\nBest regards,\n{}",
                newsletter.title, newsletter.sender_name,
            ),
        };

        if let Err(err) = mailer.send(&message).await {
            warn!(
                target = "lettera::delivery",
                subscriber_id = %subscriber.id,
                error = %err,
                "welcome email failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::application::pagination::{CursorPage, IssueCursor, PageRequest, SubscriberCursor};
    use crate::application::repos::{
        CreateIssueParams, CreateNewsletterParams, CreateSubscriberParams, IssueQueryFilter,
        SubscriberQueryFilter, UpdateIssueParams, UpdateNewsletterParams, UpdateSubscriberParams,
    };
    use crate::domain::document::DocumentNode;
    use crate::domain::entities::IssueRecord;
    use crate::domain::types::{IssueStatus, SubscriberStatus};

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

    fn draft_issue(newsletter_id: Uuid) -> IssueRecord {
        let now = OffsetDateTime::now_utc();
        IssueRecord {
            id: Uuid::new_v4(),
            newsletter_id,
            subject: "Issue #1".into(),
            body: DocumentNode::empty_doc(),
            status: IssueStatus::Draft,
            sent_at: None,
            recipient_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn subscriber(newsletter_id: Uuid) -> SubscriberRecord {
        let now = OffsetDateTime::now_utc();
        SubscriberRecord {
            id: Uuid::new_v4(),
            newsletter_id,
            email: "reader@example.com".into(),
            name: None,
            status: SubscriberStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    struct SingleIssueRepo {
        issue: Mutex<IssueRecord>,
    }

    #[async_trait]
    impl IssuesRepo for SingleIssueRepo {
        async fn list_issues(
            &self,
            _filter: &IssueQueryFilter,
            _page: PageRequest<IssueCursor>,
        ) -> Result<CursorPage<IssueRecord>, RepoError> {
            unimplemented!()
        }

        async fn find_issue(&self, id: Uuid) -> Result<Option<IssueRecord>, RepoError> {
            let issue = self.issue.lock().unwrap();
            Ok((issue.id == id).then(|| issue.clone()))
        }

        async fn create_issue(&self, _params: CreateIssueParams) -> Result<IssueRecord, RepoError> {
            unimplemented!()
        }

        async fn update_issue(&self, _params: UpdateIssueParams) -> Result<IssueRecord, RepoError> {
            unimplemented!()
        }

        async fn claim_issue(&self, id: Uuid) -> Result<Option<IssueRecord>, RepoError> {
            let mut issue = self.issue.lock().unwrap();
            if issue.id != id || issue.status != IssueStatus::Draft {
                return Ok(None);
            }
            issue.status = IssueStatus::Sent;
            Ok(Some(issue.clone()))
        }

        async fn mark_issue_sent(
            &self,
            _id: Uuid,
            sent_at: OffsetDateTime,
            recipient_count: i32,
        ) -> Result<IssueRecord, RepoError> {
            let mut issue = self.issue.lock().unwrap();
            issue.sent_at = Some(sent_at);
            issue.recipient_count = recipient_count;
            Ok(issue.clone())
        }

        async fn delete_issue(&self, _id: Uuid) -> Result<(), RepoError> {
            unimplemented!()
        }
    }

    struct SingleNewsletterRepo {
        newsletter: NewsletterRecord,
    }

    #[async_trait]
    impl NewslettersRepo for SingleNewsletterRepo {
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

    struct ActiveSubscribersRepo {
        subscribers: Vec<SubscriberRecord>,
    }

    #[async_trait]
    impl SubscribersRepo for ActiveSubscribersRepo {
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
            unimplemented!()
        }

        async fn list_active_subscribers(
            &self,
            _newsletter_id: Uuid,
        ) -> Result<Vec<SubscriberRecord>, RepoError> {
            Ok(self.subscribers.clone())
        }

        async fn create_subscriber(
            &self,
            _params: CreateSubscriberParams,
        ) -> Result<SubscriberRecord, RepoError> {
            unimplemented!()
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

    /// Records every accepted message; yields before recording so concurrent
    /// sends genuinely interleave.
    struct RecordingMailer {
        sent: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &OutboundEmail) -> Result<(), MailerError> {
            tokio::task::yield_now().await;
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn service_for(
        issue: IssueRecord,
        newsletter: NewsletterRecord,
        subscribers: Vec<SubscriberRecord>,
        mailer: Arc<RecordingMailer>,
    ) -> DeliveryService {
        DeliveryService::new(
            Arc::new(SingleIssueRepo {
                issue: Mutex::new(issue),
            }),
            Arc::new(SingleNewsletterRepo { newsletter }),
            Arc::new(ActiveSubscribersRepo { subscribers }),
            Some(mailer),
            4,
        )
    }

    #[tokio::test]
    async fn concurrent_send_requests_deliver_at_most_once() {
        let newsletter = newsletter();
        let issue = draft_issue(newsletter.id);
        let issue_id = issue.id;
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
        });
        let service = service_for(issue, newsletter.clone(), vec![subscriber(newsletter.id)], mailer.clone());

        let (first, second) = tokio::join!(service.send_issue(issue_id), service.send_issue(issue_id));

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(DeliveryError::AlreadySent)))
        );
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resending_a_sent_issue_is_rejected() {
        let newsletter = newsletter();
        let issue = draft_issue(newsletter.id);
        let issue_id = issue.id;
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
        });
        let service = service_for(issue, newsletter.clone(), vec![subscriber(newsletter.id)], mailer.clone());

        let report = service.send_issue(issue_id).await.unwrap();
        assert_eq!(report.delivered, 1);

        let second = service.send_issue(issue_id).await;
        assert!(matches!(second, Err(DeliveryError::AlreadySent)));
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sending_an_unknown_issue_reports_not_found() {
        let newsletter = newsletter();
        let issue = draft_issue(newsletter.id);
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
        });
        let service = service_for(issue, newsletter.clone(), Vec::new(), mailer);

        let result = service.send_issue(Uuid::new_v4()).await;
        assert!(matches!(result, Err(DeliveryError::IssueNotFound)));
    }
}
