use std::sync::Arc;

use crate::application::assistant::AssistantService;
use crate::application::delivery::DeliveryService;
use crate::application::issues::IssueService;
use crate::application::newsletters::NewsletterService;
use crate::application::subscribers::SubscriberService;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub newsletters: Arc<NewsletterService>,
    pub subscribers: Arc<SubscriberService>,
    pub issues: Arc<IssueService>,
    pub delivery: Arc<DeliveryService>,
    pub assistant: Arc<AssistantService>,
    pub db: Arc<PostgresRepositories>,
    /// Bearer token admitted by the admin auth middleware. `None` means the
    /// admin API is disabled.
    pub admin_token: Option<Arc<str>>,
}
