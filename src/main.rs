use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use lettera::{
    application::{
        assistant::AssistantService,
        delivery::{DeliveryService, Mailer},
        email::{generate_email_html, generate_plain_text_email},
        error::AppError,
        issues::IssueService,
        newsletters::NewsletterService,
        repos::{IssuesRepo, NewslettersRepo, SubscribersRepo},
        subscribers::SubscriberService,
    },
    config,
    domain::document::DocumentNode,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState, HttpState, RouterState},
        mailer::HttpMailer,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging).map_err(AppError::from)?;
            run_serve(settings).await
        }
        config::Command::Render(args) => run_render(args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let router_state = build_router_state(repositories, &settings);

    let public_router = http::build_router(router_state.clone());
    let api_router = http::build_api_router(router_state.clone());
    let app = public_router.merge(api_router).with_state(router_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "lettera::server",
        addr = %settings.server.addr,
        "Listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

fn run_render(args: config::RenderArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.file)
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let document: DocumentNode = serde_json::from_str(&raw)
        .map_err(|err| AppError::validation(format!("invalid document json: {err}")))?;

    let output = if args.text {
        generate_plain_text_email(&document, &args.title, &args.sender_name)
    } else {
        generate_email_html(&document, &args.title, &args.sender_name)
    };

    println!("{output}");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_router_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> RouterState {
    let newsletters_repo: Arc<dyn NewslettersRepo> = repositories.clone();
    let subscribers_repo: Arc<dyn SubscribersRepo> = repositories.clone();
    let issues_repo: Arc<dyn IssuesRepo> = repositories.clone();

    let newsletter_service = Arc::new(NewsletterService::new(newsletters_repo.clone()));
    let subscriber_service = Arc::new(SubscriberService::new(
        subscribers_repo.clone(),
        newsletters_repo.clone(),
    ));
    let issue_service = Arc::new(IssueService::new(
        issues_repo.clone(),
        newsletters_repo.clone(),
    ));

    let mailer: Option<Arc<dyn Mailer>> = HttpMailer::from_settings(&settings.mailer)
        .map(|mailer| Arc::new(mailer) as Arc<dyn Mailer>);
    let delivery_service = Arc::new(DeliveryService::new(
        issues_repo,
        newsletters_repo,
        subscribers_repo,
        mailer,
        settings.delivery.concurrency.get() as usize,
    ));

    let assistant_service = Arc::new(AssistantService::new(
        reqwest::Client::new(),
        settings.assistant.clone(),
    ));

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        Duration::from_secs(settings.rate_limit.window_seconds.get() as u64),
        settings.rate_limit.max_requests.get(),
    ));

    let http_state = HttpState {
        newsletters: newsletter_service.clone(),
        subscribers: subscriber_service.clone(),
        delivery: delivery_service.clone(),
        db: repositories.clone(),
        rate_limiter,
    };

    let api_state = ApiState {
        newsletters: newsletter_service,
        subscribers: subscriber_service,
        issues: issue_service,
        delivery: delivery_service,
        assistant: assistant_service,
        db: repositories,
        admin_token: settings
            .api
            .admin_token
            .as_deref()
            .map(Arc::<str>::from),
    };

    RouterState {
        http: http_state,
        api: api_state,
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install shutdown signal handler");
    }
}
