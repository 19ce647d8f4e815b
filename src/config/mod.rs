//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;


const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "lettera";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DELIVERY_CONCURRENCY: u32 = 4;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u32 = 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 30;
const DEFAULT_ASSISTANT_TEMPERATURE: f32 = 0.7;
const DEFAULT_ASSISTANT_MAX_TOKENS: u32 = 1000;

/// Command-line arguments for the Lettera binary.
#[derive(Debug, Parser)]
#[command(name = "lettera", version, about = "Lettera newsletter server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LETTERA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Lettera HTTP service.
    Serve(Box<ServeArgs>),
    /// Render a document JSON file to an email body on stdout.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the admin API bearer token.
    #[arg(long = "api-admin-token", value_name = "TOKEN")]
    pub api_admin_token: Option<String>,

    /// Override the per-issue delivery concurrency.
    #[arg(long = "delivery-concurrency", value_name = "COUNT")]
    pub delivery_concurrency: Option<u32>,

    /// Override the public subscribe rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u32>,

    /// Override the public subscribe rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Path to a document model JSON file.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Emit the plain-text part instead of HTML.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub text: bool,

    /// Newsletter title used in the rendered scaffold.
    #[arg(long, default_value = "Preview")]
    pub title: String,

    /// Sender name used in the rendered scaffold.
    #[arg(long = "sender", default_value = "Lettera")]
    pub sender_name: String,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub api: ApiSettings,
    pub mailer: MailerSettings,
    pub assistant: AssistantSettings,
    pub delivery: DeliverySettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Bearer token required by `/api/v1` routes. When unset the admin API
    /// rejects every request.
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MailerSettings {
    /// Endpoint of the transactional-email HTTP API. When unset, delivery is
    /// disabled and send attempts fail fast.
    pub api_url: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub concurrency: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse CLI arguments and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("LETTERA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    api: RawApiSettings,
    mailer: RawMailerSettings,
    assistant: RawAssistantSettings,
    delivery: RawDeliverySettings,
    rate_limit: RawRateLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(count) = overrides.database_max_connections {
            self.database.max_connections = Some(count);
        }
        if let Some(token) = overrides.api_admin_token.as_ref() {
            self.api.admin_token = Some(token.clone());
        }
        if let Some(count) = overrides.delivery_concurrency {
            self.delivery.concurrency = Some(count);
        }
        if let Some(seconds) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(seconds);
        }
        if let Some(count) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(count);
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    admin_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMailerSettings {
    api_url: Option<String>,
    api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssistantSettings {
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
    google_api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDeliverySettings {
    concurrency: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u32>,
    max_requests: Option<u32>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let host = raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = raw.server.port.unwrap_or(DEFAULT_PORT);
        let addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|err| LoadError::invalid("server.host", err.to_string()))?;

        let level = match raw.logging.level {
            Some(level) => LevelFilter::from_str(&level)
                .map_err(|err| LoadError::invalid("logging.level", err.to_string()))?,
            None => LevelFilter::INFO,
        };
        let format = if raw.logging.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        let max_connections = non_zero(
            raw.database.max_connections,
            DEFAULT_DB_MAX_CONNECTIONS,
            "database.max_connections",
        )?;
        let concurrency = non_zero(
            raw.delivery.concurrency,
            DEFAULT_DELIVERY_CONCURRENCY,
            "delivery.concurrency",
        )?;
        let window_seconds = non_zero(
            raw.rate_limit.window_seconds,
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
            "rate_limit.window_seconds",
        )?;
        let max_requests = non_zero(
            raw.rate_limit.max_requests,
            DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            "rate_limit.max_requests",
        )?;

        let temperature = raw
            .assistant
            .temperature
            .unwrap_or(DEFAULT_ASSISTANT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(LoadError::invalid(
                "assistant.temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        let max_tokens = raw
            .assistant
            .max_tokens
            .unwrap_or(DEFAULT_ASSISTANT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(LoadError::invalid("assistant.max_tokens", "must be non-zero"));
        }

        Ok(Self {
            server: ServerSettings { addr },
            logging: LoggingSettings { level, format },
            database: DatabaseSettings {
                url: raw.database.url,
                max_connections,
            },
            api: ApiSettings {
                admin_token: raw.api.admin_token.filter(|token| !token.is_empty()),
            },
            mailer: MailerSettings {
                api_url: raw.mailer.api_url.filter(|url| !url.is_empty()),
                api_token: raw.mailer.api_token,
            },
            assistant: AssistantSettings {
                openai_api_key: raw.assistant.openai_api_key,
                anthropic_api_key: raw.assistant.anthropic_api_key,
                google_api_key: raw.assistant.google_api_key,
                temperature,
                max_tokens,
            },
            delivery: DeliverySettings { concurrency },
            rate_limit: RateLimitSettings {
                window_seconds,
                max_requests,
            },
        })
    }
}

fn non_zero(value: Option<u32>, default: u32, key: &'static str) -> Result<NonZeroU32, LoadError> {
    NonZeroU32::new(value.unwrap_or(default))
        .ok_or_else(|| LoadError::invalid(key, "must be non-zero"))
}
