//! Configuration and CLI argument handling

use clap::{Parser, ValueEnum};

use crate::error::{BotError, Result};

/// Which key-value backend holds the timer records
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Upstash Redis over its REST API
    Upstash,
    /// Process-local map, lost on restart
    Memory,
}

/// Which service fires the delayed expiry callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchedulerBackend {
    /// Upstash QStash delayed publish
    Qstash,
    /// In-process tokio timers calling back over HTTP
    Local,
}

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "safe-showing")]
#[command(about = "A WhatsApp check-in bot that alerts a contact when a showing timer lapses")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Secret that Meta must present when verifying the webhook
    #[arg(long, env = "WHATSAPP_VERIFY_TOKEN")]
    pub verify_token: String,

    /// Graph API access token used to send messages
    #[arg(long, env = "WHATSAPP_TOKEN")]
    pub whatsapp_token: String,

    /// WhatsApp phone number id messages are sent from
    #[arg(long, env = "WHATSAPP_PHONE_ID")]
    pub whatsapp_phone_id: String,

    /// Graph API base URL, including the version segment
    #[arg(long, env = "WHATSAPP_GRAPH_URL", default_value = "https://graph.facebook.com/v20.0")]
    pub graph_api_base: String,

    /// Phone number that receives every alert
    #[arg(long, env = "TEST_CONTACT_PHONE")]
    pub alert_contact: String,

    /// Location link included in alert messages
    #[arg(long, env = "ALERT_LOCATION_LINK", default_value = "https://maps.google.com")]
    pub location_link: String,

    /// Timer store backend
    #[arg(long, env = "TIMER_STORE", value_enum, default_value = "upstash")]
    pub store: StoreBackend,

    /// Upstash Redis REST URL
    #[arg(long, env = "UPSTASH_REDIS_REST_URL")]
    pub redis_url: Option<String>,

    /// Upstash Redis REST token
    #[arg(long, env = "UPSTASH_REDIS_REST_TOKEN")]
    pub redis_token: Option<String>,

    /// Delayed callback backend
    #[arg(long, env = "DELAY_SCHEDULER", value_enum, default_value = "qstash")]
    pub scheduler: SchedulerBackend,

    /// QStash base URL
    #[arg(long, env = "QSTASH_URL")]
    pub qstash_url: Option<String>,

    /// QStash token
    #[arg(long, env = "QSTASH_TOKEN")]
    pub qstash_token: Option<String>,

    /// Public base URL of this server, used to build the expiry callback URL.
    /// Falls back to the Host header of the inbound request.
    #[arg(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments and environment
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Redis REST credentials, required when the upstash store is selected
    pub fn redis_credentials(&self) -> Result<(&str, &str)> {
        required_pair(
            self.redis_url.as_deref(),
            self.redis_token.as_deref(),
            "UPSTASH_REDIS_REST_URL and UPSTASH_REDIS_REST_TOKEN are required for the upstash store",
        )
    }

    /// QStash credentials, required when the qstash scheduler is selected
    pub fn qstash_credentials(&self) -> Result<(&str, &str)> {
        required_pair(
            self.qstash_url.as_deref(),
            self.qstash_token.as_deref(),
            "QSTASH_URL and QSTASH_TOKEN are required for the qstash scheduler",
        )
    }
}

fn required_pair<'a>(
    url: Option<&'a str>,
    token: Option<&'a str>,
    message: &str,
) -> Result<(&'a str, &'a str)> {
    match (url, token) {
        (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => Ok((url, token)),
        _ => Err(BotError::Config(message.to_string())),
    }
}
