//! Main application state shared by every request handler

use std::{sync::Arc, time::Instant};

use tracing::info;

use crate::{
    config::{Config, SchedulerBackend, StoreBackend},
    error::{BotError, Result},
    services::{
        Alerter, DelayScheduler, KvStore, LocalScheduler, MemoryStore, Messenger, QStashScheduler,
        UpstashStore, WhatsAppMessenger,
    },
    tasks::TimerManager,
    utils::{Clock, SystemClock},
};

/// Path the delayed scheduler calls back on
pub const CRON_PATH: &str = "/api/cron";

/// External collaborators the bot talks to
pub struct Backends {
    pub store: Arc<dyn KvStore>,
    pub messenger: Arc<dyn Messenger>,
    pub scheduler: Arc<dyn DelayScheduler>,
    pub clock: Arc<dyn Clock>,
}

/// Deployment settings that are not credentials
#[derive(Debug, Clone)]
pub struct Settings {
    pub verify_token: String,
    pub alert_contact: String,
    pub location_link: String,
    pub public_url: Option<String>,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            verify_token: config.verify_token.clone(),
            alert_contact: config.alert_contact.clone(),
            location_link: config.location_link.clone(),
            public_url: config.public_url.clone(),
        }
    }
}

/// Application state. Holds no timer data itself; all of it lives in the store.
pub struct AppState {
    pub timers: TimerManager,
    pub messenger: Arc<dyn Messenger>,
    pub scheduler: Arc<dyn DelayScheduler>,
    pub verify_token: String,
    pub public_url: Option<String>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(backends: Backends, settings: Settings) -> Self {
        let alerter = Alerter::new(
            Arc::clone(&backends.messenger),
            settings.alert_contact,
            settings.location_link,
        );
        let timers = TimerManager::new(
            backends.store,
            Arc::clone(&backends.scheduler),
            alerter,
            backends.clock,
        );

        Self {
            timers,
            messenger: backends.messenger,
            scheduler: backends.scheduler,
            verify_token: settings.verify_token,
            public_url: settings.public_url,
            start_time: Instant::now(),
        }
    }

    /// Build production backends from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.verify_token.is_empty() {
            return Err(BotError::Config("WHATSAPP_VERIFY_TOKEN must not be empty".into()));
        }

        let store: Arc<dyn KvStore> = match config.store {
            StoreBackend::Upstash => {
                let (url, token) = config.redis_credentials()?;
                info!("Using Upstash store at {}", url);
                Arc::new(UpstashStore::new(url, token))
            }
            StoreBackend::Memory => {
                info!("Using in-memory store, timers will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        let scheduler: Arc<dyn DelayScheduler> = match config.scheduler {
            SchedulerBackend::Qstash => {
                let (url, token) = config.qstash_credentials()?;
                info!("Using QStash scheduler at {}", url);
                Arc::new(QStashScheduler::new(url, token))
            }
            SchedulerBackend::Local => {
                info!("Using local scheduler, pending callbacks will not survive a restart");
                Arc::new(LocalScheduler::new())
            }
        };

        let messenger = Arc::new(WhatsAppMessenger::new(
            &config.graph_api_base,
            &config.whatsapp_phone_id,
            &config.whatsapp_token,
        ));

        Ok(Self::new(
            Backends {
                store,
                messenger,
                scheduler,
                clock: Arc::new(SystemClock),
            },
            Settings::from(config),
        ))
    }

    /// URL the scheduler should call back on.
    ///
    /// Uses the configured public URL, else the Host header of the request that
    /// started the timer.
    pub fn callback_url(&self, host: Option<&str>) -> Result<String> {
        let base = match (self.public_url.as_deref(), host) {
            (Some(public), _) => public.to_string(),
            (None, Some(host)) if host.starts_with("http") => host.to_string(),
            (None, Some(host)) => format!("https://{}", host),
            (None, None) => {
                return Err(BotError::Config(
                    "no PUBLIC_URL configured and the request had no Host header".into(),
                ))
            }
        };
        Ok(format!("{}{}", base.trim_end_matches('/'), CRON_PATH))
    }

    /// Verify the token Meta presents when subscribing the webhook
    pub fn verify_webhook_token(&self, presented: Option<&str>) -> bool {
        !self.verify_token.is_empty() && presented == Some(self.verify_token.as_str())
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
