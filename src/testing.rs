//! Test doubles for the outbound services

use std::{
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::{BotError, Result},
    services::{DelayScheduler, MemoryStore, Messenger, ScheduleToken},
    state::{AppState, Backends, Settings},
    tasks::TimerManager,
    utils::Clock,
};

/// Messenger that records every message instead of sending it
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(recipient, _)| recipient == to)
            .map(|(_, body)| body)
            .collect()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BotError::Messenger("send disabled in test".into()));
        }
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// Scheduler that records requests and hands out sequential tokens
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(String, Duration, ScheduleToken)>>,
    cancelled: Mutex<Vec<ScheduleToken>>,
    next_id: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingScheduler {
    pub fn scheduled(&self) -> Vec<(String, Duration, ScheduleToken)> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<ScheduleToken> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DelayScheduler for RecordingScheduler {
    async fn schedule(&self, destination: &str, delay: Duration) -> Result<ScheduleToken> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BotError::Scheduler("schedule disabled in test".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let token = ScheduleToken(format!("cb-{}", id));
        self.scheduled
            .lock()
            .unwrap()
            .push((destination.to_string(), delay, token.clone()));
        Ok(token)
    }

    async fn cancel(&self, token: &ScheduleToken) -> Result<()> {
        self.cancelled.lock().unwrap().push(token.clone());
        Ok(())
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn at(now_ms: i64) -> Self {
        Self { now_ms: AtomicI64::new(now_ms) }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

pub const CONTACT: &str = "15550009999";
pub const VERIFY_TOKEN: &str = "verify-secret";
pub const LOCATION_LINK: &str = "https://maps.google.com";

/// A fully wired bot over in-memory and recording backends
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub scheduler: Arc<RecordingScheduler>,
    pub clock: Arc<ManualClock>,
    pub state: Arc<AppState>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_public_url(url: &str) -> Self {
        Self::build(Some(url.to_string()))
    }

    fn build(public_url: Option<String>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let clock = Arc::new(ManualClock::at(1_700_000_000_000));

        let state = Arc::new(AppState::new(
            Backends {
                store: store.clone(),
                messenger: messenger.clone(),
                scheduler: scheduler.clone(),
                clock: clock.clone(),
            },
            Settings {
                verify_token: VERIFY_TOKEN.to_string(),
                alert_contact: CONTACT.to_string(),
                location_link: LOCATION_LINK.to_string(),
                public_url,
            },
        ));

        Self {
            store,
            messenger,
            scheduler,
            clock,
            state,
        }
    }

    pub fn timers(&self) -> &TimerManager {
        &self.state.timers
    }
}
