//! Per-user check-in timer lifecycle
//!
//! Every transition writes the record and its active-set membership in one
//! store transaction. There is no lock across the read in [`TimerManager::resolve_timer`]
//! and the write that follows, so two commands racing for the same user are
//! last-write-wins.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    error::{BotError, Result},
    services::{
        alert::REASON_MISSED_CHECK_IN, Alerter, DelayScheduler, KvOp, KvStore, ScheduleToken,
    },
    state::timer_record::{fields, record_key, Resolution, TimerRecord, ACTIVE_SET},
    utils::Clock,
};

/// Owns start, resolve and expiry of check-in timers
pub struct TimerManager {
    store: Arc<dyn KvStore>,
    scheduler: Arc<dyn DelayScheduler>,
    alerter: Alerter,
    clock: Arc<dyn Clock>,
}

impl TimerManager {
    pub fn new(
        store: Arc<dyn KvStore>,
        scheduler: Arc<dyn DelayScheduler>,
        alerter: Alerter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            scheduler,
            alerter,
            clock,
        }
    }

    pub fn alerter(&self) -> &Alerter {
        &self.alerter
    }

    /// Read a user's timer record, `None` if the user never started one
    pub async fn get_timer(&self, user: &str) -> Result<Option<TimerRecord>> {
        let map = self.store.hgetall(&record_key(user)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        TimerRecord::from_fields(&map)
            .map(Some)
            .map_err(|reason| BotError::CorruptRecord {
                user: user.to_string(),
                reason,
            })
    }

    /// Start (or restart) a timer of `minutes`, already validated by the caller.
    ///
    /// Any previous record is replaced wholesale; a callback still pending for an
    /// active previous timer is cancelled.
    pub async fn start_timer(&self, user: &str, minutes: u32) -> Result<TimerRecord> {
        match self.get_timer(user).await {
            Ok(Some(previous)) if previous.is_active() => {
                if let Some(callback_id) = previous.callback_id {
                    self.cancel_callback(user, ScheduleToken(callback_id)).await;
                }
            }
            Ok(_) => {}
            Err(BotError::CorruptRecord { reason, .. }) => {
                warn!("Overwriting corrupt timer record for {}: {}", user, reason);
            }
            Err(e) => return Err(e),
        }

        let record = TimerRecord::active(self.clock.now_ms(), minutes);
        let key = record_key(user);
        self.store
            .transaction(vec![
                KvOp::del(key.clone()),
                KvOp::hset(key, record.to_fields()),
                KvOp::sadd(ACTIVE_SET, user),
            ])
            .await?;

        info!("Timer started for {}: {} minutes, expires at {}", user, minutes, record.expires_at);
        Ok(record)
    }

    /// Remember which scheduled callback belongs to the user's timer
    pub async fn attach_callback(&self, user: &str, token: &ScheduleToken) -> Result<()> {
        self.store
            .hset(
                &record_key(user),
                vec![(fields::CALLBACK_ID.to_string(), token.0.clone())],
            )
            .await?;
        debug!("Callback {} attached to timer for {}", token, user);
        Ok(())
    }

    /// Resolve the user's active timer. Returns `false` when there is none.
    pub async fn resolve_timer(&self, user: &str, resolution: Resolution) -> Result<bool> {
        self.resolve(user, resolution, true).await
    }

    async fn resolve(&self, user: &str, resolution: Resolution, cancel_pending: bool) -> Result<bool> {
        let record = match self.get_timer(user).await? {
            Some(record) if record.is_active() => record,
            Some(_) => {
                debug!("Timer for {} is already resolved", user);
                return Ok(false);
            }
            None => {
                debug!("No timer for {}", user);
                return Ok(false);
            }
        };

        let key = record_key(user);
        self.store
            .transaction(vec![
                KvOp::hset(key, TimerRecord::resolved_fields(resolution, self.clock.now_ms())),
                KvOp::srem(ACTIVE_SET, user),
            ])
            .await?;

        info!("Timer for {} resolved: {}", user, resolution);

        if cancel_pending {
            if let Some(callback_id) = record.callback_id {
                self.cancel_callback(user, ScheduleToken(callback_id)).await;
            }
        }
        Ok(true)
    }

    /// Alert and resolve every active timer whose deadline has passed.
    ///
    /// Returns how many timers expired. Timers still running are left alone.
    /// A failure on one user is logged and the sweep moves on.
    pub async fn expire_timers_now(&self) -> Result<usize> {
        let now = self.clock.now_ms();
        let users = self.store.smembers(ACTIVE_SET).await?;
        debug!("Sweeping {} active timers", users.len());

        let mut expired = 0;
        for user in users {
            match self.expire_one(&user, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => error!("Failed to expire timer for {}: {}", user, e),
            }
        }

        if expired > 0 {
            info!("Expired {} timers", expired);
        }
        Ok(expired)
    }

    async fn expire_one(&self, user: &str, now: i64) -> Result<bool> {
        let record = match self.get_timer(user).await? {
            Some(record) => record,
            None => {
                warn!("{} is in the active set without a timer record", user);
                return Ok(false);
            }
        };

        if !record.is_expired_at(now) {
            return Ok(false);
        }

        self.alerter.alert_contact(user, REASON_MISSED_CHECK_IN).await?;
        // the callback that triggered this sweep is the one being delivered
        self.resolve(user, Resolution::Alert, false).await?;
        Ok(true)
    }

    async fn cancel_callback(&self, user: &str, token: ScheduleToken) {
        if let Err(e) = self.scheduler.cancel(&token).await {
            warn!("Failed to cancel callback {} for {}: {}", token, user, e);
        }
    }
}
