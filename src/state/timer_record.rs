//! Timer record structure and its hash encoding

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Hash field names as stored in the key-value store
pub mod fields {
    pub const STATUS: &str = "status";
    pub const EXPIRES_AT: &str = "expiresAt";
    pub const MINUTES: &str = "minutes";
    pub const RESOLUTION: &str = "resolution";
    pub const RESOLVED_AT: &str = "resolvedAt";
    pub const CALLBACK_ID: &str = "callbackId";
}

/// Key of the set holding every user with an active timer
pub const ACTIVE_SET: &str = "timers:agents";

/// Hash key for a user's timer record
pub fn record_key(user: &str) -> String {
    format!("timer:{}", user)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Active,
    Resolved,
}

/// How a timer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// The user confirmed they are safe
    Safe,
    /// The contact was alerted, manually or on expiry
    Alert,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Active => "active",
            TimerStatus::Resolved => "resolved",
        }
    }
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Safe => "safe",
            Resolution::Alert => "alert",
        }
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TimerStatus::Active),
            "resolved" => Ok(TimerStatus::Resolved),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(Resolution::Safe),
            "alert" => Ok(Resolution::Alert),
            other => Err(format!("unknown resolution '{}'", other)),
        }
    }
}

/// Per-user check-in timer, one hash in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub status: TimerStatus,
    /// Deadline in milliseconds since the epoch
    pub expires_at: i64,
    /// Duration the user asked for
    pub minutes: u32,
    /// Set only once resolved
    pub resolution: Option<Resolution>,
    /// Set only once resolved, milliseconds since the epoch
    pub resolved_at: Option<i64>,
    /// Token of the delayed callback scheduled for this timer
    pub callback_id: Option<String>,
}

impl TimerRecord {
    /// Create an active timer that expires `minutes` after `now_ms`
    pub fn active(now_ms: i64, minutes: u32) -> Self {
        Self {
            status: TimerStatus::Active,
            expires_at: now_ms + i64::from(minutes) * 60_000,
            minutes,
            resolution: None,
            resolved_at: None,
            callback_id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TimerStatus::Active
    }

    /// Whether an active timer has reached its deadline
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.is_active() && self.expires_at <= now_ms
    }

    /// Fields written when the timer starts
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut out = vec![
            (fields::STATUS.to_string(), self.status.to_string()),
            (fields::EXPIRES_AT.to_string(), self.expires_at.to_string()),
            (fields::MINUTES.to_string(), self.minutes.to_string()),
        ];
        if let Some(resolution) = self.resolution {
            out.push((fields::RESOLUTION.to_string(), resolution.to_string()));
        }
        if let Some(resolved_at) = self.resolved_at {
            out.push((fields::RESOLVED_AT.to_string(), resolved_at.to_string()));
        }
        if let Some(callback_id) = &self.callback_id {
            out.push((fields::CALLBACK_ID.to_string(), callback_id.clone()));
        }
        out
    }

    /// Fields merged into the hash when the timer resolves
    pub fn resolved_fields(resolution: Resolution, now_ms: i64) -> Vec<(String, String)> {
        vec![
            (fields::STATUS.to_string(), TimerStatus::Resolved.to_string()),
            (fields::RESOLUTION.to_string(), resolution.to_string()),
            (fields::RESOLVED_AT.to_string(), now_ms.to_string()),
        ]
    }

    /// Decode a stored hash, failing with a reason on missing or malformed fields
    pub fn from_fields(map: &HashMap<String, String>) -> Result<Self, String> {
        let status = required(map, fields::STATUS)?.parse::<TimerStatus>()?;
        let expires_at = required(map, fields::EXPIRES_AT)?
            .parse::<i64>()
            .map_err(|e| format!("bad {}: {}", fields::EXPIRES_AT, e))?;
        let minutes = required(map, fields::MINUTES)?
            .parse::<u32>()
            .map_err(|e| format!("bad {}: {}", fields::MINUTES, e))?;
        let resolution = map
            .get(fields::RESOLUTION)
            .map(|v| v.parse::<Resolution>())
            .transpose()?;
        let resolved_at = map
            .get(fields::RESOLVED_AT)
            .map(|v| v.parse::<i64>().map_err(|e| format!("bad {}: {}", fields::RESOLVED_AT, e)))
            .transpose()?;
        let callback_id = map.get(fields::CALLBACK_ID).cloned();

        Ok(Self {
            status,
            expires_at,
            minutes,
            resolution,
            resolved_at,
            callback_id,
        })
    }
}

fn required<'a>(map: &'a HashMap<String, String>, field: &str) -> Result<&'a str, String> {
    map.get(field)
        .map(String::as_str)
        .ok_or_else(|| format!("missing field '{}'", field))
}
