//! Chat command parsing and dispatch

use std::time::Duration;

use tracing::info;

use crate::{
    error::Result,
    services::alert::REASON_MANUAL,
    state::{AppState, Resolution},
};

pub const DEFAULT_MINUTES: u32 = 15;
pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 240;

pub const REPLY_USAGE: &str = "Please send Start showing 15 for a 15 minute timer. Range 1 to 240.";
pub const REPLY_SAFE: &str = "Glad you are safe. Timer cleared.";
pub const REPLY_NO_TIMER: &str = "No active timer found.";
pub const REPLY_ALERT_SENT: &str = "Alert sent to your contact.";
pub const REPLY_HELP: &str = "Commands: Start showing 15   I am safe   Help";

/// A command recognised in an incoming message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start a timer; `None` when the minute count was invalid
    Start(Option<u32>),
    Safe,
    Help,
    Unknown,
}

impl Command {
    /// Parse message text; matching ignores case and surrounding whitespace
    pub fn parse(text: &str) -> Self {
        let text = text.trim().to_lowercase();

        if text.starts_with("start showing") {
            let minutes = match text.split_whitespace().nth(2) {
                None => Some(DEFAULT_MINUTES),
                Some(token) => parse_minutes(token),
            };
            Command::Start(minutes)
        } else if text == "i am safe" {
            Command::Safe
        } else if text == "help" {
            Command::Help
        } else {
            Command::Unknown
        }
    }
}

/// Leading integer of `token` if it lies in the allowed range.
///
/// Trailing characters after the digits are ignored, so `20min` reads as 20.
fn parse_minutes(token: &str) -> Option<u32> {
    let (negative, rest) = match token.as_bytes().first().copied() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };

    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let digits = &rest[..digits_end];
    if digits.is_empty() || negative {
        return None;
    }

    // too many digits to fit is out of range anyway
    let minutes = digits.parse::<u32>().ok()?;
    (MIN_MINUTES..=MAX_MINUTES).contains(&minutes).then_some(minutes)
}

fn started_reply(minutes: u32) -> String {
    format!(
        "Timer started for {} minutes. Reply I am safe to cancel. Send Help to alert your contact now.",
        minutes
    )
}

/// Act on one message from `from` and send the reply.
///
/// `host` is the Host header of the request; only starting a timer needs it,
/// to build the expiry callback URL when no public URL is configured.
pub async fn handle_message(state: &AppState, from: &str, text: &str, host: Option<&str>) -> Result<()> {
    let command = Command::parse(text);
    info!("Message from {}: {:?}", from, command);

    let reply = match command {
        Command::Start(None) => REPLY_USAGE.to_string(),
        Command::Start(Some(minutes)) => {
            let callback_url = state.callback_url(host)?;
            state.timers.start_timer(from, minutes).await?;
            let token = state
                .scheduler
                .schedule(&callback_url, Duration::from_secs(u64::from(minutes) * 60))
                .await?;
            state.timers.attach_callback(from, &token).await?;
            started_reply(minutes)
        }
        Command::Safe => {
            if state.timers.resolve_timer(from, Resolution::Safe).await? {
                REPLY_SAFE.to_string()
            } else {
                REPLY_NO_TIMER.to_string()
            }
        }
        Command::Help => {
            state.timers.alerter().alert_contact(from, REASON_MANUAL).await?;
            state.timers.resolve_timer(from, Resolution::Alert).await?;
            REPLY_ALERT_SENT.to_string()
        }
        Command::Unknown => REPLY_HELP.to_string(),
    };

    state.messenger.send_text(from, &reply).await
}
