use crate::config::{Config, parse_hhmm};
use anyhow::{Context, Result};
use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, Local, LocalResult, NaiveTime, TimeZone,
    Weekday,
};
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{error, info};

const RESCHEDULE_POLL_SECONDS: u64 = 30;

const END_OF_WEEK_DAY: Weekday = Weekday::Fri;
const END_OF_WEEK_HOUR: u32 = 15;
const END_OF_WEEK_MINUTE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Daily,
    EndOfWeek,
}

impl ReminderKind {
    pub fn title(self) -> &'static str {
        match self {
            ReminderKind::Daily => "UpdateMe Reminder",
            ReminderKind::EndOfWeek => "Weekly Update Reminder",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ReminderKind::Daily => "Time to update your work entries for today!",
            ReminderKind::EndOfWeek => "Time to prepare your weekly status update!",
        }
    }
}

/// Snapshot of the reminder-related config. The scheduler re-reads it every
/// poll tick, so edits take effect without a restart.
#[derive(Debug, Clone)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub time: String,
    pub end_of_week: bool,
}

impl From<&Config> for ReminderSettings {
    fn from(config: &Config) -> Self {
        Self {
            enabled: config.reminder_enabled,
            time: config.reminder_time.clone(),
            end_of_week: config.end_of_week_reminder,
        }
    }
}

pub async fn run_reminder_scheduler<S, F, Fut>(
    mut settings_provider: S,
    mut notify: F,
) -> Result<()>
where
    S: FnMut() -> Result<ReminderSettings>,
    F: FnMut(ReminderKind) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut last_logged = String::new();

    loop {
        let settings = match settings_provider() {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, "failed to load reminder settings");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        let upcoming = match next_reminder(Local::now(), &settings) {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, time = %settings.time, "invalid reminder time");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        let Some((fire_at, kind)) = upcoming else {
            sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
            continue;
        };

        let described = format!("{kind:?} at {}", fire_at.format("%Y-%m-%d %H:%M"));
        if described != last_logged {
            info!(next = %described, "next reminder scheduled");
            last_logged = described;
        }

        let delay = (fire_at - Local::now()).to_std().unwrap_or(Duration::ZERO);
        if delay > Duration::from_secs(RESCHEDULE_POLL_SECONDS) {
            sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
            continue;
        }

        sleep(delay).await;

        if let Err(error) = notify(kind).await {
            error!(error = %error, kind = ?kind, "reminder delivery failed");
        }

        sleep(Duration::from_secs(1)).await;
    }
}

/// The next reminder due after `now`, if any. The daily reminder and the
/// end-of-week reminder are toggled independently; the earlier one wins,
/// with the daily reminder taking a dead heat.
pub fn next_reminder(
    now: DateTime<Local>,
    settings: &ReminderSettings,
) -> Result<Option<(DateTime<Local>, ReminderKind)>> {
    let daily_time = parse_hhmm(&settings.time)?;
    let mut candidates: Vec<(DateTime<Local>, ReminderKind)> = Vec::new();

    if settings.enabled {
        candidates.push((next_daily(now, daily_time)?, ReminderKind::Daily));
    }
    if settings.end_of_week {
        candidates.push((next_end_of_week(now)?, ReminderKind::EndOfWeek));
    }

    Ok(candidates.into_iter().min_by_key(|(fire_at, _)| *fire_at))
}

fn next_daily(now: DateTime<Local>, target_time: NaiveTime) -> Result<DateTime<Local>> {
    let today = now.date_naive();

    let candidate_today = match Local.from_local_datetime(&today.and_time(target_time)) {
        LocalResult::Single(datetime) => datetime,
        _ => {
            let fallback_day = today + ChronoDuration::days(1);
            Local
                .from_local_datetime(&fallback_day.and_time(target_time))
                .single()
                .context("Failed to convert reminder time")?
        }
    };

    if candidate_today > now {
        return Ok(candidate_today);
    }

    let tomorrow = today + ChronoDuration::days(1);
    Local
        .from_local_datetime(&tomorrow.and_time(target_time))
        .single()
        .context("Failed to convert next reminder time")
}

fn next_end_of_week(now: DateTime<Local>) -> Result<DateTime<Local>> {
    let target_time = NaiveTime::from_hms_opt(END_OF_WEEK_HOUR, END_OF_WEEK_MINUTE, 0)
        .context("Failed to build end-of-week time")?;

    let today = now.date_naive();
    let days_ahead = (END_OF_WEEK_DAY.num_days_from_monday() + 7
        - now.weekday().num_days_from_monday())
        % 7;
    let friday = today + ChronoDuration::days(i64::from(days_ahead));

    let candidate = Local
        .from_local_datetime(&friday.and_time(target_time))
        .single()
        .context("Failed to convert end-of-week time")?;

    if candidate > now {
        return Ok(candidate);
    }

    Local
        .from_local_datetime(&(friday + ChronoDuration::days(7)).and_time(target_time))
        .single()
        .context("Failed to convert next end-of-week time")
}
