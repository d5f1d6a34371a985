use std::env;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Offset, Utc, Weekday};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub notification_webhook_url: Option<String>,
    pub port: u16,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            port: parse_or_default("PORT", 3000),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

/// A half-open `[start, end)` window of clinic-local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time < self.end
    }

    /// Parses `HH:MM-HH:MM`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (start, end) = raw.trim().split_once('-')?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
        Self::new(start, end)
    }
}

/// Operating hours for a single day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyHours {
    pub open: TimeWindow,
    pub breaks: Option<TimeWindow>,
}

/// The clinic's scheduling policy. Every pure scheduling component is built
/// from this struct so tests can construct it without touching the environment.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Indexed by `Weekday::num_days_from_sunday()`. `None` means closed.
    pub weekly_hours: [Option<DailyHours>; 7],
    pub slot_minutes: u32,
    pub conflict_buffer_minutes: u32,
    pub min_separation_minutes: u32,
    pub utc_offset: FixedOffset,
    pub timezone_name: String,
    pub io_timeout: Duration,
    pub follow_up_time: NaiveTime,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        let sunday = DailyHours {
            open: window(8, 12),
            breaks: None,
        };
        let weekday = DailyHours {
            open: window(8, 17),
            breaks: Some(window(12, 13)),
        };

        Self {
            weekly_hours: [
                Some(sunday),
                Some(weekday),
                Some(weekday),
                Some(weekday),
                Some(weekday),
                Some(weekday),
                Some(weekday),
            ],
            slot_minutes: 15,
            conflict_buffer_minutes: 15,
            min_separation_minutes: 0,
            utc_offset: manila_offset(),
            timezone_name: "Asia/Manila".to_string(),
            io_timeout: Duration::from_secs(10),
            follow_up_time: hour(9),
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let sunday = env_window("CLINIC_SUNDAY_HOURS", window(8, 12));
        let weekday = env_window("CLINIC_WEEKDAY_HOURS", window(8, 17));
        let lunch = match env::var("CLINIC_LUNCH_BREAK") {
            Ok(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            Ok(raw) => TimeWindow::parse(&raw).or_else(|| {
                warn!("CLINIC_LUNCH_BREAK '{}' is invalid, using 12:00-13:00", raw);
                Some(window(12, 13))
            }),
            Err(_) => Some(window(12, 13)),
        };

        config.weekly_hours[0] = Some(DailyHours { open: sunday, breaks: None });
        for day in 1..7 {
            config.weekly_hours[day] = Some(DailyHours { open: weekday, breaks: lunch });
        }

        config.slot_minutes = parse_or_default("CLINIC_SLOT_MINUTES", 15).max(1);
        config.conflict_buffer_minutes = parse_or_default("CLINIC_CONFLICT_BUFFER_MINUTES", 15);
        config.min_separation_minutes = parse_or_default("CLINIC_MIN_SEPARATION_MINUTES", 0);
        config.io_timeout = Duration::from_secs(parse_or_default("CLINIC_IO_TIMEOUT_SECS", 10));

        if let Ok(raw) = env::var("CLINIC_UTC_OFFSET") {
            match parse_offset(&raw) {
                Some(offset) => config.utc_offset = offset,
                None => warn!("CLINIC_UTC_OFFSET '{}' is invalid, using +08:00", raw),
            }
        }
        if let Ok(name) = env::var("CLINIC_TIMEZONE") {
            config.timezone_name = name;
        }
        if let Ok(raw) = env::var("CLINIC_FOLLOW_UP_TIME") {
            match NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
                Ok(time) => config.follow_up_time = time,
                Err(_) => warn!("CLINIC_FOLLOW_UP_TIME '{}' is invalid, using 09:00", raw),
            }
        }

        config
    }

    pub fn hours_for(&self, weekday: Weekday) -> Option<&DailyHours> {
        self.weekly_hours[weekday.num_days_from_sunday() as usize].as_ref()
    }
}

/// Parses `+HH:MM` / `-HH:MM`.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => (1, raw),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn env_window(key: &str, default: TimeWindow) -> TimeWindow {
    match env::var(key) {
        Ok(raw) => TimeWindow::parse(&raw).unwrap_or_else(|| {
            warn!("{} '{}' is invalid, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn parse_or_default<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} '{}' is invalid, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn window(start: u32, end: u32) -> TimeWindow {
    TimeWindow { start: hour(start), end: hour(end) }
}

fn manila_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix())
}
