// libs/appointment-cell/src/services/calendar.rs
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use shared_config::SchedulingConfig;

/// Generates the bookable time slots for a date from the clinic's weekly hours.
#[derive(Debug, Clone)]
pub struct BusinessHoursCalendar {
    config: SchedulingConfig,
    slot_minutes: u32,
}

impl BusinessHoursCalendar {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self {
            config: config.clone(),
            slot_minutes: config.slot_minutes.max(1),
        }
    }

    /// Ordered slots for `date`. Empty when no date is given or the clinic is
    /// closed that day.
    pub fn slots_for(&self, date: Option<NaiveDate>) -> Vec<NaiveTime> {
        let Some(date) = date else {
            return Vec::new();
        };
        let Some(hours) = self.config.hours_for(date.weekday()) else {
            return Vec::new();
        };

        let open = minute_of_day(hours.open.start);
        let close = minute_of_day(hours.open.end);

        (open..close)
            .step_by(self.slot_minutes as usize)
            .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
            .filter(|slot| !hours.breaks.is_some_and(|lunch| lunch.contains(*slot)))
            .collect()
    }

    /// Whether `time` is one of the generated slots for `date`. Seconds must be zero.
    pub fn is_on_grid(&self, date: NaiveDate, time: NaiveTime) -> bool {
        time.second() == 0
            && time.nanosecond() == 0
            && self.slots_for(Some(date)).binary_search(&time).is_ok()
    }
}

pub(crate) fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
