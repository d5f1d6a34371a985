// libs/appointment-cell/src/services/availability.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use shared_config::SchedulingConfig;

use crate::models::SlotAvailability;
use crate::services::calendar::minute_of_day;

/// Splits a day's slots into booked and free against the times already taken.
#[derive(Debug, Clone)]
pub struct SlotAvailabilityResolver {
    min_separation_minutes: u32,
}

impl SlotAvailabilityResolver {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self::with_min_separation(config.min_separation_minutes)
    }

    /// With `0` a slot is only booked by an exact hour/minute match.
    pub fn with_min_separation(min_separation_minutes: u32) -> Self {
        Self { min_separation_minutes }
    }

    /// Annotates every slot of `date`. Booked slots stay in the output so the
    /// UI can render them disabled. `now` is the clinic-local current time;
    /// slots at or before it are past and never available.
    pub fn resolve(
        &self,
        date: NaiveDate,
        slots: &[NaiveTime],
        booked: &[NaiveTime],
        now: NaiveDateTime,
    ) -> Vec<SlotAvailability> {
        slots
            .iter()
            .map(|slot| {
                let is_booked = self.is_booked(*slot, booked);
                let is_past = date.and_time(*slot) <= now;
                SlotAvailability {
                    time: *slot,
                    is_booked,
                    is_past,
                    available: !is_booked && !is_past,
                }
            })
            .collect()
    }

    /// Booked-time values carry no meaningful date; only hour and minute count.
    pub fn is_booked(&self, slot: NaiveTime, booked: &[NaiveTime]) -> bool {
        let slot_minute = minute_of_day(slot);
        booked.iter().any(|taken| {
            let taken_minute = minute_of_day(*taken);
            if self.min_separation_minutes == 0 {
                taken_minute == slot_minute
            } else {
                slot_minute.abs_diff(taken_minute) < self.min_separation_minutes
            }
        })
    }
}
