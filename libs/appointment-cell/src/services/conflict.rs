// libs/appointment-cell/src/services/conflict.rs
use tracing::{debug, warn};

use shared_config::SchedulingConfig;

use crate::models::Appointment;

/// Flags appointments in one listing batch that sit too close together.
/// Advisory only: nothing here blocks a booking or a transition.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    buffer_minutes: i64,
}

impl ConflictDetector {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self::with_buffer(config.conflict_buffer_minutes)
    }

    pub fn with_buffer(buffer_minutes: u32) -> Self {
        Self {
            buffer_minutes: i64::from(buffer_minutes),
        }
    }

    /// One flag per appointment, in batch order. Pairwise over the batch,
    /// which is page-sized.
    pub fn flag_conflicts(&self, batch: &[Appointment]) -> Vec<bool> {
        debug!("Checking {} appointments for conflicts", batch.len());

        let mut flags = vec![false; batch.len()];
        for (i, first) in batch.iter().enumerate() {
            for (j, second) in batch.iter().enumerate().skip(i + 1) {
                if self.overlaps(first, second) {
                    flags[i] = true;
                    flags[j] = true;
                }
            }
        }

        let conflicted = flags.iter().filter(|flag| **flag).count();
        if conflicted > 0 {
            warn!("Conflict detected - {} appointments within {} minutes of another",
                  conflicted, self.buffer_minutes);
        }

        flags
    }

    /// Same calendar day and strictly less than the buffer apart.
    pub fn overlaps(&self, first: &Appointment, second: &Appointment) -> bool {
        if first.date != second.date {
            return false;
        }
        let gap = (first.local_instant() - second.local_instant()).num_minutes().abs();
        gap < self.buffer_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    fn at(date: NaiveDate, h: u32, m: u32) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            date,
            time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            status: AppointmentStatus::Scheduled,
            notes: None,
            service: None,
            created_at: None,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn close_pair_is_flagged_and_distant_one_is_not() {
        let batch = vec![at(monday(), 10, 0), at(monday(), 10, 10), at(monday(), 11, 0)];
        let flags = ConflictDetector::with_buffer(15).flag_conflicts(&batch);
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn exactly_one_buffer_apart_is_fine() {
        let batch = vec![at(monday(), 10, 0), at(monday(), 10, 15)];
        assert_eq!(ConflictDetector::with_buffer(15).flag_conflicts(&batch), vec![false, false]);

        let batch = vec![at(monday(), 10, 0), at(monday(), 10, 14)];
        assert_eq!(ConflictDetector::with_buffer(15).flag_conflicts(&batch), vec![true, true]);
    }

    #[test]
    fn different_days_never_conflict() {
        let tuesday = monday().succ_opt().unwrap();
        let batch = vec![at(monday(), 10, 0), at(tuesday, 10, 0)];
        assert_eq!(ConflictDetector::with_buffer(15).flag_conflicts(&batch), vec![false, false]);
    }

    #[test]
    fn identical_slot_double_booking_is_flagged() {
        let batch = vec![at(monday(), 9, 0), at(monday(), 9, 0), at(monday(), 16, 45)];
        assert_eq!(ConflictDetector::with_buffer(15).flag_conflicts(&batch), vec![true, true, false]);
    }

    #[test]
    fn seconds_in_stored_times_are_ignored() {
        let mut late = at(monday(), 10, 14);
        late.time = NaiveTime::from_hms_opt(10, 15, 59).unwrap();
        let batch = vec![at(monday(), 10, 0), late];
        assert_eq!(ConflictDetector::with_buffer(15).flag_conflicts(&batch), vec![false, false]);
    }

    #[test]
    fn empty_and_single_batches() {
        let detector = ConflictDetector::with_buffer(15);
        assert!(detector.flag_conflicts(&[]).is_empty());
        assert_eq!(detector.flag_conflicts(&[at(monday(), 8, 0)]), vec![false]);
    }
}
