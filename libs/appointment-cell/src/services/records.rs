// libs/appointment-cell/src/services/records.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// The medical record a completed appointment must leave behind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecordType {
    #[serde(rename = "Health Record", alias = "health_record")]
    HealthRecord,
    #[serde(alias = "vaccination")]
    Vaccination,
    #[serde(alias = "deworming")]
    Deworming,
    #[default]
    #[serde(rename = "-", alias = "none")]
    None,
}

impl RecordType {
    /// Maps a catalog service name to its required record. Matching ignores
    /// case and surrounding whitespace; unknown services require nothing.
    pub fn for_service(service_name: &str) -> Self {
        match service_name.trim().to_lowercase().as_str() {
            "anti-parasitic" => RecordType::Deworming,
            "immunization" => RecordType::Vaccination,
            "check-up and consultation"
            | "complete blood count testing"
            | "operation (castration)"
            | "operation (eye and ear)" => RecordType::HealthRecord,
            _ => RecordType::None,
        }
    }

    pub fn is_required(&self) -> bool {
        *self != RecordType::None
    }

    /// Only these records carry a next-due date that schedules a follow-up.
    pub fn schedules_follow_up(&self) -> bool {
        matches!(self, RecordType::Vaccination | RecordType::Deworming)
    }

    /// Backing table for the record-existence lookup.
    pub fn table(&self) -> Option<&'static str> {
        match self {
            RecordType::HealthRecord => Some("health_records"),
            RecordType::Vaccination => Some("vaccinations"),
            RecordType::Deworming => Some("dewormings"),
            RecordType::None => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordType::HealthRecord => "Health Record",
            RecordType::Vaccination => "Vaccination",
            RecordType::Deworming => "Deworming",
            RecordType::None => "-",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
