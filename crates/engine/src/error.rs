// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Configuration errors. Raised before any scheduling work begins and never
/// retried; running out of runways or pilots is reported in result data instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Unknown algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("At least 1 runway is required, got {0}")]
    InvalidRunwayCount(u32),
    #[error("Flight '{flight_id}' has no occupancy time -- it must be positive")]
    InvalidOccupancy { flight_id: String },
    #[error("Flight '{flight_id}' has priority {priority} -- it must be between 1 and 10")]
    InvalidPriority { flight_id: String, priority: u8 },
    #[error("Duplicate flight ID '{0}'")]
    DuplicateFlight(String),
    #[error("Pilot '{pilot_id}' max daily hours must be positive, got {hours}")]
    InvalidDutyHours { pilot_id: String, hours: f64 },
    #[error("Pilot '{pilot_id}' min rest hours must be positive, got {hours}")]
    InvalidRestHours { pilot_id: String, hours: f64 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Cannot assign flight '{flight_id}' to pilot '{pilot_id}': would violate duty or rest requirements")]
    DutyViolation { pilot_id: String, flight_id: String },
}
