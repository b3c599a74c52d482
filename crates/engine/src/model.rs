use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::DutyLimits;
use crate::error::ScheduleError;

// ---------------------------------------------------------------------------
// Datetime wire format
// ---------------------------------------------------------------------------

/// ISO 8601 helpers shared by every timestamp on the wire.
///
/// Parsing accepts the common variants with or without seconds, a space
/// instead of `T`, or a bare date. A trailing `Z` or `+HH:MM`/`-HH:MM` offset is
/// stripped: all times are treated as local wall-clock times of one airport.
pub mod datetime {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim().trim_end_matches('Z');
        let s = match s.rfind('+') {
            Some(pos) if pos > 10 => &s[..pos],
            _ => s,
        };
        // -HH:MM offsets sit right after the seconds field
        let s = if s.len() > 19 && s.as_bytes()[19] == b'-' {
            &s[..19]
        } else {
            s
        };
        // Fractional seconds are dropped
        let s = match s.find('.') {
            Some(pos) if pos > 10 => &s[..pos],
            _ => s,
        };

        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt);
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    }

    pub fn format(dt: NaiveDateTime) -> String {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid datetime '{}'", raw)))
    }

    /// Same format for optional timestamps (`null` when absent).
    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_str(&super::format(*dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid datetime '{}'", raw))
                }),
                None => Ok(None),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Algorithm selectors
// ---------------------------------------------------------------------------

/// Graph-coloring heuristic used by the unconstrained runway colorer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColoringAlgorithm {
    /// Flights in start-time order, smallest free color.
    Greedy,
    /// Flights in descending conflict-degree order, smallest free color.
    WelshPowell,
    /// Highest saturation first, ties by degree then input order.
    Dsatur,
}

/// Processing-order policy of the capacity-constrained runway scheduler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PriorityAlgorithm {
    PriorityBased,
    PassengerFirst,
    DistanceFirst,
    Hybrid,
}

/// How one pilot is picked among those eligible for a flight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PilotStrategy {
    /// Fewest hours today, then fewest assignments.
    LeastBusy,
    /// Most hours today, then most assignments.
    MostAvailable,
    /// Fewest assignments, hours ignored.
    RoundRobin,
}

impl ColoringAlgorithm {
    pub const ALL: [ColoringAlgorithm; 3] = [
        ColoringAlgorithm::Greedy,
        ColoringAlgorithm::WelshPowell,
        ColoringAlgorithm::Dsatur,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColoringAlgorithm::Greedy => "greedy",
            ColoringAlgorithm::WelshPowell => "welsh_powell",
            ColoringAlgorithm::Dsatur => "dsatur",
        }
    }
}

impl PriorityAlgorithm {
    pub const ALL: [PriorityAlgorithm; 4] = [
        PriorityAlgorithm::PriorityBased,
        PriorityAlgorithm::PassengerFirst,
        PriorityAlgorithm::DistanceFirst,
        PriorityAlgorithm::Hybrid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PriorityAlgorithm::PriorityBased => "priority_based",
            PriorityAlgorithm::PassengerFirst => "passenger_first",
            PriorityAlgorithm::DistanceFirst => "distance_first",
            PriorityAlgorithm::Hybrid => "hybrid",
        }
    }
}

impl PilotStrategy {
    pub const ALL: [PilotStrategy; 3] = [
        PilotStrategy::LeastBusy,
        PilotStrategy::MostAvailable,
        PilotStrategy::RoundRobin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PilotStrategy::LeastBusy => "least_busy",
            PilotStrategy::MostAvailable => "most_available",
            PilotStrategy::RoundRobin => "round_robin",
        }
    }
}

macro_rules! name_parsing {
    ($ty:ty) => {
        impl FromStr for $ty {
            type Err = ScheduleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|a| a.name() == wanted)
                    .ok_or_else(|| ScheduleError::UnknownAlgorithm(s.to_string()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

name_parsing!(ColoringAlgorithm);
name_parsing!(PriorityAlgorithm);
name_parsing!(PilotStrategy);

// ---------------------------------------------------------------------------
// Flight
// ---------------------------------------------------------------------------

fn default_occupancy_mins() -> u32 {
    15
}

fn default_priority() -> u8 {
    5
}

/// A flight occupying a runway over `[start, start + occupancy)`.
///
/// Two flights are equal when their identifiers are equal; schedulers order
/// them by `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    /// Start of the runway occupancy window.
    #[serde(with = "datetime")]
    pub start: NaiveDateTime,
    /// Minutes needed to land and clear the runway. Must be > 0.
    #[serde(default = "default_occupancy_mins")]
    pub occupancy_mins: u32,
    /// 1 (most important) to 10.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub passenger_count: u32,
    #[serde(default)]
    pub distance_km: f64,
    /// Block time in hours; used as duty time by the multi-day scheduler when positive.
    #[serde(default)]
    pub flight_duration_hours: f64,
    /// Operating day, 0-based.
    #[serde(default)]
    pub day_index: u32,
    /// Minutes the constrained scheduler pushed `start` back.
    #[serde(default)]
    pub delay_mins: u32,
    /// Assigned runway (1-based) once scheduled.
    #[serde(default)]
    pub runway_id: Option<u32>,
}

impl Flight {
    pub fn new(
        id: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        start: NaiveDateTime,
        occupancy_mins: u32,
        priority: u8,
    ) -> Result<Self, ScheduleError> {
        let flight = Flight {
            id: id.into(),
            origin: origin.into(),
            destination: destination.into(),
            start,
            occupancy_mins,
            priority,
            passenger_count: 0,
            distance_km: 0.0,
            flight_duration_hours: 0.0,
            day_index: 0,
            delay_mins: 0,
            runway_id: None,
        };
        flight.check()?;
        Ok(flight)
    }

    pub fn with_passengers(mut self, passenger_count: u32) -> Self {
        self.passenger_count = passenger_count;
        self
    }

    pub fn with_distance(mut self, distance_km: f64) -> Self {
        self.distance_km = distance_km;
        self
    }

    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        self.flight_duration_hours = hours;
        self
    }

    pub fn with_day(mut self, day_index: u32) -> Self {
        self.day_index = day_index;
        self
    }

    /// Rejects records that could not have come from `Flight::new`.
    pub fn check(&self) -> Result<(), ScheduleError> {
        if self.occupancy_mins == 0 {
            return Err(ScheduleError::InvalidOccupancy {
                flight_id: self.id.clone(),
            });
        }
        if !(1..=10).contains(&self.priority) {
            return Err(ScheduleError::InvalidPriority {
                flight_id: self.id.clone(),
                priority: self.priority,
            });
        }
        Ok(())
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.occupancy_mins))
    }

    /// Half-open interval overlap: touching windows do not conflict.
    pub fn overlaps(&self, other: &Flight) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    pub fn overlap_minutes(&self, other: &Flight) -> i64 {
        if !self.overlaps(other) {
            return 0;
        }
        let from = self.start.max(other.start);
        let to = self.end().min(other.end());
        (to - from).num_minutes()
    }

    /// Duty time charged to a pilot: occupancy plus the ground/prep buffer.
    pub fn duty_hours(&self, prep_buffer_mins: u32) -> f64 {
        (f64::from(self.occupancy_mins) + f64::from(prep_buffer_mins)) / 60.0
    }
}

impl PartialEq for Flight {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Flight {}

impl std::hash::Hash for Flight {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

/// Slack for summed f64 duty and rest hours.
pub const HOURS_EPSILON: f64 = 1e-9;

fn default_max_daily_hours() -> f64 {
    DutyLimits::default().max_daily_hours
}

fn default_min_rest_hours() -> f64 {
    DutyLimits::default().min_rest_hours
}

/// A pilot with duty limits and the duty state of the current scheduling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pilot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_max_daily_hours")]
    pub max_daily_hours: f64,
    #[serde(default = "default_min_rest_hours")]
    pub min_rest_hours: f64,
    #[serde(default)]
    pub hours_flown_today: f64,
    #[serde(default, with = "datetime::option")]
    pub last_flight_end: Option<NaiveDateTime>,
    #[serde(default)]
    pub assigned_flight_ids: Vec<String>,
}

impl Pilot {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let limits = DutyLimits::default();
        Pilot {
            id: id.into(),
            name: name.into(),
            max_daily_hours: limits.max_daily_hours,
            min_rest_hours: limits.min_rest_hours,
            hours_flown_today: 0.0,
            last_flight_end: None,
            assigned_flight_ids: Vec::new(),
        }
    }

    pub fn with_limits(
        id: impl Into<String>,
        name: impl Into<String>,
        limits: DutyLimits,
    ) -> Result<Self, ScheduleError> {
        let mut pilot = Pilot::new(id, name);
        pilot.max_daily_hours = limits.max_daily_hours;
        pilot.min_rest_hours = limits.min_rest_hours;
        pilot.check_limits()?;
        Ok(pilot)
    }

    pub fn check_limits(&self) -> Result<(), ScheduleError> {
        if self.max_daily_hours.is_nan() || self.max_daily_hours <= 0.0 {
            return Err(ScheduleError::InvalidDutyHours {
                pilot_id: self.id.clone(),
                hours: self.max_daily_hours,
            });
        }
        if self.min_rest_hours.is_nan() || self.min_rest_hours <= 0.0 {
            return Err(ScheduleError::InvalidRestHours {
                pilot_id: self.id.clone(),
                hours: self.min_rest_hours,
            });
        }
        Ok(())
    }

    /// Hours between the end of the previous flight and `start`, if any.
    pub fn rest_before(&self, start: NaiveDateTime) -> Option<f64> {
        self.last_flight_end
            .map(|end| (start - end).num_seconds() as f64 / 3600.0)
    }

    pub fn can_fly(&self, start: NaiveDateTime, duration_hours: f64) -> bool {
        if self.hours_flown_today + duration_hours > self.max_daily_hours + HOURS_EPSILON {
            return false;
        }
        match self.rest_before(start) {
            Some(rest) => rest + HOURS_EPSILON >= self.min_rest_hours,
            None => true,
        }
    }

    pub fn assign(
        &mut self,
        flight_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        duration_hours: f64,
    ) -> Result<(), ScheduleError> {
        if !self.can_fly(start, duration_hours) {
            return Err(ScheduleError::DutyViolation {
                pilot_id: self.id.clone(),
                flight_id: flight_id.to_string(),
            });
        }
        self.assigned_flight_ids.push(flight_id.to_string());
        self.last_flight_end = Some(end);
        self.hours_flown_today += duration_hours;
        Ok(())
    }

    pub fn remaining_hours(&self) -> f64 {
        (self.max_daily_hours - self.hours_flown_today).max(0.0)
    }

    /// Earliest start satisfying the rest requirement; `None` means now.
    pub fn available_from(&self) -> Option<NaiveDateTime> {
        self.last_flight_end
            .map(|end| end + Duration::seconds((self.min_rest_hours * 3600.0).round() as i64))
    }

    /// Day boundary: duty hours and rest anchor are cleared, assignments kept.
    pub fn reset_day(&mut self) {
        self.hours_flown_today = 0.0;
        self.last_flight_end = None;
    }

    /// Start of a scheduling run.
    pub fn reset(&mut self) {
        self.reset_day();
        self.assigned_flight_ids.clear();
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// A completed pilot-to-flight allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub pilot_id: String,
    pub flight_id: String,
    #[serde(with = "datetime")]
    pub flight_start: NaiveDateTime,
    /// Start plus duty duration, not runway clearance.
    #[serde(with = "datetime")]
    pub flight_end: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_index: Option<u32>,
}

impl Assignment {
    pub fn duration_hours(&self) -> f64 {
        (self.flight_end - self.flight_start).num_seconds() as f64 / 3600.0
    }
}

// ---------------------------------------------------------------------------
// Runway results
// ---------------------------------------------------------------------------

/// Output of the unconstrained colorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColoringResult {
    pub algorithm: ColoringAlgorithm,
    /// Input flights, in input order, with `runway_id` set.
    pub flights: Vec<Flight>,
    pub runway_count: u32,
    /// Runway id -> flights on it, ordered by start.
    pub runway_assignments: BTreeMap<u32, Vec<Flight>>,
    /// Number of conflict-graph edges separated onto different runways.
    pub conflicts_resolved: usize,
}

/// Output of the capacity-constrained scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstrainedSchedule {
    pub algorithm: PriorityAlgorithm,
    pub max_runways: u32,
    /// Copies of the input flights in processing order, with final times.
    pub flights: Vec<Flight>,
    /// Every runway `1..=max_runways`, possibly empty.
    pub runway_assignments: BTreeMap<u32, Vec<Flight>>,
    pub delayed_flights: Vec<Flight>,
    pub on_time_count: usize,
    pub total_delay_mins: u64,
    /// Mean over delayed flights only.
    pub avg_delay_mins: f64,
    pub on_time_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelayDistribution {
    pub min: u32,
    pub max: u32,
    pub avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConstrainedStatistics {
    pub total_flights: usize,
    pub on_time_flights: usize,
    pub delayed_flights: usize,
    pub on_time_percentage: f64,
    pub total_delay_mins: u64,
    pub avg_delay_mins: f64,
    pub max_delay_mins: u32,
    pub runways_used: u32,
    pub flights_per_runway: BTreeMap<u32, usize>,
    pub delay_distribution: Option<DelayDistribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmComparison {
    pub algorithm: PriorityAlgorithm,
    pub statistics: ConstrainedStatistics,
}

// ---------------------------------------------------------------------------
// Pilot results
// ---------------------------------------------------------------------------

/// Output of one single-day pilot scheduling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotSchedule {
    pub strategy: PilotStrategy,
    pub assignments: Vec<Assignment>,
    pub unassigned_flights: Vec<Flight>,
    /// Pilot id -> hours flown / max daily hours × 100, for pilots that flew.
    pub pilot_utilization: BTreeMap<String, f64>,
    pub total_pilots_used: usize,
    pub compliance_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatistics {
    pub total_pilots: usize,
    pub active_pilots: usize,
    pub avg_hours_per_pilot: f64,
    pub max_hours: f64,
    /// Over active pilots only.
    pub min_hours: f64,
    pub utilization_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPilotSchedule {
    pub day_index: u32,
    /// Calendar date of the day's first flight, `YYYY-MM-DD`.
    pub date: String,
    pub assignments: Vec<Assignment>,
    pub unassigned_flight_ids: Vec<String>,
    pub flights_scheduled: usize,
    pub pilots_active: usize,
    pub compliance_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiDaySchedule {
    pub strategy: PilotStrategy,
    /// One entry per day that has flights, in increasing day order.
    pub daily_schedules: Vec<DailyPilotSchedule>,
    pub all_assignments: Vec<Assignment>,
    pub unassigned_flights: Vec<Flight>,
    /// Pilot id -> day index -> duty hours.
    pub pilot_daily_hours: BTreeMap<String, BTreeMap<u32, f64>>,
    pub total_pilots_used: usize,
    pub overall_compliance_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PilotUtilization {
    pub total_hours: f64,
    pub days_worked: usize,
    pub avg_hours_per_day: f64,
    pub utilization_percentage: f64,
    pub max_day_hours: f64,
    pub min_day_hours: f64,
}
