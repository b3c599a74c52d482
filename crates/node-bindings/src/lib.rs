#![deny(clippy::all)]

use std::collections::BTreeMap;

use napi_derive::napi;
use runway_engine::model as engine;
use runway_engine::model::datetime;
use runway_engine::{allocator, coloring, multi_day, pilots, validator, ScheduleError};

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn to_napi(e: ScheduleError) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_time(raw: &str, what: &str) -> napi::Result<chrono::NaiveDateTime> {
    datetime::parse(raw)
        .ok_or_else(|| napi::Error::from_reason(format!("Invalid {} datetime '{}'", what, raw)))
}

fn parse_name<T: std::str::FromStr<Err = ScheduleError>>(raw: &str) -> napi::Result<T> {
    raw.parse::<T>().map_err(to_napi)
}

fn ids(flights: &[engine::Flight]) -> Vec<String> {
    flights.iter().map(|f| f.id.clone()).collect()
}

fn runway_groups(map: BTreeMap<u32, Vec<engine::Flight>>) -> Vec<RunwayGroup> {
    map.into_iter()
        .map(|(runway_id, flights)| RunwayGroup {
            runway_id,
            flight_ids: ids(&flights),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Mirror types: input side
// ---------------------------------------------------------------------------

/// A flight record. Timestamps are ISO 8601 strings.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct Flight {
    pub id: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub start: String,
    pub occupancy_mins: Option<u32>,
    pub priority: Option<u32>,
    pub passenger_count: Option<u32>,
    pub distance_km: Option<f64>,
    pub flight_duration_hours: Option<f64>,
    pub day_index: Option<u32>,
    pub delay_mins: Option<u32>,
    pub runway_id: Option<u32>,
}

impl TryFrom<Flight> for engine::Flight {
    type Error = napi::Error;

    fn try_from(v: Flight) -> napi::Result<Self> {
        let start = parse_time(&v.start, "start")?;
        let priority = u8::try_from(v.priority.unwrap_or(5)).map_err(|_| {
            napi::Error::from_reason(format!("Flight '{}' priority is out of range", v.id))
        })?;
        let mut flight = engine::Flight::new(
            v.id,
            v.origin.unwrap_or_default(),
            v.destination.unwrap_or_default(),
            start,
            v.occupancy_mins.unwrap_or(15),
            priority,
        )
        .map_err(to_napi)?
        .with_passengers(v.passenger_count.unwrap_or(0))
        .with_distance(v.distance_km.unwrap_or(0.0))
        .with_duration_hours(v.flight_duration_hours.unwrap_or(0.0))
        .with_day(v.day_index.unwrap_or(0));
        flight.delay_mins = v.delay_mins.unwrap_or(0);
        flight.runway_id = v.runway_id;
        Ok(flight)
    }
}

impl From<engine::Flight> for Flight {
    fn from(v: engine::Flight) -> Self {
        Flight {
            start: datetime::format(v.start),
            id: v.id,
            origin: Some(v.origin),
            destination: Some(v.destination),
            occupancy_mins: Some(v.occupancy_mins),
            priority: Some(u32::from(v.priority)),
            passenger_count: Some(v.passenger_count),
            distance_km: Some(v.distance_km),
            flight_duration_hours: Some(v.flight_duration_hours),
            day_index: Some(v.day_index),
            delay_mins: Some(v.delay_mins),
            runway_id: v.runway_id,
        }
    }
}

fn engine_flights(flights: Vec<Flight>) -> napi::Result<Vec<engine::Flight>> {
    flights.into_iter().map(engine::Flight::try_from).collect()
}

/// Records as given, for the validators to report on. Only an unparseable
/// time is an error here.
fn unchecked_flights(flights: Vec<Flight>) -> napi::Result<Vec<engine::Flight>> {
    flights
        .into_iter()
        .map(|v| {
            let start = parse_time(&v.start, "start")?;
            Ok(engine::Flight {
                id: v.id,
                origin: v.origin.unwrap_or_default(),
                destination: v.destination.unwrap_or_default(),
                start,
                occupancy_mins: v.occupancy_mins.unwrap_or(15),
                priority: u8::try_from(v.priority.unwrap_or(5)).unwrap_or(u8::MAX),
                passenger_count: v.passenger_count.unwrap_or(0),
                distance_km: v.distance_km.unwrap_or(0.0),
                flight_duration_hours: v.flight_duration_hours.unwrap_or(0.0),
                day_index: v.day_index.unwrap_or(0),
                delay_mins: v.delay_mins.unwrap_or(0),
                runway_id: v.runway_id,
            })
        })
        .collect()
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct Pilot {
    pub id: String,
    pub name: Option<String>,
    pub max_daily_hours: Option<f64>,
    pub min_rest_hours: Option<f64>,
}

impl From<Pilot> for engine::Pilot {
    fn from(v: Pilot) -> Self {
        let mut pilot = engine::Pilot::new(v.id, v.name.unwrap_or_default());
        if let Some(hours) = v.max_daily_hours {
            pilot.max_daily_hours = hours;
        }
        if let Some(hours) = v.min_rest_hours {
            pilot.min_rest_hours = hours;
        }
        pilot
    }
}

/// Optional overrides of the scheduler defaults.
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    pub delay_increment_mins: Option<u32>,
    pub max_delay_mins: Option<u32>,
    pub prep_buffer_mins: Option<u32>,
    pub max_daily_hours: Option<f64>,
    pub min_rest_hours: Option<f64>,
    pub carry_rest_across_days: Option<bool>,
}

impl From<SchedulerConfig> for runway_engine::SchedulerConfig {
    fn from(v: SchedulerConfig) -> Self {
        let mut config = runway_engine::SchedulerConfig::default();
        if let Some(x) = v.delay_increment_mins {
            config.delay_increment_mins = x;
        }
        if let Some(x) = v.max_delay_mins {
            config.max_delay_mins = x;
        }
        if let Some(x) = v.prep_buffer_mins {
            config.prep_buffer_mins = x;
        }
        if let Some(x) = v.max_daily_hours {
            config.duty.max_daily_hours = x;
        }
        if let Some(x) = v.min_rest_hours {
            config.duty.min_rest_hours = x;
        }
        if let Some(x) = v.carry_rest_across_days {
            config.carry_rest_across_days = x;
        }
        config
    }
}

fn engine_config(config: Option<SchedulerConfig>) -> runway_engine::SchedulerConfig {
    config.unwrap_or_default().into()
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct Assignment {
    pub pilot_id: String,
    pub flight_id: String,
    pub flight_start: String,
    pub flight_end: String,
    pub day_index: Option<u32>,
}

impl TryFrom<Assignment> for engine::Assignment {
    type Error = napi::Error;

    fn try_from(v: Assignment) -> napi::Result<Self> {
        Ok(engine::Assignment {
            flight_start: parse_time(&v.flight_start, "flightStart")?,
            flight_end: parse_time(&v.flight_end, "flightEnd")?,
            pilot_id: v.pilot_id,
            flight_id: v.flight_id,
            day_index: v.day_index,
        })
    }
}

impl From<engine::Assignment> for Assignment {
    fn from(v: engine::Assignment) -> Self {
        Assignment {
            pilot_id: v.pilot_id,
            flight_id: v.flight_id,
            flight_start: datetime::format(v.flight_start),
            flight_end: datetime::format(v.flight_end),
            day_index: v.day_index,
        }
    }
}

// ---------------------------------------------------------------------------
// Mirror types: result side
// ---------------------------------------------------------------------------

#[napi(object)]
#[derive(Debug, Clone)]
pub struct RunwayGroup {
    pub runway_id: u32,
    pub flight_ids: Vec<String>,
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct ColoringResult {
    pub algorithm: String,
    pub flights: Vec<Flight>,
    pub runway_count: u32,
    pub runways: Vec<RunwayGroup>,
    pub conflicts_resolved: u32,
}

impl From<engine::ColoringResult> for ColoringResult {
    fn from(v: engine::ColoringResult) -> Self {
        ColoringResult {
            algorithm: v.algorithm.to_string(),
            flights: v.flights.into_iter().map(Into::into).collect(),
            runway_count: v.runway_count,
            runways: runway_groups(v.runway_assignments),
            conflicts_resolved: v.conflicts_resolved as u32,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct ConstrainedSchedule {
    pub algorithm: String,
    pub max_runways: u32,
    pub flights: Vec<Flight>,
    pub runways: Vec<RunwayGroup>,
    pub delayed_flight_ids: Vec<String>,
    pub on_time_count: u32,
    pub total_delay_mins: i64,
    pub avg_delay_mins: f64,
    pub on_time_percentage: f64,
}

impl From<engine::ConstrainedSchedule> for ConstrainedSchedule {
    fn from(v: engine::ConstrainedSchedule) -> Self {
        ConstrainedSchedule {
            algorithm: v.algorithm.to_string(),
            max_runways: v.max_runways,
            delayed_flight_ids: ids(&v.delayed_flights),
            flights: v.flights.into_iter().map(Into::into).collect(),
            runways: runway_groups(v.runway_assignments),
            on_time_count: v.on_time_count as u32,
            total_delay_mins: v.total_delay_mins as i64,
            avg_delay_mins: v.avg_delay_mins,
            on_time_percentage: v.on_time_percentage,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    pub total_flights: u32,
    pub on_time_flights: u32,
    pub delayed_flights: u32,
    pub on_time_percentage: f64,
    pub total_delay_mins: i64,
    pub avg_delay_mins: f64,
    pub max_delay_mins: u32,
    pub runways_used: u32,
}

impl From<engine::AlgorithmComparison> for AlgorithmStatistics {
    fn from(v: engine::AlgorithmComparison) -> Self {
        let s = v.statistics;
        AlgorithmStatistics {
            algorithm: v.algorithm.to_string(),
            total_flights: s.total_flights as u32,
            on_time_flights: s.on_time_flights as u32,
            delayed_flights: s.delayed_flights as u32,
            on_time_percentage: s.on_time_percentage,
            total_delay_mins: s.total_delay_mins as i64,
            avg_delay_mins: s.avg_delay_mins,
            max_delay_mins: s.max_delay_mins,
            runways_used: s.runways_used,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct PilotLoad {
    pub pilot_id: String,
    pub utilization_percentage: f64,
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct PilotSchedule {
    pub strategy: String,
    pub assignments: Vec<Assignment>,
    pub unassigned_flight_ids: Vec<String>,
    pub pilot_utilization: Vec<PilotLoad>,
    pub total_pilots_used: u32,
    pub compliance_rate: f64,
}

impl From<engine::PilotSchedule> for PilotSchedule {
    fn from(v: engine::PilotSchedule) -> Self {
        PilotSchedule {
            strategy: v.strategy.to_string(),
            assignments: v.assignments.into_iter().map(Into::into).collect(),
            unassigned_flight_ids: ids(&v.unassigned_flights),
            pilot_utilization: v
                .pilot_utilization
                .into_iter()
                .map(|(pilot_id, utilization_percentage)| PilotLoad {
                    pilot_id,
                    utilization_percentage,
                })
                .collect(),
            total_pilots_used: v.total_pilots_used as u32,
            compliance_rate: v.compliance_rate,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct DailySchedule {
    pub day_index: u32,
    pub date: String,
    pub assignments: Vec<Assignment>,
    pub unassigned_flight_ids: Vec<String>,
    pub flights_scheduled: u32,
    pub pilots_active: u32,
    pub compliance_rate: f64,
}

impl From<engine::DailyPilotSchedule> for DailySchedule {
    fn from(v: engine::DailyPilotSchedule) -> Self {
        DailySchedule {
            day_index: v.day_index,
            date: v.date,
            assignments: v.assignments.into_iter().map(Into::into).collect(),
            unassigned_flight_ids: v.unassigned_flight_ids,
            flights_scheduled: v.flights_scheduled as u32,
            pilots_active: v.pilots_active as u32,
            compliance_rate: v.compliance_rate,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct MultiDaySchedule {
    pub strategy: String,
    pub daily_schedules: Vec<DailySchedule>,
    pub all_assignments: Vec<Assignment>,
    pub unassigned_flight_ids: Vec<String>,
    pub total_pilots_used: u32,
    pub overall_compliance_rate: f64,
}

impl From<engine::MultiDaySchedule> for MultiDaySchedule {
    fn from(v: engine::MultiDaySchedule) -> Self {
        MultiDaySchedule {
            strategy: v.strategy.to_string(),
            daily_schedules: v.daily_schedules.into_iter().map(Into::into).collect(),
            all_assignments: v.all_assignments.into_iter().map(Into::into).collect(),
            unassigned_flight_ids: ids(&v.unassigned_flights),
            total_pilots_used: v.total_pilots_used as u32,
            overall_compliance_rate: v.overall_compliance_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation result
// ---------------------------------------------------------------------------

#[napi(object)]
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<validator::ValidationResult> for ValidationResult {
    fn from(v: validator::ValidationResult) -> Self {
        ValidationResult {
            is_valid: v.is_ok(),
            errors: v.errors,
            warnings: v.warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// Exported functions
// ---------------------------------------------------------------------------

/// Assign runways so that overlapping flights never share one.
/// `algorithm` is one of `greedy`, `welsh_powell`, `dsatur`.
#[napi]
pub fn color_runways(flights: Vec<Flight>, algorithm: String) -> napi::Result<ColoringResult> {
    let algorithm: engine::ColoringAlgorithm = parse_name(&algorithm)?;
    coloring::color_runways(&engine_flights(flights)?, algorithm)
        .map(Into::into)
        .map_err(to_napi)
}

#[napi]
pub fn validate_coloring(flights: Vec<Flight>) -> napi::Result<ValidationResult> {
    Ok(validator::validate_coloring(&unchecked_flights(flights)?).into())
}

/// Schedule onto `max_runways` runways, delaying what does not fit.
#[napi]
pub fn schedule_constrained(
    flights: Vec<Flight>,
    max_runways: u32,
    algorithm: String,
    config: Option<SchedulerConfig>,
) -> napi::Result<ConstrainedSchedule> {
    let algorithm: engine::PriorityAlgorithm = parse_name(&algorithm)?;
    allocator::schedule_constrained(
        &engine_flights(flights)?,
        max_runways,
        algorithm,
        &engine_config(config),
    )
    .map(Into::into)
    .map_err(to_napi)
}

#[napi]
pub fn compare_algorithms(
    flights: Vec<Flight>,
    max_runways: u32,
    config: Option<SchedulerConfig>,
) -> napi::Result<Vec<AlgorithmStatistics>> {
    allocator::compare_algorithms(&engine_flights(flights)?, max_runways, &engine_config(config))
        .map(|all| all.into_iter().map(Into::into).collect())
        .map_err(to_napi)
}

#[napi]
pub fn schedule_pilots(
    flights: Vec<Flight>,
    pilots: Vec<Pilot>,
    strategy: String,
    config: Option<SchedulerConfig>,
) -> napi::Result<PilotSchedule> {
    let strategy: engine::PilotStrategy = parse_name(&strategy)?;
    let mut pool: Vec<engine::Pilot> = pilots.into_iter().map(Into::into).collect();
    pilots::schedule_pilots(
        &engine_flights(flights)?,
        &mut pool,
        strategy,
        &engine_config(config),
    )
    .map(Into::into)
    .map_err(to_napi)
}

#[napi]
pub fn validate_pilot_schedule(
    assignments: Vec<Assignment>,
    min_rest_hours: f64,
    max_daily_hours: f64,
) -> napi::Result<ValidationResult> {
    let assignments = assignments
        .into_iter()
        .map(engine::Assignment::try_from)
        .collect::<napi::Result<Vec<_>>>()?;
    Ok(validator::validate_pilot_schedule(&assignments, min_rest_hours, max_daily_hours).into())
}

#[napi]
pub fn schedule_multi_day(
    flights: Vec<Flight>,
    pilots: Vec<Pilot>,
    strategy: String,
    config: Option<SchedulerConfig>,
) -> napi::Result<MultiDaySchedule> {
    let strategy: engine::PilotStrategy = parse_name(&strategy)?;
    let mut pool: Vec<engine::Pilot> = pilots.into_iter().map(Into::into).collect();
    multi_day::schedule_multi_day(
        &engine_flights(flights)?,
        &mut pool,
        strategy,
        &engine_config(config),
    )
    .map(Into::into)
    .map_err(to_napi)
}

/// Report every problem in a flight set without scheduling it.
#[napi]
pub fn validate_flights(flights: Vec<Flight>) -> napi::Result<ValidationResult> {
    Ok(validator::validate_flights(&unchecked_flights(flights)?).into())
}
