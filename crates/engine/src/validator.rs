use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::config::DutyLimits;
use crate::error::ScheduleError;
use crate::model::{Assignment, Flight, MultiDaySchedule, HOURS_EPSILON};

// ---------------------------------------------------------------------------
// Validation result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Input checks
// ---------------------------------------------------------------------------

/// Fail-fast input check run by every scheduler before any work.
pub fn check_flights(flights: &[Flight]) -> Result<(), ScheduleError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(flights.len());
    for flight in flights {
        flight.check()?;
        if !seen.insert(flight.id.as_str()) {
            return Err(ScheduleError::DuplicateFlight(flight.id.clone()));
        }
    }
    Ok(())
}

/// Validate a flight set, reporting every problem instead of stopping at the
/// first. Errors are listed before warnings.
pub fn validate_flights(flights: &[Flight]) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    {
        let mut seen: HashSet<&str> = HashSet::new();
        for flight in flights {
            if !seen.insert(flight.id.as_str()) {
                errors.push(format!(
                    "Duplicate flight ID '{}' -- each flight must have a unique ID",
                    flight.id
                ));
            }
        }
    }

    for flight in flights {
        if let Err(e) = flight.check() {
            errors.push(e.to_string());
        }
    }

    if flights.is_empty() {
        warnings.push("No flights given -- nothing to schedule".to_string());
    }
    for flight in flights {
        if flight.distance_km < 0.0 {
            warnings.push(format!(
                "Flight '{}' has negative distance {} km -- treated as 0",
                flight.id, flight.distance_km
            ));
        }
        if flight.flight_duration_hours < 0.0 {
            warnings.push(format!(
                "Flight '{}' has negative duration {} h -- occupancy will be used for duty time",
                flight.id, flight.flight_duration_hours
            ));
        }
    }

    ValidationResult { errors, warnings }
}

// ---------------------------------------------------------------------------
// Runway checks
// ---------------------------------------------------------------------------

/// Check that no two flights sharing a runway overlap in time.
pub fn validate_coloring(flights: &[Flight]) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (i, a) in flights.iter().enumerate() {
        let Some(runway) = a.runway_id else {
            warnings.push(format!("Flight '{}' has no runway assigned", a.id));
            continue;
        };
        for b in &flights[i + 1..] {
            if b.runway_id == Some(runway) && a.overlaps(b) {
                errors.push(format!(
                    "Conflict: {} and {} both assigned to Runway {}",
                    a.id, b.id, runway
                ));
            }
        }
    }

    ValidationResult { errors, warnings }
}

// ---------------------------------------------------------------------------
// Pilot duty checks
// ---------------------------------------------------------------------------

/// Duty and rest checks over one pilot's assignments, already sorted by start.
fn check_pilot_duty(
    pilot_id: &str,
    day: Option<u32>,
    assignments: &[&Assignment],
    limits: DutyLimits,
    errors: &mut Vec<String>,
) {
    let on_day = day.map(|d| format!(" on day {}", d)).unwrap_or_default();

    let total: f64 = assignments.iter().map(|a| a.duration_hours()).sum();
    if total > limits.max_daily_hours + HOURS_EPSILON {
        errors.push(format!(
            "Pilot {} exceeds max daily hours{}: {:.2} > {:.2}",
            pilot_id, on_day, total, limits.max_daily_hours
        ));
    }

    for pair in assignments.windows(2) {
        let rest = (pair[1].flight_start - pair[0].flight_end).num_seconds() as f64 / 3600.0;
        if rest + HOURS_EPSILON < limits.min_rest_hours {
            errors.push(format!(
                "Pilot {} insufficient rest between {} and {}{}: {:.2}h < {:.2}h",
                pilot_id,
                pair[0].flight_id,
                pair[1].flight_id,
                on_day,
                rest,
                limits.min_rest_hours
            ));
        }
    }
}

fn duplicate_flight_errors<'a>(
    assignments: impl IntoIterator<Item = &'a Assignment>,
    errors: &mut Vec<String>,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    for a in assignments {
        if !seen.insert(a.flight_id.as_str()) {
            errors.push(format!(
                "Flight '{}' is assigned to more than one pilot",
                a.flight_id
            ));
        }
    }
}

/// Check a single-day assignment list against duty limits, reporting every
/// violation found.
pub fn validate_pilot_schedule(
    assignments: &[Assignment],
    min_rest_hours: f64,
    max_daily_hours: f64,
) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let limits = DutyLimits {
        max_daily_hours,
        min_rest_hours,
    };

    duplicate_flight_errors(assignments, &mut errors);

    let mut by_pilot: BTreeMap<&str, Vec<&Assignment>> = BTreeMap::new();
    for a in assignments {
        by_pilot.entry(a.pilot_id.as_str()).or_default().push(a);
    }
    for (pilot_id, mut list) in by_pilot {
        list.sort_by_key(|a| a.flight_start);
        check_pilot_duty(pilot_id, None, &list, limits, &mut errors);
    }

    if assignments.is_empty() {
        warnings.push("No assignments to validate".to_string());
    }

    ValidationResult { errors, warnings }
}

/// Check a multi-day result per pilot per day. Rest across day boundaries is
/// not checked: each day starts fresh.
pub fn validate_multi_day(schedule: &MultiDaySchedule, limits: DutyLimits) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    duplicate_flight_errors(&schedule.all_assignments, &mut errors);

    let mut by_pilot_day: BTreeMap<(&str, u32), Vec<&Assignment>> = BTreeMap::new();
    for a in &schedule.all_assignments {
        by_pilot_day
            .entry((a.pilot_id.as_str(), a.day_index.unwrap_or(0)))
            .or_default()
            .push(a);
    }
    for ((pilot_id, day), mut list) in by_pilot_day {
        list.sort_by_key(|a| a.flight_start);
        check_pilot_duty(pilot_id, Some(day), &list, limits, &mut errors);
    }

    if !schedule.unassigned_flights.is_empty() {
        warnings.push(format!(
            "{} flight(s) left without a pilot",
            schedule.unassigned_flights.len()
        ));
    }

    ValidationResult { errors, warnings }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PilotStrategy;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn flight(id: &str, h: u32, m: u32, occ: u32) -> Flight {
        Flight::new(id, "JFK", "LAX", at(h, m), occ, 5).unwrap()
    }

    fn assignment(pilot: &str, flight: &str, start: NaiveDateTime, mins: i64) -> Assignment {
        Assignment {
            pilot_id: pilot.to_string(),
            flight_id: flight.to_string(),
            flight_start: start,
            flight_end: start + chrono::Duration::minutes(mins),
            day_index: None,
        }
    }

    #[test]
    fn test_check_flights_rejects_duplicates_and_bad_records() {
        let ok = vec![flight("A", 9, 0, 15), flight("B", 9, 0, 15)];
        assert!(check_flights(&ok).is_ok());

        let dup = vec![flight("A", 9, 0, 15), flight("A", 10, 0, 15)];
        assert_eq!(
            check_flights(&dup).unwrap_err(),
            ScheduleError::DuplicateFlight("A".to_string())
        );

        let mut bad = flight("C", 9, 0, 15);
        bad.occupancy_mins = 0;
        assert!(matches!(
            check_flights(&[bad]).unwrap_err(),
            ScheduleError::InvalidOccupancy { .. }
        ));
    }

    #[test]
    fn test_validate_flights_collects_everything() {
        let mut zero = flight("Z", 9, 0, 15);
        zero.occupancy_mins = 0;
        let mut prio = flight("P", 9, 0, 15);
        prio.priority = 12;
        let far = flight("N", 9, 0, 15).with_distance(-5.0);
        let flights = vec![flight("A", 9, 0, 15), flight("A", 9, 30, 15), zero, prio, far];

        let result = validate_flights(&flights);
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].contains("Duplicate flight ID 'A'"));
        assert_eq!(result.warnings.len(), 1);

        let empty = validate_flights(&[]);
        assert!(empty.is_ok());
        assert_eq!(empty.warnings.len(), 1);
    }

    #[test]
    fn test_validate_coloring_reports_each_conflict() {
        let mut a = flight("FL1", 14, 0, 20);
        let mut b = flight("FL2", 14, 10, 20);
        let mut c = flight("FL3", 14, 20, 20);
        a.runway_id = Some(1);
        b.runway_id = Some(1);
        c.runway_id = Some(1);
        let result = validate_coloring(&[a.clone(), b.clone(), c.clone()]);
        assert_eq!(
            result.errors,
            vec![
                "Conflict: FL1 and FL2 both assigned to Runway 1".to_string(),
                "Conflict: FL2 and FL3 both assigned to Runway 1".to_string(),
            ]
        );

        b.runway_id = Some(2);
        assert!(validate_coloring(&[a.clone(), b, c]).is_ok());

        let unassigned = flight("FL4", 14, 0, 20);
        let result = validate_coloring(&[a, unassigned]);
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_validate_coloring_accepts_unchecked_records() {
        let mut zero = flight("Z", 14, 0, 15);
        zero.occupancy_mins = 0;
        zero.runway_id = Some(1);
        let mut prio = flight("P", 14, 5, 20);
        prio.priority = 11;
        prio.runway_id = Some(1);
        let mut other = flight("Q", 14, 10, 20);
        other.runway_id = Some(1);

        let result = validate_coloring(&[zero, prio, other]);
        assert_eq!(
            result.errors,
            vec!["Conflict: P and Q both assigned to Runway 1".to_string()]
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_pilot_schedule_rest_and_duty() {
        let good = vec![
            assignment("P001", "FL1", at(6, 0), 45),
            assignment("P001", "FL2", at(16, 45), 45),
        ];
        assert!(validate_pilot_schedule(&good, 10.0, 8.0).is_ok());

        let short_rest = vec![
            assignment("P001", "FL2", at(11, 0), 45),
            assignment("P001", "FL1", at(6, 0), 45),
        ];
        let result = validate_pilot_schedule(&short_rest, 10.0, 8.0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("insufficient rest between FL1 and FL2"));

        let long_day = vec![
            assignment("P002", "FL3", at(1, 0), 300),
            assignment("P002", "FL4", at(16, 0), 300),
        ];
        let result = validate_pilot_schedule(&long_day, 10.0, 8.0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("exceeds max daily hours: 10.00 > 8.00"));
    }

    #[test]
    fn test_validate_pilot_schedule_duplicate_flight() {
        let list = vec![
            assignment("P001", "FL1", at(6, 0), 45),
            assignment("P002", "FL1", at(6, 0), 45),
        ];
        let result = validate_pilot_schedule(&list, 10.0, 8.0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("more than one pilot"));
    }

    #[test]
    fn test_validate_multi_day_groups_by_day() {
        let mut day0 = assignment("P001", "FL1", at(20, 0), 45);
        day0.day_index = Some(0);
        // next morning, only 9h later: fine because days are checked apart
        let mut day1 = assignment("P001", "FL2", at(20, 0) + chrono::Duration::hours(9), 45);
        day1.day_index = Some(1);
        let mut schedule = MultiDaySchedule {
            strategy: PilotStrategy::LeastBusy,
            daily_schedules: Vec::new(),
            all_assignments: vec![day0.clone(), day1],
            unassigned_flights: Vec::new(),
            pilot_daily_hours: BTreeMap::new(),
            total_pilots_used: 1,
            overall_compliance_rate: 100.0,
        };
        assert!(validate_multi_day(&schedule, DutyLimits::default()).is_ok());

        let mut same_day = assignment("P001", "FL3", at(22, 0), 45);
        same_day.day_index = Some(0);
        schedule.all_assignments.push(same_day);
        let result = validate_multi_day(&schedule, DutyLimits::default());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("on day 0"));
    }
}
