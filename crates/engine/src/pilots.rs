use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Duration;
use log::{debug, info};

use crate::config::{DutyLimits, SchedulerConfig};
use crate::error::ScheduleError;
use crate::model::{Assignment, Flight, Pilot, PilotSchedule, PilotStrategy, PoolStatistics};
use crate::validator::check_flights;

const SURNAMES: [&str; 20] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin",
];

// ---------------------------------------------------------------------------
// Pilot selection
// ---------------------------------------------------------------------------

/// Orders pilots by hours flown today, then by number of assignments.
fn cmp_load(a: &Pilot, b: &Pilot) -> Ordering {
    a.hours_flown_today
        .total_cmp(&b.hours_flown_today)
        .then(a.assigned_flight_ids.len().cmp(&b.assigned_flight_ids.len()))
}

impl PilotStrategy {
    /// Picks one pilot among the `eligible` indices into `pilots`. On ties the
    /// pilot listed first wins.
    pub fn select(self, pilots: &[Pilot], eligible: &[usize]) -> Option<usize> {
        let candidates = eligible.iter().copied();
        match self {
            PilotStrategy::LeastBusy => {
                candidates.min_by(|&a, &b| cmp_load(&pilots[a], &pilots[b]))
            }
            PilotStrategy::MostAvailable => {
                candidates.min_by(|&a, &b| cmp_load(&pilots[b], &pilots[a]))
            }
            PilotStrategy::RoundRobin => {
                candidates.min_by_key(|&i| pilots[i].assigned_flight_ids.len())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Greedy day pass
// ---------------------------------------------------------------------------

/// Assignments and leftovers of one greedy pass.
pub(crate) struct DayOutcome {
    pub assignments: Vec<Assignment>,
    pub unassigned: Vec<Flight>,
}

/// Assigns `flights` in start order, one pilot each, without backtracking.
///
/// `duty_hours` gives the duty charged for a flight; the assignment ends that
/// long after the flight starts. Pilot state is not reset here.
pub(crate) fn assign_in_order(
    flights: &[Flight],
    pilots: &mut [Pilot],
    strategy: PilotStrategy,
    day_index: Option<u32>,
    duty_hours: impl Fn(&Flight) -> f64,
) -> Result<DayOutcome, ScheduleError> {
    let mut sorted: Vec<&Flight> = flights.iter().collect();
    sorted.sort_by_key(|f| f.start);

    let mut assignments: Vec<Assignment> = Vec::new();
    let mut unassigned: Vec<Flight> = Vec::new();

    for flight in sorted {
        let hours = duty_hours(flight);
        let eligible: Vec<usize> = pilots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.can_fly(flight.start, hours))
            .map(|(i, _)| i)
            .collect();

        let Some(idx) = strategy.select(pilots, &eligible) else {
            debug!("Flight '{}' at {} has no eligible pilot", flight.id, flight.start);
            unassigned.push(flight.clone());
            continue;
        };

        let end = flight.start + Duration::seconds((hours * 3600.0).round() as i64);
        let pilot = &mut pilots[idx];
        pilot.assign(&flight.id, flight.start, end, hours)?;
        assignments.push(Assignment {
            pilot_id: pilot.id.clone(),
            flight_id: flight.id.clone(),
            flight_start: flight.start,
            flight_end: end,
            day_index,
        });
    }

    Ok(DayOutcome {
        assignments,
        unassigned,
    })
}

pub(crate) fn compliance_rate(assigned: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        assigned as f64 / total as f64 * 100.0
    }
}

/// Checks everything a pilot run depends on before any pilot is touched.
pub(crate) fn check_inputs(
    flights: &[Flight],
    pilots: &[Pilot],
    config: &SchedulerConfig,
) -> Result<(), ScheduleError> {
    config.validate()?;
    check_flights(flights)?;
    for pilot in pilots {
        pilot.check_limits()?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Assign one pilot per flight for a single operating day.
///
/// Every pilot in `pilots` is reset first. Duty time per flight is occupancy
/// plus `config.prep_buffer_mins`. Flights without an eligible pilot end up
/// in `unassigned_flights`; that is not an error.
pub fn schedule_pilots(
    flights: &[Flight],
    pilots: &mut [Pilot],
    strategy: PilotStrategy,
    config: &SchedulerConfig,
) -> Result<PilotSchedule, ScheduleError> {
    check_inputs(flights, pilots, config)?;
    for pilot in pilots.iter_mut() {
        pilot.reset();
    }

    let prep = config.prep_buffer_mins;
    let outcome = assign_in_order(flights, pilots, strategy, None, |f| f.duty_hours(prep))?;

    let pilot_utilization: BTreeMap<String, f64> = pilots
        .iter()
        .filter(|p| !p.assigned_flight_ids.is_empty())
        .map(|p| (p.id.clone(), p.hours_flown_today / p.max_daily_hours * 100.0))
        .collect();
    let compliance_rate = compliance_rate(outcome.assignments.len(), flights.len());

    info!(
        "{}: {}/{} flights assigned to {} of {} pilots",
        strategy,
        outcome.assignments.len(),
        flights.len(),
        pilot_utilization.len(),
        pilots.len()
    );

    Ok(PilotSchedule {
        strategy,
        total_pilots_used: pilot_utilization.len(),
        assignments: outcome.assignments,
        unassigned_flights: outcome.unassigned,
        pilot_utilization,
        compliance_rate,
    })
}

/// Build a deterministic pool `P001`, `P002`, ... named after a fixed surname
/// list, with a numeric suffix once the list wraps.
pub fn create_pilots(count: usize, limits: DutyLimits) -> Result<Vec<Pilot>, ScheduleError> {
    limits.validate()?;
    (0..count)
        .map(|i| {
            let mut name = format!("Capt. {}", SURNAMES[i % SURNAMES.len()]);
            if i >= SURNAMES.len() {
                name.push_str(&format!(" {}", i / SURNAMES.len() + 1));
            }
            Pilot::with_limits(format!("P{:03}", i + 1), name, limits)
        })
        .collect()
}

/// Load summary of a pool after a single-day run.
pub fn pool_statistics(pilots: &[Pilot]) -> PoolStatistics {
    let total = pilots.len();
    let active: Vec<&Pilot> = pilots
        .iter()
        .filter(|p| !p.assigned_flight_ids.is_empty())
        .collect();

    let (avg, max, rate) = if total == 0 {
        (0.0, 0.0, 0.0)
    } else {
        (
            pilots.iter().map(|p| p.hours_flown_today).sum::<f64>() / total as f64,
            pilots
                .iter()
                .map(|p| p.hours_flown_today)
                .fold(0.0, f64::max),
            active.len() as f64 / total as f64 * 100.0,
        )
    };
    let min = active
        .iter()
        .map(|p| p.hours_flown_today)
        .min_by(f64::total_cmp)
        .unwrap_or(0.0);

    PoolStatistics {
        total_pilots: total,
        active_pilots: active.len(),
        avg_hours_per_pilot: avg,
        max_hours: max,
        min_hours: min,
        utilization_rate: rate,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
