use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::ScheduleError;
use crate::model::{
    DailyPilotSchedule, Flight, MultiDaySchedule, Pilot, PilotStrategy, PilotUtilization,
};
use crate::pilots::{assign_in_order, check_inputs, compliance_rate};

/// Duty charged for a flight over a multi-day horizon: the block time when
/// known, otherwise occupancy plus the prep buffer.
fn multi_day_duty_hours(flight: &Flight, prep_buffer_mins: u32) -> f64 {
    if flight.flight_duration_hours > 0.0 {
        flight.flight_duration_hours
    } else {
        flight.duty_hours(prep_buffer_mins)
    }
}

/// Assign pilots day by day, in increasing `day_index` order.
///
/// The pool is reset once up front. At every day boundary each pilot's duty
/// hours are cleared; the rest anchor (`last_flight_end`) is cleared too
/// unless `config.carry_rest_across_days` is set. Assigned flight ids
/// accumulate over the whole horizon.
pub fn schedule_multi_day(
    flights: &[Flight],
    pilots: &mut [Pilot],
    strategy: PilotStrategy,
    config: &SchedulerConfig,
) -> Result<MultiDaySchedule, ScheduleError> {
    check_inputs(flights, pilots, config)?;
    for pilot in pilots.iter_mut() {
        pilot.reset();
    }

    let mut by_day: BTreeMap<u32, Vec<Flight>> = BTreeMap::new();
    for flight in flights {
        by_day
            .entry(flight.day_index)
            .or_default()
            .push(flight.clone());
    }

    let prep = config.prep_buffer_mins;
    let mut daily_schedules: Vec<DailyPilotSchedule> = Vec::with_capacity(by_day.len());
    let mut all_assignments = Vec::new();
    let mut unassigned_flights = Vec::new();
    let mut pilot_daily_hours: BTreeMap<String, BTreeMap<u32, f64>> = BTreeMap::new();

    for (day, day_flights) in by_day {
        for pilot in pilots.iter_mut() {
            if config.carry_rest_across_days {
                pilot.hours_flown_today = 0.0;
            } else {
                pilot.reset_day();
            }
        }

        let outcome = assign_in_order(&day_flights, pilots, strategy, Some(day), |f| {
            multi_day_duty_hours(f, prep)
        })?;

        let mut active: BTreeSet<&str> = BTreeSet::new();
        for a in &outcome.assignments {
            active.insert(a.pilot_id.as_str());
            *pilot_daily_hours
                .entry(a.pilot_id.clone())
                .or_default()
                .entry(day)
                .or_insert(0.0) += a.duration_hours();
        }

        let date = day_flights
            .iter()
            .map(|f| f.start)
            .min()
            .map(|start| start.date().format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let day_schedule = DailyPilotSchedule {
            day_index: day,
            date,
            unassigned_flight_ids: outcome.unassigned.iter().map(|f| f.id.clone()).collect(),
            flights_scheduled: day_flights.len(),
            pilots_active: active.len(),
            compliance_rate: compliance_rate(outcome.assignments.len(), day_flights.len()),
            assignments: outcome.assignments.clone(),
        };

        info!(
            "Day {}: {}/{} flights assigned ({:.1}%), {} pilots active",
            day,
            day_schedule.assignments.len(),
            day_schedule.flights_scheduled,
            day_schedule.compliance_rate,
            day_schedule.pilots_active
        );
        if !day_schedule.unassigned_flight_ids.is_empty() {
            debug!(
                "Day {} unassigned: {}",
                day,
                day_schedule.unassigned_flight_ids.join(", ")
            );
        }

        all_assignments.extend(outcome.assignments);
        unassigned_flights.extend(outcome.unassigned);
        daily_schedules.push(day_schedule);
    }

    Ok(MultiDaySchedule {
        strategy,
        daily_schedules,
        overall_compliance_rate: compliance_rate(all_assignments.len(), flights.len()),
        total_pilots_used: pilot_daily_hours.len(),
        all_assignments,
        unassigned_flights,
        pilot_daily_hours,
    })
}

/// Per-pilot workload over the horizon, for pilots that flew at least once.
/// Pilots missing from `pilots` are skipped.
pub fn pilot_utilization(
    schedule: &MultiDaySchedule,
    pilots: &[Pilot],
) -> BTreeMap<String, PilotUtilization> {
    let mut out = BTreeMap::new();
    for (pilot_id, daily) in &schedule.pilot_daily_hours {
        let Some(pilot) = pilots.iter().find(|p| &p.id == pilot_id) else {
            continue;
        };
        if daily.is_empty() {
            continue;
        }

        let total_hours: f64 = daily.values().sum();
        let days_worked = daily.len();
        let max_possible = pilot.max_daily_hours * days_worked as f64;
        out.insert(
            pilot_id.clone(),
            PilotUtilization {
                total_hours,
                days_worked,
                avg_hours_per_day: total_hours / days_worked as f64,
                utilization_percentage: if max_possible > 0.0 {
                    total_hours / max_possible * 100.0
                } else {
                    0.0
                },
                max_day_hours: daily.values().copied().fold(f64::MIN, f64::max),
                min_day_hours: daily.values().copied().fold(f64::MAX, f64::min),
            },
        );
    }
    out
}
