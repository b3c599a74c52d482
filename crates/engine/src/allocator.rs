use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use log::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::ScheduleError;
use crate::model::{
    AlgorithmComparison, ConstrainedSchedule, ConstrainedStatistics, DelayDistribution, Flight,
    PriorityAlgorithm,
};
use crate::validator::check_flights;

// ---------------------------------------------------------------------------
// Runway timeline
// ---------------------------------------------------------------------------

/// A single booked interval on a runway.
#[derive(Debug, Clone)]
struct Reservation {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

/// Bookings of one runway for the duration of a scheduling call.
#[derive(Debug, Default)]
struct RunwayTimeline {
    reservations: Vec<Reservation>,
}

impl RunwayTimeline {
    /// True when nothing booked overlaps the half-open range [start, end).
    fn is_free(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        !self
            .reservations
            .iter()
            .any(|r| r.start < end && r.end > start)
    }

    fn reserve(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.reservations.push(Reservation { start, end });
    }

    fn last_end(&self) -> Option<NaiveDateTime> {
        self.reservations.iter().map(|r| r.end).max()
    }
}

// ---------------------------------------------------------------------------
// Priority scores
// ---------------------------------------------------------------------------

const PASSENGER_CAP: u32 = 500;
const DISTANCE_CAP_KM: f64 = 10_000.0;

/// 10 for an empty flight down to 0 at 500+ passengers.
fn passenger_score(flight: &Flight) -> f64 {
    10.0 - f64::from(flight.passenger_count.min(PASSENGER_CAP)) / 50.0
}

/// 10 for a zero-distance flight down to 0 at 10,000+ km.
fn distance_score(flight: &Flight) -> f64 {
    10.0 - flight.distance_km.clamp(0.0, DISTANCE_CAP_KM) / 1000.0
}

impl PriorityAlgorithm {
    /// Processing-order score; lower is scheduled first.
    pub fn score(self, flight: &Flight) -> f64 {
        match self {
            PriorityAlgorithm::PriorityBased => f64::from(flight.priority),
            PriorityAlgorithm::PassengerFirst => passenger_score(flight),
            PriorityAlgorithm::DistanceFirst => distance_score(flight),
            PriorityAlgorithm::Hybrid => {
                f64::from(flight.priority) * 0.4
                    + passenger_score(flight) * 0.35
                    + distance_score(flight) * 0.25
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Slot search
// ---------------------------------------------------------------------------

fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> u32 {
    (to - from).num_minutes().max(0) as u32
}

/// Candidate placement of one flight on one runway.
#[derive(Debug, Clone, Copy)]
struct Slot {
    runway_idx: usize,
    start: NaiveDateTime,
    delay_mins: u32,
    /// Placed after the last booking because no probed delay fit.
    after_last: bool,
}

/// Earliest slot on one runway.
///
/// Probes delays `0, inc, 2*inc, ...` below `max_delay_mins`; when none fits,
/// the flight goes right after the runway's last booking.
fn earliest_slot(
    flight: &Flight,
    runway_idx: usize,
    timeline: &RunwayTimeline,
    config: &SchedulerConfig,
) -> Slot {
    let slot = |start: NaiveDateTime, after_last: bool| Slot {
        runway_idx,
        start,
        delay_mins: minutes_between(flight.start, start),
        after_last,
    };
    let Some(last_end) = timeline.last_end() else {
        return slot(flight.start, false);
    };
    let occupancy = Duration::minutes(i64::from(flight.occupancy_mins));

    let mut delay = 0;
    while delay < config.max_delay_mins {
        let start = flight.start + Duration::minutes(i64::from(delay));
        if timeline.is_free(start, start + occupancy) {
            return slot(start, false);
        }
        delay += config.delay_increment_mins;
    }

    slot(last_end.max(flight.start), true)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Assign flights to exactly `max_runways` runways, delaying the ones that do
/// not fit at their original time.
///
/// Flights are processed by `(algorithm score, original start)`. Each takes the
/// first runway free at its original time; failing that, the runway offering
/// the smallest delay (lowest runway id on ties). Input flights are not
/// mutated; the result holds copies with final `start`, `delay_mins` and
/// `runway_id`.
pub fn schedule_constrained(
    flights: &[Flight],
    max_runways: u32,
    algorithm: PriorityAlgorithm,
    config: &SchedulerConfig,
) -> Result<ConstrainedSchedule, ScheduleError> {
    if max_runways < 1 {
        return Err(ScheduleError::InvalidRunwayCount(max_runways));
    }
    config.validate()?;
    check_flights(flights)?;

    // Order flights by score, then by original start (stable for full ties).
    let mut order: Vec<(f64, Flight)> = flights
        .iter()
        .map(|f| {
            let mut copy = f.clone();
            copy.delay_mins = 0;
            copy.runway_id = None;
            (algorithm.score(f), copy)
        })
        .collect();
    order.sort_by(|a, b| match a.0.total_cmp(&b.0) {
        Ordering::Equal => a.1.start.cmp(&b.1.start),
        other => other,
    });

    let mut timelines: Vec<RunwayTimeline> =
        (0..max_runways).map(|_| RunwayTimeline::default()).collect();
    let mut scheduled: Vec<Flight> = Vec::with_capacity(order.len());

    for (_, mut flight) in order {
        let on_time = timelines
            .iter()
            .position(|t| t.is_free(flight.start, flight.end()));

        let slot = match on_time {
            Some(runway_idx) => Slot {
                runway_idx,
                start: flight.start,
                delay_mins: 0,
                after_last: false,
            },
            None => {
                let mut best: Option<Slot> = None;
                for (idx, timeline) in timelines.iter().enumerate() {
                    let candidate = earliest_slot(&flight, idx, timeline, config);
                    if best.map_or(true, |b| candidate.delay_mins < b.delay_mins) {
                        best = Some(candidate);
                    }
                }
                // max_runways >= 1, so a candidate always exists
                best.unwrap_or_else(|| earliest_slot(&flight, 0, &timelines[0], config))
            }
        };

        if slot.after_last {
            warn!(
                "Flight '{}' found no slot within {} minutes -- placed after the last booking on runway {} (+{} min)",
                flight.id,
                config.max_delay_mins,
                slot.runway_idx + 1,
                slot.delay_mins
            );
        } else if slot.delay_mins > 0 {
            debug!(
                "Flight '{}' delayed {} min onto runway {}",
                flight.id,
                slot.delay_mins,
                slot.runway_idx + 1
            );
        }

        flight.start = slot.start;
        flight.delay_mins = slot.delay_mins;
        flight.runway_id = Some(slot.runway_idx as u32 + 1);
        timelines[slot.runway_idx].reserve(flight.start, flight.end());
        scheduled.push(flight);
    }

    Ok(summarize(algorithm, max_runways, scheduled))
}

fn summarize(
    algorithm: PriorityAlgorithm,
    max_runways: u32,
    flights: Vec<Flight>,
) -> ConstrainedSchedule {
    let mut runway_assignments: BTreeMap<u32, Vec<Flight>> =
        (1..=max_runways).map(|r| (r, Vec::new())).collect();
    for flight in &flights {
        if let Some(runway) = flight.runway_id {
            runway_assignments
                .entry(runway)
                .or_default()
                .push(flight.clone());
        }
    }
    for runway in runway_assignments.values_mut() {
        runway.sort_by_key(|f| f.start);
    }

    let delayed_flights: Vec<Flight> = flights
        .iter()
        .filter(|f| f.delay_mins > 0)
        .cloned()
        .collect();
    let total_delay_mins: u64 = delayed_flights
        .iter()
        .map(|f| u64::from(f.delay_mins))
        .sum();
    let avg_delay_mins = if delayed_flights.is_empty() {
        0.0
    } else {
        total_delay_mins as f64 / delayed_flights.len() as f64
    };
    let on_time_count = flights.len() - delayed_flights.len();
    let on_time_percentage = if flights.is_empty() {
        100.0
    } else {
        on_time_count as f64 / flights.len() as f64 * 100.0
    };

    info!(
        "{}: {} flights on {} runways, {} delayed, {} min total delay",
        algorithm,
        flights.len(),
        max_runways,
        delayed_flights.len(),
        total_delay_mins
    );

    ConstrainedSchedule {
        algorithm,
        max_runways,
        flights,
        runway_assignments,
        delayed_flights,
        on_time_count,
        total_delay_mins,
        avg_delay_mins,
        on_time_percentage,
    }
}

/// Detailed metrics of one constrained run.
pub fn statistics(result: &ConstrainedSchedule) -> ConstrainedStatistics {
    let delays: Vec<u32> = result.delayed_flights.iter().map(|f| f.delay_mins).collect();
    let delay_distribution = match (delays.iter().min(), delays.iter().max()) {
        (Some(&min), Some(&max)) => Some(DelayDistribution {
            min,
            max,
            avg: delays.iter().map(|&d| f64::from(d)).sum::<f64>() / delays.len() as f64,
        }),
        _ => None,
    };

    ConstrainedStatistics {
        total_flights: result.flights.len(),
        on_time_flights: result.on_time_count,
        delayed_flights: result.delayed_flights.len(),
        on_time_percentage: result.on_time_percentage,
        total_delay_mins: result.total_delay_mins,
        avg_delay_mins: result.avg_delay_mins,
        max_delay_mins: delays.iter().copied().max().unwrap_or(0),
        runways_used: result.max_runways,
        flights_per_runway: result
            .runway_assignments
            .iter()
            .map(|(&r, fs)| (r, fs.len()))
            .collect(),
        delay_distribution,
    }
}

/// Run all four priority algorithms on the same flights, in a fixed order.
pub fn compare_algorithms(
    flights: &[Flight],
    max_runways: u32,
    config: &SchedulerConfig,
) -> Result<Vec<AlgorithmComparison>, ScheduleError> {
    PriorityAlgorithm::ALL
        .iter()
        .map(|&algorithm| {
            let result = schedule_constrained(flights, max_runways, algorithm, config)?;
            Ok(AlgorithmComparison {
                algorithm,
                statistics: statistics(&result),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
