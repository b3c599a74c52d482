use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::conflict::ConflictGraph;
use crate::error::ScheduleError;
use crate::model::{ColoringAlgorithm, ColoringResult, Flight};
use crate::validator::check_flights;

// ---------------------------------------------------------------------------
// Color selection
// ---------------------------------------------------------------------------

/// Smallest color (>= 1) not used by an already-colored neighbor of `i`.
fn smallest_free_color(graph: &ConflictGraph, i: usize, colors: &[Option<u32>]) -> u32 {
    let taken: BTreeSet<u32> = graph.neighbors(i).filter_map(|n| colors[n]).collect();
    let mut color = 1;
    while taken.contains(&color) {
        color += 1;
    }
    color
}

/// Colors nodes one by one in the given order.
fn color_in_order(graph: &ConflictGraph, order: impl IntoIterator<Item = usize>) -> Vec<u32> {
    let mut colors: Vec<Option<u32>> = vec![None; graph.node_count()];
    for i in order {
        colors[i] = Some(smallest_free_color(graph, i, &colors));
    }
    colors.into_iter().map(|c| c.unwrap_or(1)).collect()
}

fn greedy(flights: &[Flight], graph: &ConflictGraph) -> Vec<u32> {
    let mut order: Vec<usize> = (0..flights.len()).collect();
    // stable: equal starts keep input order
    order.sort_by_key(|&i| flights[i].start);
    color_in_order(graph, order)
}

fn welsh_powell(graph: &ConflictGraph) -> Vec<u32> {
    let mut order: Vec<usize> = (0..graph.node_count()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(graph.degree(i)));
    color_in_order(graph, order)
}

fn dsatur(graph: &ConflictGraph) -> Vec<u32> {
    let n = graph.node_count();
    let degrees: Vec<usize> = (0..n).map(|i| graph.degree(i)).collect();
    let mut colors: Vec<Option<u32>> = vec![None; n];
    let mut saturation: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); n];

    for _ in 0..n {
        // Highest saturation, then highest degree, then lowest index.
        let mut selected: Option<usize> = None;
        for i in (0..n).filter(|&i| colors[i].is_none()) {
            let better = match selected {
                None => true,
                Some(s) => {
                    (saturation[i].len(), degrees[i]) > (saturation[s].len(), degrees[s])
                }
            };
            if better {
                selected = Some(i);
            }
        }
        let Some(v) = selected else { break };

        let color = smallest_free_color(graph, v, &colors);
        colors[v] = Some(color);
        for nb in graph.neighbors(v) {
            if colors[nb].is_none() {
                saturation[nb].insert(color);
            }
        }
    }

    colors.into_iter().map(|c| c.unwrap_or(1)).collect()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Assign each flight a runway so that conflicting flights never share one,
/// using as few runways as the chosen heuristic manages.
///
/// Every algorithm yields a valid coloring with at most `max degree + 1`
/// runways. Input flights are not mutated; the result carries copies with
/// `runway_id` set.
pub fn color_runways(
    flights: &[Flight],
    algorithm: ColoringAlgorithm,
) -> Result<ColoringResult, ScheduleError> {
    check_flights(flights)?;

    if flights.is_empty() {
        return Ok(ColoringResult {
            algorithm,
            flights: Vec::new(),
            runway_count: 0,
            runway_assignments: BTreeMap::new(),
            conflicts_resolved: 0,
        });
    }

    let graph = ConflictGraph::build(flights);
    let colors = match algorithm {
        ColoringAlgorithm::Greedy => greedy(flights, &graph),
        ColoringAlgorithm::WelshPowell => welsh_powell(&graph),
        ColoringAlgorithm::Dsatur => dsatur(&graph),
    };

    let mut scheduled: Vec<Flight> = flights.to_vec();
    let mut runway_assignments: BTreeMap<u32, Vec<Flight>> = BTreeMap::new();
    for (flight, &color) in scheduled.iter_mut().zip(&colors) {
        flight.runway_id = Some(color);
        runway_assignments
            .entry(color)
            .or_default()
            .push(flight.clone());
    }
    for runway in runway_assignments.values_mut() {
        runway.sort_by_key(|f| f.start);
    }

    let runway_count = colors.iter().copied().max().unwrap_or(0);
    let conflicts_resolved = graph.edge_count();

    debug!(
        "{}: {} flights, {} conflicts, {} runways",
        algorithm,
        flights.len(),
        conflicts_resolved,
        runway_count
    );

    Ok(ColoringResult {
        algorithm,
        flights: scheduled,
        runway_count,
        runway_assignments,
        conflicts_resolved,
    })
}

/// Cheap `(lower, upper)` bounds on the runway count.
///
/// The lower bound is the maximum degree (at least 1), an approximation
/// rather than the clique number; the upper bound is `max degree + 1`.
pub fn chromatic_bounds(flights: &[Flight]) -> (usize, usize) {
    if flights.is_empty() {
        return (0, 0);
    }
    let graph = ConflictGraph::build(flights);
    let max_degree = graph.max_degree().map(|(_, d)| d).unwrap_or(0);
    (max_degree.max(1), max_degree + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate_coloring;
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

    fn chain() -> Vec<Flight> {
        vec![
            flight("FL1", 14, 0, 20),
            flight("FL2", 14, 10, 20),
            flight("FL3", 14, 25, 20),
        ]
    }

    #[test]
    fn test_empty_flight_list() {
        for algo in ColoringAlgorithm::ALL {
            let result = color_runways(&[], algo).unwrap();
            assert_eq!(result.runway_count, 0);
            assert!(result.flights.is_empty());
            assert!(result.runway_assignments.is_empty());
        }
    }

    #[test]
    fn test_single_flight_gets_runway_one() {
        for algo in ColoringAlgorithm::ALL {
            let result = color_runways(&[flight("FL1", 9, 0, 15)], algo).unwrap();
            assert_eq!(result.runway_count, 1);
            assert_eq!(result.flights[0].runway_id, Some(1));
        }
    }

    #[test]
    fn test_partial_overlap_needs_two_runways() {
        for algo in ColoringAlgorithm::ALL {
            let result = color_runways(&chain(), algo).unwrap();
            assert_eq!(result.runway_count, 2, "{}", algo);
            assert_eq!(result.conflicts_resolved, 2);
            assert_eq!(result.flights[0].runway_id, result.flights[2].runway_id);
            assert!(validate_coloring(&result.flights).is_ok());
        }
    }

    #[test]
    fn test_clique_needs_one_runway_each() {
        let flights: Vec<Flight> = (0..5)
            .map(|i| flight(&format!("FL{}", i), 12, i * 2, 30))
            .collect();
        for algo in ColoringAlgorithm::ALL {
            let result = color_runways(&flights, algo).unwrap();
            assert_eq!(result.runway_count, 5, "{}", algo);
            assert_eq!(result.conflicts_resolved, 10);
        }
    }

    #[test]
    fn test_no_conflicts_share_one_runway() {
        let flights = vec![
            flight("FL1", 8, 0, 15),
            flight("FL2", 9, 0, 15),
            flight("FL3", 10, 0, 15),
        ];
        for algo in ColoringAlgorithm::ALL {
            let result = color_runways(&flights, algo).unwrap();
            assert_eq!(result.runway_count, 1);
            assert_eq!(result.runway_assignments[&1].len(), 3);
        }
    }

    #[test]
    fn test_input_is_not_mutated_and_order_kept() {
        let flights = vec![flight("FL2", 14, 10, 20), flight("FL1", 14, 0, 20)];
        let result = color_runways(&flights, ColoringAlgorithm::Greedy).unwrap();
        assert!(flights.iter().all(|f| f.runway_id.is_none()));
        assert_eq!(result.flights[0].id, "FL2");
        // time order: FL1 is colored first
        assert_eq!(result.flights[1].runway_id, Some(1));
        assert_eq!(result.flights[0].runway_id, Some(2));
    }

    #[test]
    fn test_runway_lists_sorted_by_start() {
        let flights = vec![flight("FL2", 15, 0, 20), flight("FL1", 14, 0, 20)];
        let result = color_runways(&flights, ColoringAlgorithm::Dsatur).unwrap();
        let ids: Vec<&str> = result.runway_assignments[&1]
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, vec!["FL1", "FL2"]);
    }

    #[test]
    fn test_dense_set_within_degree_bound() {
        let flights: Vec<Flight> = (0..12)
            .map(|i| flight(&format!("FL{:02}", i), 6 + i / 4, (i % 4) * 12, 25))
            .collect();
        let (_, upper) = chromatic_bounds(&flights);
        for algo in ColoringAlgorithm::ALL {
            let result = color_runways(&flights, algo).unwrap();
            assert!(result.runway_count as usize <= upper);
            assert!(validate_coloring(&result.flights).is_ok());
        }
    }

    #[test]
    fn test_chromatic_bounds() {
        assert_eq!(chromatic_bounds(&[]), (0, 0));
        assert_eq!(chromatic_bounds(&[flight("FL1", 9, 0, 15)]), (1, 1));
        assert_eq!(chromatic_bounds(&chain()), (2, 3));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let flights = vec![flight("FL1", 9, 0, 15), flight("FL1", 10, 0, 15)];
        let err = color_runways(&flights, ColoringAlgorithm::Greedy).unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateFlight("FL1".to_string()));
    }

    #[test]
    fn test_deterministic() {
        let flights: Vec<Flight> = (0..20)
            .map(|i| flight(&format!("FL{:02}", i), 8 + (i * 7) % 5, (i * 13) % 60, 20 + i % 3 * 10))
            .collect();
        for algo in ColoringAlgorithm::ALL {
            let a = color_runways(&flights, algo).unwrap();
            let b = color_runways(&flights, algo).unwrap();
            let ra: Vec<Option<u32>> = a.flights.iter().map(|f| f.runway_id).collect();
            let rb: Vec<Option<u32>> = b.flights.iter().map(|f| f.runway_id).collect();
            assert_eq!(ra, rb);
        }
    }
}
