/// Integration tests for the runway-engine binary.
///
/// These tests spawn the compiled binary via assert_cmd and exercise the
/// JSON stdin/stdout protocol for each command.
use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cmd() -> Command {
    Command::cargo_bin("runway-engine").unwrap()
}

/// Runs a request that must succeed and returns its `data` payload.
fn run_ok(input: &str) -> Value {
    let output = cmd()
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains(r#""ok":true"#))
        .get_output()
        .stdout
        .clone();
    let parsed: Value = serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();
    parsed["data"].clone()
}

const CHAIN: &str = r#"[
    { "id": "FL1", "origin": "JFK", "destination": "LAX", "start": "2024-03-01T14:00:00", "occupancyMins": 20 },
    { "id": "FL2", "origin": "ORD", "destination": "JFK", "start": "2024-03-01T14:10:00", "occupancyMins": 20 },
    { "id": "FL3", "origin": "SEA", "destination": "JFK", "start": "2024-03-01T14:25:00", "occupancyMins": 20 }
]"#;

// ---------------------------------------------------------------------------
// Runway commands
// ---------------------------------------------------------------------------

#[test]
fn color_runways_partial_overlap() {
    let input = format!(
        r#"{{ "command": "colorRunways", "algorithm": "dsatur", "flights": {} }}"#,
        CHAIN
    );
    let data = run_ok(&input);

    assert_eq!(data["runwayCount"], 2);
    assert_eq!(data["conflictsResolved"], 2);
    assert_eq!(data["algorithm"], "dsatur");
    let flights = data["flights"].as_array().unwrap();
    assert_eq!(flights.len(), 3);
    assert_eq!(flights[0]["runwayId"], flights[2]["runwayId"]);
}

#[test]
fn validate_coloring_reports_conflict() {
    let input = r#"{
        "command": "validateColoring",
        "flights": [
            { "id": "A", "start": "2024-03-01T14:00", "occupancyMins": 20, "runwayId": 1 },
            { "id": "B", "start": "2024-03-01T14:10", "occupancyMins": 20, "runwayId": 1 }
        ]
    }"#;
    let data = run_ok(input);
    let errors = data["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0], "Conflict: A and B both assigned to Runway 1");
}

#[test]
fn validate_coloring_reports_on_out_of_range_records() {
    let input = r#"{
        "command": "validateColoring",
        "flights": [
            { "id": "A", "start": "2024-03-01T14:00", "occupancyMins": 0, "runwayId": 1 },
            { "id": "B", "start": "2024-03-01T14:00", "occupancyMins": 20, "priority": 11, "runwayId": 1 },
            { "id": "C", "start": "2024-03-01T14:10", "occupancyMins": 20, "runwayId": 1 }
        ]
    }"#;
    let data = run_ok(input);
    let errors = data["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0], "Conflict: B and C both assigned to Runway 1");
}

#[test]
fn chromatic_bounds_of_chain() {
    let input = format!(r#"{{ "command": "chromaticBounds", "flights": {} }}"#, CHAIN);
    let data = run_ok(&input);
    assert_eq!(data["lower"], 2);
    assert_eq!(data["upper"], 3);
}

#[test]
fn schedule_constrained_single_runway() {
    let input = r#"{
        "command": "scheduleConstrained",
        "maxRunways": 1,
        "algorithm": "priority_based",
        "flights": [
            { "id": "LOW", "start": "2024-03-01T10:00", "occupancyMins": 20, "priority": 5 },
            { "id": "HIGH", "start": "2024-03-01T10:00", "occupancyMins": 20, "priority": 1 }
        ]
    }"#;
    let data = run_ok(input);

    assert_eq!(data["totalDelayMins"], 30);
    assert_eq!(data["onTimePercentage"], 50.0);
    let delayed = data["delayedFlights"].as_array().unwrap();
    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0]["id"], "LOW");
    assert_eq!(delayed[0]["start"], "2024-03-01T10:30:00");
}

#[test]
fn schedule_constrained_honors_config() {
    let input = r#"{
        "command": "scheduleConstrained",
        "maxRunways": 1,
        "algorithm": "hybrid",
        "config": { "maxDelayMins": 30 },
        "flights": [
            { "id": "A", "start": "2024-03-01T10:00", "occupancyMins": 60, "priority": 1 },
            { "id": "B", "start": "2024-03-01T10:00", "occupancyMins": 60, "priority": 9 }
        ]
    }"#;
    let data = run_ok(input);
    assert_eq!(data["totalDelayMins"], 60);
}

#[test]
fn schedule_constrained_zero_runways_fails() {
    let input = format!(
        r#"{{ "command": "scheduleConstrained", "maxRunways": 0, "algorithm": "hybrid", "flights": {} }}"#,
        CHAIN
    );
    cmd()
        .write_stdin(input)
        .assert()
        .failure()
        .stdout(contains(r#""ok":false"#))
        .stdout(contains("At least 1 runway"));
}

#[test]
fn compare_algorithms_lists_all_four() {
    let input = format!(
        r#"{{ "command": "compareAlgorithms", "maxRunways": 1, "flights": {} }}"#,
        CHAIN
    );
    let data = run_ok(&input);
    let names: Vec<&str> = data
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["algorithm"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["priority_based", "passenger_first", "distance_first", "hybrid"]
    );
}

#[test]
fn unknown_algorithm_is_rejected() {
    let input = format!(
        r#"{{ "command": "colorRunways", "algorithm": "tabu", "flights": {} }}"#,
        CHAIN
    );
    cmd()
        .write_stdin(input)
        .assert()
        .failure()
        .stdout(contains(r#""ok":false"#));
}

// ---------------------------------------------------------------------------
// Pilot commands
// ---------------------------------------------------------------------------

#[test]
fn schedule_pilots_with_generated_pool() {
    let input = r#"{
        "command": "schedulePilots",
        "strategy": "least_busy",
        "pilotCount": 3,
        "flights": [
            { "id": "F1", "start": "2024-03-01T00:00" },
            { "id": "F2", "start": "2024-03-01T12:00" },
            { "id": "F3", "start": "2024-03-02T00:00" },
            { "id": "F4", "start": "2024-03-02T12:00" },
            { "id": "F5", "start": "2024-03-03T00:00" },
            { "id": "F6", "start": "2024-03-03T12:00" }
        ]
    }"#;
    let data = run_ok(input);

    assert_eq!(data["schedule"]["complianceRate"], 100.0);
    assert_eq!(data["schedule"]["totalPilotsUsed"], 3);
    assert_eq!(data["statistics"]["activePilots"], 3);
    for pilot in data["pilots"].as_array().unwrap() {
        assert_eq!(pilot["assignedFlightIds"].as_array().unwrap().len(), 2);
    }
    assert_eq!(data["pilots"][0]["name"], "Capt. Smith");
}

#[test]
fn schedule_pilots_rest_enforced_with_explicit_pool() {
    let input = r#"{
        "command": "schedulePilots",
        "strategy": "round_robin",
        "pilots": [ { "id": "CAPT-1", "minRestHours": 10 } ],
        "flights": [
            { "id": "F1", "start": "2024-03-01T06:00" },
            { "id": "F2", "start": "2024-03-01T11:00" }
        ]
    }"#;
    let data = run_ok(input);
    assert_eq!(data["schedule"]["assignments"].as_array().unwrap().len(), 1);
    assert_eq!(data["schedule"]["unassignedFlights"][0]["id"], "F2");
    assert_eq!(data["schedule"]["complianceRate"], 50.0);
}

#[test]
fn schedule_pilots_requires_a_pool() {
    let input = r#"{
        "command": "schedulePilots",
        "strategy": "least_busy",
        "flights": []
    }"#;
    cmd()
        .write_stdin(input)
        .assert()
        .failure()
        .stdout(contains("pilotCount"));
}

#[test]
fn validate_pilot_schedule_finds_short_rest() {
    let input = r#"{
        "command": "validatePilotSchedule",
        "minRestHours": 10,
        "maxDailyHours": 8,
        "assignments": [
            { "pilotId": "P001", "flightId": "F1", "flightStart": "2024-03-01T06:00", "flightEnd": "2024-03-01T06:45" },
            { "pilotId": "P001", "flightId": "F2", "flightStart": "2024-03-01T11:00", "flightEnd": "2024-03-01T11:45" }
        ]
    }"#;
    let data = run_ok(input);
    let errors = data["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("insufficient rest"));
}

#[test]
fn schedule_multi_day_reuses_pilot() {
    let input = r#"{
        "command": "scheduleMultiDay",
        "strategy": "least_busy",
        "pilotCount": 1,
        "flights": [
            { "id": "D0", "start": "2024-03-01T08:00", "dayIndex": 0 },
            { "id": "D1", "start": "2024-03-02T08:00", "dayIndex": 1 },
            { "id": "D2", "start": "2024-03-03T08:00", "dayIndex": 2, "flightDurationHours": 2.5 }
        ]
    }"#;
    let data = run_ok(input);

    let schedule = &data["schedule"];
    assert_eq!(schedule["overallComplianceRate"], 100.0);
    assert_eq!(schedule["dailySchedules"].as_array().unwrap().len(), 3);
    assert_eq!(schedule["dailySchedules"][2]["date"], "2024-03-03");
    assert_eq!(schedule["pilotDailyHours"]["P001"]["2"], 2.5);
    assert_eq!(data["utilization"]["P001"]["daysWorked"], 3);
}

#[test]
fn validate_flights_collects_errors() {
    let input = r#"{
        "command": "validateFlights",
        "flights": [
            { "id": "A", "start": "2024-03-01T10:00", "occupancyMins": 0 },
            { "id": "A", "start": "2024-03-01T11:00", "priority": 11 }
        ]
    }"#;
    let data = run_ok(input);
    assert_eq!(data["errors"].as_array().unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

#[test]
fn rust_log_accepts_target_directives() {
    let input = format!(
        r#"{{ "command": "chromaticBounds", "flights": {} }}"#,
        CHAIN
    );
    cmd()
        .env("RUST_LOG", "runway_engine=debug")
        .write_stdin(input.clone())
        .assert()
        .success()
        .stdout(contains(r#""ok":true"#))
        .stderr(contains("request parsed"));

    cmd()
        .env_remove("RUST_LOG")
        .write_stdin(input)
        .assert()
        .success()
        .stderr(contains("request parsed").not());
}

#[test]
fn invalid_json_input() {
    let input = r#"{ this is not valid json "#;

    cmd()
        .write_stdin(input)
        .assert()
        .failure()
        .stdout(contains(r#""ok":false"#))
        .stdout(contains("Invalid JSON input"));
}

#[test]
fn unknown_command() {
    let input = r#"{ "command": "unknownCommand", "flights": [] }"#;

    cmd()
        .write_stdin(input)
        .assert()
        .failure()
        .stdout(contains(r#""ok":false"#))
        .stdout(contains("error"));
}

#[test]
fn invalid_datetime_is_rejected() {
    let input = r#"{
        "command": "colorRunways",
        "algorithm": "greedy",
        "flights": [ { "id": "A", "start": "tomorrow at noon" } ]
    }"#;

    cmd()
        .write_stdin(input)
        .assert()
        .failure()
        .stdout(contains("invalid datetime"));
}
