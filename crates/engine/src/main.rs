use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use runway_engine::model::{
    Assignment, ColoringAlgorithm, Flight, MultiDaySchedule, Pilot, PilotSchedule, PilotStrategy,
    PilotUtilization, PoolStatistics, PriorityAlgorithm,
};
use runway_engine::{allocator, coloring, multi_day, pilots, validator};
use runway_engine::{ScheduleError, SchedulerConfig};

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
enum Request {
    #[serde(rename_all = "camelCase")]
    ColorRunways {
        flights: Vec<Flight>,
        algorithm: ColoringAlgorithm,
    },
    ValidateColoring {
        flights: Vec<Flight>,
    },
    ChromaticBounds {
        flights: Vec<Flight>,
    },
    #[serde(rename_all = "camelCase")]
    ScheduleConstrained {
        flights: Vec<Flight>,
        max_runways: u32,
        algorithm: PriorityAlgorithm,
        #[serde(default)]
        config: SchedulerConfig,
    },
    #[serde(rename_all = "camelCase")]
    CompareAlgorithms {
        flights: Vec<Flight>,
        max_runways: u32,
        #[serde(default)]
        config: SchedulerConfig,
    },
    #[serde(rename_all = "camelCase")]
    SchedulePilots {
        flights: Vec<Flight>,
        pilots: Option<Vec<Pilot>>,
        pilot_count: Option<usize>,
        strategy: PilotStrategy,
        #[serde(default)]
        config: SchedulerConfig,
    },
    #[serde(rename_all = "camelCase")]
    ValidatePilotSchedule {
        assignments: Vec<Assignment>,
        min_rest_hours: Option<f64>,
        max_daily_hours: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    ScheduleMultiDay {
        flights: Vec<Flight>,
        pilots: Option<Vec<Pilot>>,
        pilot_count: Option<usize>,
        strategy: PilotStrategy,
        #[serde(default)]
        config: SchedulerConfig,
    },
    ValidateFlights {
        flights: Vec<Flight>,
    },
}

#[derive(Debug, Serialize)]
struct OkResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrResponse {
    ok: bool,
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BoundsResponse {
    lower: usize,
    upper: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PilotRun {
    schedule: PilotSchedule,
    statistics: PoolStatistics,
    pilots: Vec<Pilot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiDayRun {
    schedule: MultiDaySchedule,
    utilization: BTreeMap<String, PilotUtilization>,
    pilots: Vec<Pilot>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// An explicit pilot list wins over a count for a generated pool.
fn build_pool(
    explicit: Option<Vec<Pilot>>,
    pilot_count: Option<usize>,
    config: &SchedulerConfig,
) -> Result<Vec<Pilot>, ScheduleError> {
    match (explicit, pilot_count) {
        (Some(pool), _) => Ok(pool),
        (None, Some(count)) => pilots::create_pilots(count, config.duty),
        (None, None) => Err(ScheduleError::InvalidConfig(
            "either 'pilots' or 'pilotCount' is required".to_string(),
        )),
    }
}

fn write_ok<T: Serialize>(data: T) {
    let resp = OkResponse { ok: true, data };
    let json = serde_json::to_string(&resp).unwrap_or_else(|e| {
        format!("{{\"ok\":false,\"error\":\"serialization error: {}\"}}", e)
    });
    println!("{}", json);
    let _ = io::stdout().flush();
}

fn write_err(msg: impl std::fmt::Display) -> ! {
    let resp = ErrResponse {
        ok: false,
        error: msg.to_string(),
    };
    let json = serde_json::to_string(&resp).unwrap_or_else(|_| {
        "{\"ok\":false,\"error\":\"double serialization error\"}".to_string()
    });
    println!("{}", json);
    let _ = io::stdout().flush();
    std::process::exit(1);
}

fn respond<T: Serialize>(result: Result<T, ScheduleError>) {
    match result {
        Ok(data) => write_ok(data),
        Err(e) => write_err(e),
    }
}

fn init_logging() {
    // stdout carries the JSON response, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    init_logging();

    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        write_err(format!("Failed to read stdin: {}", e));
    }

    let request: Request = match serde_json::from_str(&input) {
        Ok(r) => r,
        Err(e) => write_err(format!("Invalid JSON input: {}", e)),
    };
    debug!("request parsed");

    match request {
        Request::ColorRunways { flights, algorithm } => {
            respond(coloring::color_runways(&flights, algorithm));
        }
        Request::ValidateColoring { flights } => {
            write_ok(validator::validate_coloring(&flights));
        }
        Request::ChromaticBounds { flights } => {
            let (lower, upper) = coloring::chromatic_bounds(&flights);
            write_ok(BoundsResponse { lower, upper });
        }
        Request::ScheduleConstrained {
            flights,
            max_runways,
            algorithm,
            config,
        } => {
            respond(allocator::schedule_constrained(
                &flights,
                max_runways,
                algorithm,
                &config,
            ));
        }
        Request::CompareAlgorithms {
            flights,
            max_runways,
            config,
        } => {
            respond(allocator::compare_algorithms(&flights, max_runways, &config));
        }
        Request::SchedulePilots {
            flights,
            pilots: pool,
            pilot_count,
            strategy,
            config,
        } => {
            let result = build_pool(pool, pilot_count, &config).and_then(|mut pool| {
                let schedule = pilots::schedule_pilots(&flights, &mut pool, strategy, &config)?;
                Ok(PilotRun {
                    schedule,
                    statistics: pilots::pool_statistics(&pool),
                    pilots: pool,
                })
            });
            respond(result);
        }
        Request::ValidatePilotSchedule {
            assignments,
            min_rest_hours,
            max_daily_hours,
        } => {
            let defaults = SchedulerConfig::default().duty;
            write_ok(validator::validate_pilot_schedule(
                &assignments,
                min_rest_hours.unwrap_or(defaults.min_rest_hours),
                max_daily_hours.unwrap_or(defaults.max_daily_hours),
            ));
        }
        Request::ScheduleMultiDay {
            flights,
            pilots: pool,
            pilot_count,
            strategy,
            config,
        } => {
            let result = build_pool(pool, pilot_count, &config).and_then(|mut pool| {
                let schedule =
                    multi_day::schedule_multi_day(&flights, &mut pool, strategy, &config)?;
                Ok(MultiDayRun {
                    utilization: multi_day::pilot_utilization(&schedule, &pool),
                    schedule,
                    pilots: pool,
                })
            });
            respond(result);
        }
        Request::ValidateFlights { flights } => {
            write_ok(validator::validate_flights(&flights));
        }
    }
}
