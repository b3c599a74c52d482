//! Runway and pilot scheduling engine.
//!
//! Three engines share one flight model:
//! - [`coloring`]: assign runways so overlapping flights never share one,
//!   with as few runways as possible.
//! - [`allocator`]: schedule onto a fixed number of runways, delaying flights
//!   that do not fit.
//! - [`pilots`] and [`multi_day`]: assign pilots under duty-hour and rest limits.
//!
//! Schedulers return [`error::ScheduleError`] only for bad input; running out
//! of runways or pilots shows up in the result data.

pub mod allocator;
pub mod coloring;
pub mod config;
pub mod conflict;
pub mod error;
pub mod model;
pub mod multi_day;
pub mod pilots;
pub mod validator;

pub use config::{DutyLimits, SchedulerConfig};
pub use error::ScheduleError;
