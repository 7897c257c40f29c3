//! Strict-constraint class timetabling.
//!
//! Assigns coaches, branches, levels and timeslots to classes so that every
//! enrolled student gets a seat, without ever breaking a hard constraint:
//! coach qualification, double booking, daily and weekly workload caps,
//! consecutive-class limits, single branch per day and room capacity.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Coach`, `Requirement`, `Candidate`,
//!   `ScheduledEntry`, `Schedule`, `Catalog`, `ClockTime`, `Interval`
//! - **`dispatching`**: Priority rules that order unmet demand
//! - **`scheduler`**: `StrictScheduler`, the six-phase pipeline, scoring,
//!   statistics
//! - **`validation`**: Input integrity checks and the post-run audit
//! - **`generation`**: Candidate pool builder from operating hours
//! - **`config`**: `SchedulerConfig`, loaded from TOML
//! - **`error`**: `SchedulerError`, `ConfigError`
//!
//! # Architecture
//!
//! The engine is a single-threaded iterative greedy search. Each iteration
//! runs the phase pipeline over a freshly shuffled candidate pool; the
//! controller keeps the best audited result with no violations. The
//! library only emits `tracing` events and never installs a subscriber.
//!
//! # Example
//!
//! ```
//! use u_timetable::{SchedulerConfig, SchedulingProblem, StrictScheduler};
//! use u_timetable::models::{Candidate, Catalog, Coach, Day, Requirement};
//!
//! let problem = SchedulingProblem::new(Catalog::default())
//!     .with_coach(
//!         Coach::part_time("C1")
//!             .with_qualification("L1")
//!             .with_branch("KT")
//!             .available_on(&[Day::Sun]),
//!     )
//!     .with_requirement(Requirement::new("KT", "L1", 6))
//!     .with_candidate(Candidate::new(
//!         1, "C1", "KT", "L1", Day::Sun,
//!         "09:00".parse().unwrap(), "10:30".parse().unwrap(),
//!     ));
//!
//! let outcome = StrictScheduler::new(problem, SchedulerConfig::default())
//!     .unwrap()
//!     .run();
//! assert_eq!(outcome.result.schedule.len(), 1);
//! ```

pub mod config;
pub mod dispatching;
pub mod error;
pub mod generation;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use config::SchedulerConfig;
pub use error::{ConfigError, SchedulerError, SchedulerResult};
pub use generation::CandidateGenerator;
pub use models::SchedulingProblem;
pub use scheduler::{ScheduleOutcome, ScheduleResult, StrictScheduler};
