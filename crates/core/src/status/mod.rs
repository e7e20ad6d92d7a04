//! Refresh status module.
//!
//! The status row is the health signal of the data server: whether the
//! refresh loop holds a terminal session, when its last cycle succeeded,
//! and how often it had to reconnect or restart.
//!
//! ```text
//! RefreshLoop / RefreshSupervisor
//!        │
//!        ▼
//!  StatusReporter ──► StatusRepository (refresh_status row)
//!        │
//!        ▼
//!  HTTP /api/v1/status
//! ```

mod status_model;
mod status_reporter;
mod status_traits;

pub use status_model::{HealthLevel, RefreshState, RefreshStatus};
pub use status_reporter::StatusReporter;
pub use status_traits::StatusRepositoryTrait;
