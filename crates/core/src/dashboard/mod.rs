//! Read and write contract for the web layer.

mod dashboard_service;

pub use dashboard_service::{DashboardService, DashboardServiceTrait};
