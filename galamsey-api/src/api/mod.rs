//! HTTP API handlers for galamsey-api

pub mod batches;
pub mod dashboard;
pub mod health;
pub mod sites;
pub mod stats;
pub mod upload;

pub use batches::batch_routes;
pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use sites::site_routes;
pub use stats::stats_routes;
pub use upload::upload_routes;
