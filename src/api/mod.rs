//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod scans;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use scans::configure_routes as configure_scan_routes;
