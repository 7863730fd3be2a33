//! APK Scan Server library.
//!
//! This library provides the core functionality for the scan server:
//! artifact intake, the background decompile-and-scan pipeline, report
//! generation, and the HTTP API.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
