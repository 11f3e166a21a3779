//! # medialog-core
//!
//! Core library for medialog - a cross-platform activity analytics engine.
//!
//! This library provides:
//! - Domain types for titles, achievements, play events and derived records
//! - Database storage layer with SQLite
//! - The analytics engine: window aggregation, completion rules, trend and
//!   insight generators, and the composite dashboard
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through two layers:
//! - **Layer 1 (Stores):** Normalized per-platform tables populated by sync
//!   jobs (external to this crate); read-only to the analytics engine
//! - **Layer 2 (Derived):** Snapshots and streaks computed from Layer 1,
//!   regenerable at any time
//!
//! ## Example
//!
//! ```rust,no_run
//! use medialog_core::analytics::DashboardEngine;
//! use medialog_core::{Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let engine = DashboardEngine::new(&config.analytics);
//! let dashboard = engine.generate(&db, 1, 30).expect("failed to compute dashboard");
//! println!("{}", dashboard);
//! ```

// Re-export commonly used items at the crate root
pub use cache::DashboardCache;
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod types;
