#![forbid(unsafe_code)]

//! Core domain model and scheduling logic for the medlog system.
//!
//! This crate provides:
//! - Domain types (medicines, dosages, log entries, next doses)
//! - Medicine registry with approximate-name lookup
//! - Append-only dose log
//! - Next-dose scheduling with daily caps
//! - Log filtering for display

pub mod types;
pub mod error;
pub mod codec;
pub mod config;
pub mod logging;
pub mod fuzzy;
pub mod registry;
pub mod dose_log;
pub mod schedule;
pub mod view;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use registry::{storage_key, MedRegistry, NearMatch};
pub use dose_log::{log_dose, DoseLog, ReadPolicy};
pub use schedule::{next_dose, next_dose_at};
pub use view::{filter_entries, print_filtered};
