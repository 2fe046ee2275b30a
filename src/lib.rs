pub mod changes;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod host;
pub mod issues;
pub mod reconcile;
pub mod release;
pub mod telemetry;
pub mod ui;

pub use error::{ReleaseError, Result};
