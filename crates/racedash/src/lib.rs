//! `racedash` - Race telemetry upload and query service
//!
//! This library provides the race-data schema, the single-slot store that
//! holds the latest upload, and the HTTP surface the dashboard talks to.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod laptime;
pub mod logging;
pub mod schema;
pub mod server;
pub mod store;
pub mod summary;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use schema::{load_document, validate, validate_slice, RaceDataDocument, ValidationError};
pub use server::{router, AppState};
pub use store::{MemoryStore, RaceDataRepository, StoredRecord};
