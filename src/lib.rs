//! Perch - a remotely controlled bird song station
//!
//! Plays recorded bird songs by number, pauses and resumes them, and sings
//! a ten second tone whose pitch is derived from any text pattern.

pub mod config;
pub mod engine;
pub mod error;
pub mod server;
pub mod station;
pub mod synth;

pub use config::StationConfig;
pub use error::StationError;
pub use station::Station;
