//! Weekly timetable generation: places courses and their staff into a
//! day/hour grid under hard availability constraints, ranking placements by
//! soft preferences, and serves the result over a small HTTP API.

pub mod config;
pub mod constraints;
pub mod data;
pub mod demand;
pub mod engine;
pub mod error;
pub mod grid;
pub mod materialize;
pub mod server;
pub mod solver;
pub mod store;

pub use data::{Course, GenerationInput, GenerationOutput, Schedule, Staff, TimetableConfig, Weekday};
pub use engine::{generate, EngineOptions};
pub use error::{Diagnostic, GenerationError};
