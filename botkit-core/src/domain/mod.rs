//! Core domain types
//!
//! This module contains the core domain structures used across Botkit crates.
//! They are shared between the HTTP client (wire shapes) and the runner
//! (execution state).

pub mod log;
pub mod resource;
pub mod run;
pub mod task;
