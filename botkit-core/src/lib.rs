//! Botkit Core
//!
//! Core types and abstractions for the Botkit RPA runner.
//!
//! This crate contains:
//! - Domain types: run context, remote task records, resource samples, log records
//! - DTOs: Data transfer objects for the orchestration service API

pub mod domain;
pub mod dto;
