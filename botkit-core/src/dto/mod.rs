//! Data Transfer Objects for the orchestration service
//!
//! Request and response bodies exchanged with the orchestration API.
//! DTOs follow the service's camelCase JSON naming.

pub mod artifact;
pub mod auth;
pub mod task;
