//! Resource usage sampling and logging

mod logger;
mod sampler;

pub use logger::{ResourceLogger, ResourceReport, format_elapsed};
pub use sampler::{ProcSampler, ResourceSampler, Sampled};
