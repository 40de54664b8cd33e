//! HTTP plumbing shared by the auth and resource services.

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod telemetry;
pub mod trace_ctx;

pub use error::{AppError, ProblemDetails};
