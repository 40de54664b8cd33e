//! Test support shared by the token library and both services
//!
//! Checked-in RSA fixtures, logging initialization and problem-details
//! assertions.

pub mod keys;
pub mod logging;
pub mod problem_details;
