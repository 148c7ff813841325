//! # Review Gateway
//!
//! Reviewer decisions on REVIEWING versions, and the detail view a reviewer
//! decides from.

pub mod detail;
pub mod gateway;

pub use detail::ReviewDetailService;
pub use gateway::ReviewGateway;
