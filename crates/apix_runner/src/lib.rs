//! Dispatches api test runs against a remote test-execution service, recovers their results
//! either immediately or by bounded polling, and aggregates them into one verdict.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod fetch;
pub mod hooks;
pub mod local;
pub mod outcome;
pub mod region;
pub mod runner;

#[cfg(test)]
mod test_utils;
