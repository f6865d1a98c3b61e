//! Gündem news dashboard library
//!
//! Exposes the TTL cache, the source clients and the aggregator for the binary and
//! for integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
