//! Builders for test and development configurations.

pub mod config;
