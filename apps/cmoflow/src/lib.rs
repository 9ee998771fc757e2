//! # cmoflow
//!
//! Library half of the cmoflow binary: CLI, file intake, configuration and
//! the clock driver. Split out so integration tests can reach it.

pub mod cli;
pub mod config;
pub mod driver;
pub mod intake;
