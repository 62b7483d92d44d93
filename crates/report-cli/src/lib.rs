//! CLI library components for report-studio.

pub mod cli;
pub mod commands;
pub mod fixtures;
pub mod logging;
pub mod summary;
