//! Command-line interface for the punch time tracker.

pub mod commands;

mod cli;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
