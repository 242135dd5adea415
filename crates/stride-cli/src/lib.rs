//! Replay harness library.
//!
//! This crate provides the CLI interface for driving recording sessions.

mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
