//! Command implementations for the nct-graph CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod build;
pub mod inspect;
