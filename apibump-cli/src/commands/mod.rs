//! Command implementations for the apibump CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod analysers;
pub mod decide;
