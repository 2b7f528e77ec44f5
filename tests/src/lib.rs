//! Shared harness for the cell monitor integration tests.

pub mod fixtures;
pub mod setup;
