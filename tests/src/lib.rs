//! Shared harness for the HTTP and store integration tests.

pub mod containers;
pub mod fixtures;
pub mod mocks;
