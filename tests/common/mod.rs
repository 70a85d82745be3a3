//! Common test utilities for audiofeed integration tests

#[allow(dead_code)]
pub mod fakes;

pub use fakes::*;
