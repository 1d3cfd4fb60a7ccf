//! Testing utilities for stageline pipelines.
//!
//! This module provides:
//! - Configuration and graph fixtures
//! - Assertions over grant sequences

mod assertions;
mod fixtures;

pub use assertions::{assert_grant, assert_grant_count, assert_no_duplicate_grants, assert_no_grant};
pub use fixtures::{build_and_scan, test_config, CollectingSink, TEST_ACCOUNT_ID, TEST_BUCKET, TEST_REGION};
