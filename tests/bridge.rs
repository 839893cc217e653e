//! Integration tests for the bridge core.

#[path = "bridge/pipeline_test.rs"]
mod pipeline_test;
