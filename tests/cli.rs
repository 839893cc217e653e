//! CLI smoke tests for the `mattermost-bridge` binary.

#[path = "cli/cli_test.rs"]
mod cli_test;
