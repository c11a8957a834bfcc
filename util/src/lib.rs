//! Shared plumbing for the learnit workspace: configuration, filesystem
//! locations and tracing setup.

pub mod config;
pub mod logging;
pub mod paths;
pub mod test_helpers;
