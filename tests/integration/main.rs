//! Integration test suites

mod api_tests;
mod pipeline_tests;
