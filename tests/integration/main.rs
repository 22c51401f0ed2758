//! Integration tests for tickguard

mod backoff_test;
mod common;
mod config_test;
mod e2e_test;
mod scoring_test;
mod single_flight_test;
