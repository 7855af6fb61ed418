//! Unit tests for the strata CLI
//!
//! These tests use scripted layers and fake remote APIs and run fast without
//! external I/O.

mod architecture;
mod helpers;
mod layers;
mod property_tests;
