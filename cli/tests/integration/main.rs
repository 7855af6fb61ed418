//! Integration tests for the strata CLI
//!
//! These run the compiled binary. None of them reach a remote API.
