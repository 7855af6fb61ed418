//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! remote provider CLI, HTTP probes, git checkouts, and local files.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod aws;
pub mod command_runner;
pub mod config;
pub mod health;
pub mod repository;
pub mod state;
