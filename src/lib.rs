//! `diffharness`: differential correctness harness for optimizing-compiler
//! test fixtures.
//!
//! A run discovers fixtures under a root, executes each one under two or
//! more named execution configs, and compares stdout and exit codes. Every
//! fixture ends with exactly one verdict: PASS, MISMATCH, ERROR, TIMEOUT or
//! SKIPPED.

pub mod backend;
pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod fixture;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod report;
pub mod util;

pub use error::{ErrorCode, HarnessError, Result, StructuredError};
