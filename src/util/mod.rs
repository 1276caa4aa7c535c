//! Shared utilities for `diffharness`.
//!
//! - Content hashing (SHA256) of captured output
//! - Progress indicators for long runs

mod hash;
pub mod progress;

pub use hash::sha256_hex;
