//! livepolicy core: runtime-agnostic primitives shared by the server and tooling.
//!
//! This crate defines the error surface, tenant reference/config validation,
//! and the rule bundle document with its evaluator. It intentionally carries
//! no transport or runtime dependencies so the same rules can be checked in
//! tests, CLIs, and the server alike.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `LivePolicyError`/`Result` so a bad
//! bundle or a malformed admin form never brings the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod bundle;
pub mod error;
pub mod tenant;

/// Shared result type.
pub use error::{LivePolicyError, Result};
