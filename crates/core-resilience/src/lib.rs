//! tdoc-harvest Core Resilience: pure-logic retry primitives
//!
//! # Overview
//!
//! This crate provides the retry building blocks used by the FTP pipeline:
//!
//! - **Retry Policy**: bounded attempt budget with a fixed or exponential pause
//! - **Transient classification**: a trait the caller's error type implements
//!   so the executor knows which failures are worth repeating
//! - **Retry Error**: distinguishes "budget exhausted" from "permanent failure"
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - Network protocols (FTP, HTTP)
//! - File systems
//! - Application-specific error types
//!
//! Everything is blocking and single-threaded; the executor sleeps on the
//! calling thread between attempts.
//!
//! ```text
//!   attempt 1 ──fail(transient)──► wait ──► attempt 2 ──fail──► wait ──► attempt N
//!       │                                       │                         │
//!       └──ok──► value          fail(permanent)─┴──► Permanent   exhausted┴──► Exhausted
//! ```

pub mod error;
pub mod retry;

pub use error::RetryError;
pub use retry::{Backoff, RetryPolicy, Transient};
