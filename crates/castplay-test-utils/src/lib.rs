// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! castplay test utilities
//!
//! Every test wrapped with [`logged_test`] or [`logged_tokio_test`] writes its
//! diagnostics to a unique file under `target/test-logs/<date>/`. A passing test
//! prints one line; a failing test prints the log path and size so the full
//! output can be inspected afterwards.

extern crate self as castplay_test_utils;

mod guard;
pub mod logging;
pub mod macros;

pub use castplay_test_utils_macros::{logged_test, logged_tokio_test};
pub use guard::TestLoggerGuard;
pub use logging::{TestLogError, TestLogger, create_unique_test_log};
