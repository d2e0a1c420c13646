// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Assertions that record what they checked in the test log before panicking.

/// Assert a condition, logging the check and its outcome.
///
/// ```rust,ignore
/// logged_assert!(logger, queue.len() > 0, "queue should not be empty");
/// ```
#[macro_export]
macro_rules! logged_assert {
    ($logger:expr, $condition:expr) => {
        $crate::logged_assert!($logger, $condition, stringify!($condition))
    };
    ($logger:expr, $condition:expr, $message:expr) => {{
        $crate::macros::__log_or_warn(&mut *$logger, &format!("Asserting: {}", $message));
        if $condition {
            $crate::macros::__log_or_warn(&mut *$logger, "✓ Assertion passed");
        } else {
            $crate::macros::__log_or_warn(&mut *$logger, "✗ Assertion failed");
            panic!("Assertion failed: {}", $message);
        }
    }};
}

/// Assert equality, logging both expressions and the values on failure.
#[macro_export]
macro_rules! logged_assert_eq {
    ($logger:expr, $left:expr, $right:expr) => {{
        let left = &$left;
        let right = &$right;
        $crate::macros::__log_or_warn(
            &mut *$logger,
            &format!("Asserting equality: {} == {}", stringify!($left), stringify!($right)),
        );
        if left == right {
            $crate::macros::__log_or_warn(&mut *$logger, "✓ Equality assertion passed");
        } else {
            let message = format!(
                "assertion failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}`",
                left, right
            );
            $crate::macros::__log_or_warn(
                &mut *$logger,
                &format!("✗ Equality assertion failed: {}", message),
            );
            panic!("{}", message);
        }
    }};
}

#[doc(hidden)]
pub fn __log_or_warn(logger: &mut crate::TestLogger, message: &str) {
    if let Err(e) = logger.log(message) {
        eprintln!("Warning: Failed to write to test log: {}", e);
    }
}
