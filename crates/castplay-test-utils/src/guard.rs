// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! RAII guard used by the `logged_test` macros.

use std::path::{Path, PathBuf};

use crate::{TestLogError, TestLogger};

/// Owns a [`TestLogger`] for the duration of one test.
///
/// Dropping the guard without calling [`finish_success`](Self::finish_success)
/// (an early `?` return or a panic) records the test as failed.
pub struct TestLoggerGuard {
    logger: Option<TestLogger>,
    log_path: PathBuf,
}

impl TestLoggerGuard {
    pub fn new(test_name: &str) -> Result<Self, TestLogError> {
        let logger = TestLogger::new(test_name)?;
        let log_path = logger.log_path().to_path_buf();
        Ok(Self {
            logger: Some(logger),
            log_path,
        })
    }

    pub fn logger(&mut self) -> &mut TestLogger {
        self.logger.as_mut().expect("TestLoggerGuard logger already finalized")
    }

    pub fn finish_success(mut self) -> Result<PathBuf, TestLogError> {
        match self.logger.take() {
            Some(logger) => logger.finish_success(),
            None => Ok(self.log_path.clone()),
        }
    }

    pub fn finish_failure<S: AsRef<str>>(mut self, message: S) -> Result<PathBuf, TestLogError> {
        match self.logger.take() {
            Some(logger) => logger.finish_failure(message.as_ref()),
            None => Ok(self.log_path.clone()),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

impl Drop for TestLoggerGuard {
    fn drop(&mut self) {
        let Some(logger) = self.logger.take() else {
            return;
        };

        let reason = if std::thread::panicking() {
            "test panicked"
        } else {
            "test exited without reporting success"
        };

        if let Err(err) = logger.finish_failure(reason) {
            eprintln!(
                "failed to finalize TestLogger in Drop for {}: {}",
                self.log_path.display(),
                err
            );
        }
    }
}
