//! Assertion results recorded by scripts.

use serde::{Deserialize, Serialize};

/// One named assertion outcome, as recorded by `pm.test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name given by the script.
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Failure message; `None` for passing tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestResult {
    /// A passing result.
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: None,
        }
    }

    /// A failing result with its message.
    #[must_use]
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: Some(message.into()),
        }
    }
}

/// Pass/fail tally over a set of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    /// Number of results.
    pub total: usize,
    /// Number of passing results.
    pub passed: usize,
    /// Number of failing results.
    pub failed: usize,
}

impl TestSummary {
    /// Count the results in `results`.
    #[must_use]
    pub fn of(results: &[TestResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
        }
    }

    /// Check if all tests passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Get pass rate as percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summary() {
        let results = vec![
            TestResult::pass("status is 200"),
            TestResult::fail("has token", "expected undefined to be truthy"),
        ];
        let summary = TestSummary::of(&results);
        assert_eq!(
            summary,
            TestSummary {
                total: 2,
                passed: 1,
                failed: 1
            }
        );
        assert!(!summary.all_passed());
        assert!((summary.pass_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary_passes() {
        assert!(TestSummary::of(&[]).all_passed());
    }
}
