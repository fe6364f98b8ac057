use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Outcome of a single check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub test_name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    /// Turn the outcome of a check body into a result entry. Errors become failed entries.
    pub fn from_outcome(test_name: &str, outcome: anyhow::Result<Option<Value>>) -> Self {
        let result = match outcome {
            Ok(details) => Self {
                test_name: test_name.to_string(),
                passed: true,
                error: None,
                details,
                timestamp: Utc::now(),
            },
            Err(err) => Self {
                test_name: test_name.to_string(),
                passed: false,
                error: Some(format!("{:#}", err)),
                details: None,
                timestamp: Utc::now(),
            },
        };
        result.log();
        result
    }

    fn log(&self) {
        if self.passed {
            log::info!("PASS {}", self.test_name);
        } else {
            log::error!(
                "FAIL {}: {}",
                self.test_name,
                self.error.as_deref().unwrap_or("Unknown error")
            );
        }
        if let Some(details) = &self.details {
            log::debug!("   Details: {}", details);
        }
    }
}

/// Aggregated results of a full validation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub name: String,
    pub results: Vec<CheckResult>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    /// Percentage of passed checks, 0 when nothing ran.
    pub success_rate: f64,
    #[serde(rename = "executionTimeMs", serialize_with = "serialize_millis")]
    pub execution_time: Duration,
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl SuiteReport {
    pub fn new(name: &str, results: Vec<CheckResult>, execution_time: Duration) -> Self {
        let total_tests = results.len();
        let passed_tests = results.iter().filter(|result| result.passed).count();
        let success_rate = if total_tests == 0 {
            0.0
        } else {
            passed_tests as f64 / total_tests as f64 * 100.0
        };
        Self {
            name: name.to_string(),
            results,
            total_tests,
            passed_tests,
            failed_tests: total_tests - passed_tests,
            success_rate,
            execution_time,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed_tests == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|result| !result.passed)
    }

    pub fn result(&self, test_name: &str) -> Option<&CheckResult> {
        self.results
            .iter()
            .find(|result| result.test_name == test_name)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "{} - COMPLETE", self.name)?;
        writeln!(f, "{}", rule)?;
        writeln!(
            f,
            "Results: {}/{} tests passed",
            self.passed_tests, self.total_tests
        )?;
        writeln!(f, "Success Rate: {:.1}%", self.success_rate)?;
        writeln!(f, "Execution Time: {}ms", self.execution_time.as_millis())?;
        if self.failed_tests > 0 {
            writeln!(f)?;
            writeln!(f, "Failed Tests:")?;
            for failure in self.failures() {
                writeln!(
                    f,
                    "   - {}: {}",
                    failure.test_name,
                    failure.error.as_deref().unwrap_or("Unknown error")
                )?;
            }
        }
        write!(f, "{}", rule)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::anyhow;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    use super::{CheckResult, SuiteReport};

    #[test]
    fn test_from_outcome() {
        let passed = CheckResult::from_outcome("Layer Info Retrieval", Ok(Some(json!({"a": 1}))));
        assert!(passed.passed);
        assert_eq!(passed.error, None);
        assert_eq!(passed.details, Some(json!({"a": 1})));

        let failed = CheckResult::from_outcome(
            "Feature Fetching",
            Err(anyhow!("Assertion failed: Should return at least one feature")),
        );
        assert!(!failed.passed);
        assert_eq!(
            failed.error.as_deref(),
            Some("Assertion failed: Should return at least one feature")
        );
    }

    #[test]
    fn test_suite_counts() {
        let results = vec![
            CheckResult::from_outcome("a", Ok(None)),
            CheckResult::from_outcome("b", Ok(None)),
            CheckResult::from_outcome("c", Err(anyhow!("boom"))),
        ];
        let report = SuiteReport::new("Suite", results, Duration::from_millis(1500));
        assert_eq!(report.total_tests, 3);
        assert_eq!(report.passed_tests, 2);
        assert_eq!(report.failed_tests, 1);
        assert_abs_diff_eq!(report.success_rate, 66.666, epsilon = 1e-2);
        assert!(!report.all_passed());

        let summary = report.to_string();
        assert!(summary.contains("Results: 2/3 tests passed"));
        assert!(summary.contains("Success Rate: 66.7%"));
        assert!(summary.contains("   - c: boom"));

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["executionTimeMs"], json!(1500));
        assert_eq!(value["results"][2]["testName"], json!("c"));
    }

    #[test]
    fn test_empty_suite_has_zero_success_rate() {
        let report = SuiteReport::new("Suite", Vec::new(), Duration::ZERO);
        assert_eq!(report.success_rate, 0.0);
        assert!(report.all_passed());
        assert!(!report.to_string().contains("Failed Tests"));
    }
}
