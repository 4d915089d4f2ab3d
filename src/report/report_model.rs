use serde::{Deserialize, Serialize};

// ============================================================================
// Script results and run summary
// ============================================================================

/// Outcome of running one generated test script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptResult {
    /// Script path as run (the hardened copy when one was written)
    pub script: String,

    pub passed: bool,

    /// Process exit code; `None` when killed or never started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    pub duration_ms: u128,

    #[serde(default)]
    pub timed_out: bool,

    /// Tail of the captured output
    #[serde(default)]
    pub output: String,

    /// Spawn failure or timeout description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptResult {
    /// File name of the script, for display.
    pub fn name(&self) -> &str {
        self.script
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.script)
    }
}

/// Aggregated report for one runner invocation.
///
/// Built from a `Vec<ScriptResult>` via `from_results()`. Consumed by the
/// console and JUnit reporters and saved as the results JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub suite_name: String,

    pub total: usize,

    pub passed: usize,

    pub failed: usize,

    pub duration_ms: u128,

    /// RFC 3339 timestamps
    pub started_at: String,
    pub finished_at: String,

    pub results: Vec<ScriptResult>,
}

impl RunSummary {
    pub fn from_results(suite_name: &str, results: Vec<ScriptResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            suite_name: suite_name.to_string(),
            total,
            passed,
            failed: total - passed,
            duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            started_at: String::new(),
            finished_at: String::new(),
            results,
        }
    }

    pub fn with_timing(mut self, started_at: String, finished_at: String, duration_ms: u128) -> Self {
        self.started_at = started_at;
        self.finished_at = finished_at;
        self.duration_ms = duration_ms;
        self
    }

    /// Passed share in percent; 0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 * 100.0 / self.total as f64
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
