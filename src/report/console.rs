use crate::report::report_model::RunSummary;

// ============================================================================
// Console reporter
// ============================================================================

/// Format a run summary for terminal output.
///
/// Produces output like:
/// ```text
/// === Test Run: test_cases/example.com ===
///
/// ✓ PASS  fixed_test_form_1_login_form_20250101_120000.py (4.2s)
/// ✗ FAIL  fixed_test_form_2_search_form_20250101_120000.py (90.0s)
///     [ERROR] timed out after 90s
///
/// === Results: 1 passed, 1 failed (2 total) in 94.2s, success rate 50.0% ===
/// ```
pub fn format_console_report(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Test Run: {} ===\n\n", summary.suite_name));

    for result in &summary.results {
        let marker = if result.passed {
            "\u{2713} PASS"
        } else {
            "\u{2717} FAIL"
        };

        out.push_str(&format!(
            "{}  {} ({:.1}s)\n",
            marker,
            result.name(),
            result.duration_ms as f64 / 1000.0
        ));

        if let Some(ref error) = result.error {
            out.push_str(&format!("    [ERROR] {}\n", error));
        } else if !result.passed {
            if let Some(line) = result.output.lines().rev().find(|l| !l.trim().is_empty()) {
                out.push_str(&format!("    [FAIL] {}\n", line.trim()));
            }
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed ({} total) in {:.1}s, success rate {:.1}% ===\n",
        summary.passed,
        summary.failed,
        summary.total,
        summary.duration_ms as f64 / 1000.0,
        summary.success_rate()
    ));

    out
}
