use crate::report::report_model::RunSummary;

// ============================================================================
// JUnit XML reporter
// ============================================================================

/// Generate a JUnit XML report for CI systems.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <testsuite name="..." tests="2" failures="1" time="12.345">
///   <testcase name="test_form_1.py" classname="form-crawler" time="4.200" />
///   <testcase name="test_form_2.py" classname="form-crawler" time="8.145">
///     <failure message="exit code 1" type="ScriptFailure">...</failure>
///   </testcase>
/// </testsuite>
/// ```
pub fn generate_junit_xml(summary: &RunSummary) -> String {
    let mut cases = String::new();
    for result in &summary.results {
        let time = result.duration_ms as f64 / 1000.0;
        if result.passed {
            cases.push_str(&format!(
                "  <testcase name=\"{}\" classname=\"form-crawler\" time=\"{:.3}\" />\n",
                escape_xml(result.name()),
                time
            ));
        } else {
            let message = match (&result.error, result.exit_code) {
                (Some(e), _) => e.clone(),
                (None, Some(code)) => format!("exit code {}", code),
                (None, None) => "script failed".to_string(),
            };
            let failure_type = if result.timed_out {
                "Timeout"
            } else {
                "ScriptFailure"
            };

            cases.push_str(&format!(
                "  <testcase name=\"{name}\" classname=\"form-crawler\" time=\"{time:.3}\">\n    <failure message=\"{message}\" type=\"{kind}\">{body}</failure>\n  </testcase>\n",
                name = escape_xml(result.name()),
                time = time,
                message = escape_xml(&message),
                kind = failure_type,
                body = escape_xml(&result.output),
            ));
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuite name=\"{name}\" tests=\"{tests}\" failures=\"{failures}\" time=\"{time:.3}\">\n{cases}</testsuite>\n",
        name = escape_xml(&summary.suite_name),
        tests = summary.total,
        failures = summary.failed,
        time = summary.duration_ms as f64 / 1000.0,
        cases = cases,
    )
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
