use form_crawler::report::{
    console::format_console_report,
    junit::{escape_xml, generate_junit_xml},
    report_model::{RunSummary, ScriptResult},
};

// ============================================================================
// Helper builders
// ============================================================================

fn passing(script: &str, duration_ms: u128) -> ScriptResult {
    ScriptResult {
        script: script.to_string(),
        passed: true,
        exit_code: Some(0),
        duration_ms,
        timed_out: false,
        output: "1 passed".to_string(),
        error: None,
    }
}

fn failing(script: &str, duration_ms: u128) -> ScriptResult {
    ScriptResult {
        script: script.to_string(),
        passed: false,
        exit_code: Some(1),
        duration_ms,
        timed_out: false,
        output: "E   AssertionError: Login button not found\n1 failed\n\n".to_string(),
        error: None,
    }
}

fn timed_out(script: &str) -> ScriptResult {
    ScriptResult {
        script: script.to_string(),
        passed: false,
        exit_code: None,
        duration_ms: 90_000,
        timed_out: true,
        output: String::new(),
        error: Some("timed out after 90s".to_string()),
    }
}

fn mixed_summary() -> RunSummary {
    RunSummary::from_results(
        "test_cases/example.com",
        vec![
            passing("test_cases/example.com/test_scripts/test_form_1.py", 4_200),
            failing("test_cases/example.com/test_scripts/test_form_2.py", 8_000),
            timed_out("test_cases/example.com/test_scripts/test_form_3.py"),
        ],
    )
}

// ============================================================================
// RunSummary
// ============================================================================

#[test]
fn summary_counts_results() {
    let summary = mixed_summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.duration_ms, 102_200);
    assert!(!summary.all_passed());
    assert!((summary.success_rate() - 33.333).abs() < 0.01);
}

#[test]
fn empty_run_is_a_pass_with_zero_rate() {
    let summary = RunSummary::from_results("empty", Vec::new());
    assert!(summary.all_passed());
    assert_eq!(summary.success_rate(), 0.0);
}

#[test]
fn timing_overrides_summed_durations() {
    let summary = mixed_summary().with_timing(
        "2025-01-15T10:30:00+00:00".to_string(),
        "2025-01-15T10:32:00+00:00".to_string(),
        120_000,
    );
    assert_eq!(summary.duration_ms, 120_000);
    assert_eq!(summary.started_at, "2025-01-15T10:30:00+00:00");
}

#[test]
fn script_name_is_the_file_name() {
    assert_eq!(passing("a/b/test_x.py", 1).name(), "test_x.py");
    assert_eq!(passing(r"C:\out\test_y.py", 1).name(), "test_y.py");
    assert_eq!(passing("test_z.py", 1).name(), "test_z.py");
}

#[test]
fn results_json_omits_absent_fields() {
    let value = serde_json::to_value(timed_out("test_form_3.py")).unwrap();
    assert!(value.get("exit_code").is_none());
    assert_eq!(value["timed_out"], true);

    let value = serde_json::to_value(passing("test_form_1.py", 10)).unwrap();
    assert!(value.get("error").is_none());
    assert_eq!(value["exit_code"], 0);
}

// ============================================================================
// Console reporter
// ============================================================================

#[test]
fn console_report_lists_every_script() {
    let report = format_console_report(&mixed_summary());

    assert!(report.starts_with("=== Test Run: test_cases/example.com ===\n"));
    assert!(report.contains("\u{2713} PASS  test_form_1.py (4.2s)"));
    assert!(report.contains("\u{2717} FAIL  test_form_2.py (8.0s)"));
    assert!(report.contains("    [FAIL] 1 failed"));
    assert!(report.contains("    [ERROR] timed out after 90s"));
    assert!(report.contains(
        "=== Results: 1 passed, 2 failed (3 total) in 102.2s, success rate 33.3% ==="
    ));
}

// ============================================================================
// JUnit reporter
// ============================================================================

#[test]
fn junit_marks_failures_and_timeouts() {
    let xml = generate_junit_xml(&mixed_summary());

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains(
        "<testsuite name=\"test_cases/example.com\" tests=\"3\" failures=\"2\" time=\"102.200\">"
    ));
    assert!(xml.contains(
        "<testcase name=\"test_form_1.py\" classname=\"form-crawler\" time=\"4.200\" />"
    ));
    assert!(xml.contains("<failure message=\"exit code 1\" type=\"ScriptFailure\">"));
    assert!(xml.contains("<failure message=\"timed out after 90s\" type=\"Timeout\">"));
    assert_eq!(xml.matches("<testcase ").count(), 3);
    assert!(xml.trim_end().ends_with("</testsuite>"));
}

#[test]
fn junit_escapes_output() {
    let mut result = failing("test_form_<1>.py", 10);
    result.output = "expected \"a\" & 'b'".to_string();
    let xml = generate_junit_xml(&RunSummary::from_results("s", vec![result]));
    assert!(xml.contains("name=\"test_form_&lt;1&gt;.py\""));
    assert!(xml.contains("expected &quot;a&quot; &amp; &apos;b&apos;"));
}

#[test]
fn xml_escaping() {
    assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
    assert_eq!(escape_xml("plain"), "plain");
}
