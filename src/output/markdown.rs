use std::fmt::Write as _;

use crate::testcase::testcase_model::FormTestSuite;

// ============================================================================
// Markdown reports
// ============================================================================

/// Per-form report. Test cases are grouped by type in first-seen order.
pub fn form_report(suite: &FormTestSuite, url: &str, generated_at: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Test Case Report for Form {} - {}\n", suite.form_index, url);
    let _ = writeln!(out, "**Generated on:** {}", generated_at);
    let _ = writeln!(out, "**Form Type:** {}", suite.form_type);
    let _ = writeln!(out, "**Total Test Cases:** {}\n", suite.test_cases.len());

    out.push_str("## Form Details\n\n");
    let _ = writeln!(out, "- **Form ID:** {}", suite.form_id.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "- **Action:** {}", suite.form_action.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "- **Method:** {}", suite.form_method.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "- **Class:** {}\n", suite.form_class.as_deref().unwrap_or("N/A"));

    out.push_str("## Test Case Summary\n");

    for (test_type, cases) in suite.grouped_by_type() {
        let _ = writeln!(out, "\n### {} Test Cases ({})\n", test_type.title(), cases.len());
        for case in cases {
            let _ = writeln!(out, "**{} - {}**", case.test_id, case.test_name);
            let _ = writeln!(out, "- Priority: {}", case.priority.as_str());
            let _ = writeln!(out, "- Steps: {}", case.test_steps.join(" | "));
            let _ = writeln!(out, "- Expected: {}", case.expected_result);
            if let Some(dynamic) = case.dynamic_behavior.as_deref().filter(|s| !s.is_empty()) {
                let _ = writeln!(out, "- Dynamic Behavior: {}", dynamic);
            }
            if let Some(widget) = case.widget_interaction.as_deref().filter(|s| !s.is_empty()) {
                let _ = writeln!(out, "- Widget Interaction: {}", widget);
            }
            out.push('\n');
        }
    }

    out
}

/// Index README for a domain directory.
pub fn readme(dir_name: &str, url: &str, suites: &[FormTestSuite], generated_at: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Test Cases for {}\n", url);
    let _ = writeln!(out, "Generated on: {}\n", generated_at);

    out.push_str("## Directory Structure\n\n```\n");
    let _ = writeln!(out, "{}/", dir_name);
    out.push_str("├── json/           # JSON format test cases\n");
    out.push_str("├── csv/            # CSV format test cases\n");
    out.push_str("├── reports/        # Markdown reports\n");
    out.push_str("├── test_scripts/   # Python test scripts\n");
    out.push_str("└── test_data/      # Extracted form records\n");
    out.push_str("```\n\n");

    let total: usize = suites.iter().map(|s| s.test_cases.len()).sum();
    out.push_str("## Summary\n\n");
    let _ = writeln!(out, "- **Total Forms Found:** {}", suites.len());
    let _ = writeln!(out, "- **Total Test Cases:** {}\n", total);

    out.push_str("## Forms Analyzed\n");
    for suite in suites {
        let slug = suite.form_type_slug();
        let n = suite.form_index;
        let _ = writeln!(out, "\n### Form {}: {}", n, suite.form_type);
        let _ = writeln!(out, "- **Test Cases:** {}", suite.test_cases.len());
        out.push_str("- **Files:**\n");
        let _ = writeln!(out, "  - JSON: `json/form_{}_{}_*.json`", n, slug);
        let _ = writeln!(out, "  - CSV: `csv/form_{}_{}_*.csv`", n, slug);
        let _ = writeln!(out, "  - Report: `reports/form_{}_{}_*.md`", n, slug);
        let _ = writeln!(out, "  - Script: `test_scripts/test_form_{}_{}_*.py`", n, slug);
    }

    out.push_str(
        "\n## Usage\n\n\
         1. **View Reports**: Check the `reports/` directory for detailed test case documentation\n\
         2. **Import Test Cases**: Use JSON or CSV files to import into your test management system\n\
         3. **Run Tests**: `form-crawler run --dir <dir>` or pytest directly on `test_scripts/`\n\
         4. **Customize**: Adjust the generated scripts to your own selectors and fixtures\n\
         \n## Test Categories\n\n\
         - **Positive Tests**: Valid input scenarios\n\
         - **Negative Tests**: Invalid input scenarios\n\
         - **Edge Cases**: Boundary conditions and special characters\n\
         - **Accessibility Tests**: Screen reader and keyboard navigation tests\n\
         - **Dynamic Tests**: Content revealed or changed by interaction\n\
         - **Validation Tests**: Error and status messages\n",
    );

    out
}
