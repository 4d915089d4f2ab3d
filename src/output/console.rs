use crate::ai::classifier::classify_form;
use crate::extract::form_model::FormRecord;
use crate::testcase::testcase_model::FormTestSuite;

/// Characters of the expected result shown before truncation.
pub const EXPECTED_RESULT_CHARS: usize = 50;

// ============================================================================
// Plain-text tables
// ============================================================================

/// Render an aligned text table.
///
/// ```text
/// Generated Test Cases for https://example.com
/// Test ID | Test Name        | Type
/// --------+------------------+---------
/// TC001   | Valid submission | positive
/// ```
pub fn render_table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let fmt_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    if !title.is_empty() {
        out.push_str(title);
        out.push('\n');
    }
    out.push_str(&fmt_row(headers.to_vec()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in rows {
        out.push_str(&fmt_row(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

/// Truncate to `max` chars, appending `...` when something was cut.
pub fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

fn or_dash(v: Option<&str>) -> String {
    v.unwrap_or("-").to_string()
}

// ============================================================================
// Discovered forms
// ============================================================================

pub fn format_forms(forms: &[FormRecord]) -> String {
    let mut out = String::new();

    for form in forms {
        out.push_str(&format!(
            "\n=== Form {} ({}, {}) - {} ===\n",
            form.form_index,
            form.kind.as_str(),
            form.source_id,
            classify_form(form).display_name()
        ));
        let meta = &form.form_metadata;
        out.push_str(&format!(
            "action: {}  method: {}  id: {}  class: {}\n",
            or_dash(meta.action.as_deref()),
            or_dash(meta.method.as_deref()),
            or_dash(meta.id.as_deref()),
            or_dash(meta.class.as_deref()),
        ));

        if !form.inputs.is_empty() {
            let rows: Vec<Vec<String>> = form
                .inputs
                .iter()
                .map(|i| {
                    vec![
                        or_dash(i.name.as_deref()),
                        i.effective_type().to_string(),
                        or_dash(i.id.as_deref()),
                        if i.required { "yes" } else { "no" }.to_string(),
                        or_dash(i.data_testid.as_deref().or(i.data_cy.as_deref())),
                    ]
                })
                .collect();
            out.push_str(&render_table(
                "Inputs",
                &["Name", "Type", "ID", "Required", "Test ID"],
                &rows,
            ));
        }

        if !form.submit_triggers.is_empty() {
            let rows: Vec<Vec<String>> = form
                .submit_triggers
                .iter()
                .map(|t| {
                    vec![
                        t.display_label(),
                        or_dash(t.trigger_type.as_deref()),
                        or_dash(t.id.as_deref()),
                        or_dash(t.role.as_deref()),
                    ]
                })
                .collect();
            out.push_str(&render_table(
                "Submit triggers",
                &["Text", "Type", "ID", "Role"],
                &rows,
            ));
        }

        let extras = [
            ("validation elements", form.validation_elements.len()),
            ("custom widgets", form.custom_widgets.len()),
            ("dynamic elements", form.dynamic_elements.len()),
        ];
        let extras: Vec<String> = extras
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(label, n)| format!("{} {}", n, label))
            .collect();
        if !extras.is_empty() {
            out.push_str(&format!("also: {}\n", extras.join(", ")));
        }
    }

    out
}

// ============================================================================
// Generated test cases
// ============================================================================

pub fn format_test_cases(suite: &FormTestSuite, url: &str) -> String {
    let rows: Vec<Vec<String>> = suite
        .test_cases
        .iter()
        .map(|c| {
            vec![
                c.test_id.clone(),
                c.test_name.clone(),
                c.test_type.as_str().to_string(),
                c.priority.as_str().to_string(),
                ellipsize(&c.expected_result, EXPECTED_RESULT_CHARS),
            ]
        })
        .collect();

    render_table(
        &format!("Generated Test Cases for {} (form {}: {})", url, suite.form_index, suite.form_type),
        &["Test ID", "Test Name", "Type", "Priority", "Expected Result"],
        &rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipsize_only_long_text() {
        assert_eq!(ellipsize("short", 50), "short");
        let long = "x".repeat(60);
        let cut = ellipsize(&long, 50);
        assert_eq!(cut.len(), 53);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn table_columns_align() {
        let table = render_table(
            "",
            &["A", "Bee"],
            &[vec!["long cell".into(), "x".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "A         | Bee");
        assert_eq!(lines[1], "----------+----");
        assert_eq!(lines[2], "long cell | x");
    }
}
