use crate::extract::form_model::FormRecord;
use crate::testcase::testcase_model::FormTestSuite;

pub const FORMS_HEADER: [&str; 10] = [
    "url",
    "form_index",
    "kind",
    "action",
    "method",
    "id",
    "inputs",
    "input_types",
    "placeholders",
    "buttons",
];

pub const TEST_CASES_HEADER: [&str; 9] = [
    "test_id",
    "test_name",
    "test_type",
    "priority",
    "preconditions",
    "test_steps",
    "test_data",
    "expected_result",
    "validation_points",
];

/// Quote a field when it contains a delimiter, quote or line break.
pub fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape_csv(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// One row per form record.
pub fn forms_csv(forms: &[FormRecord]) -> String {
    let mut out = row(&FORMS_HEADER);
    for form in forms {
        let names: Vec<&str> = form
            .inputs
            .iter()
            .map(|i| i.name.as_deref().or(i.id.as_deref()).unwrap_or(""))
            .collect();
        let types: Vec<&str> = form.inputs.iter().map(|i| i.effective_type()).collect();
        let placeholders: Vec<&str> = form
            .inputs
            .iter()
            .filter_map(|i| i.placeholder.as_deref())
            .collect();

        out.push_str(&row(&[
            form.url.clone(),
            form.form_index.to_string(),
            form.kind.as_str().to_string(),
            form.form_metadata.action.clone().unwrap_or_default(),
            form.form_metadata.method.clone().unwrap_or_default(),
            form.form_metadata.id.clone().unwrap_or_default(),
            names.join("; "),
            types.join("; "),
            placeholders.join("; "),
            form.button_labels().join("; "),
        ]));
    }
    out
}

/// One row per generated test case.
pub fn test_cases_csv(suite: &FormTestSuite) -> String {
    let mut out = row(&TEST_CASES_HEADER);
    for case in &suite.test_cases {
        out.push_str(&row(&[
            case.test_id.clone(),
            case.test_name.clone(),
            case.test_type.as_str().to_string(),
            case.priority.as_str().to_string(),
            case.preconditions.clone(),
            case.test_steps.join(" | "),
            serde_json::to_string(&case.test_data).unwrap_or_default(),
            case.expected_result.clone(),
            case.validation_points.join(" | "),
        ]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }
}
