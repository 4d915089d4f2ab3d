use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Test-case category requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Positive,
    Negative,
    EdgeCase,
    Accessibility,
    Dynamic,
    Validation,
    Other,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Positive => "positive",
            TestType::Negative => "negative",
            TestType::EdgeCase => "edge_case",
            TestType::Accessibility => "accessibility",
            TestType::Dynamic => "dynamic",
            TestType::Validation => "validation",
            TestType::Other => "other",
        }
    }

    /// Heading used in Markdown reports, e.g. "Edge Case".
    pub fn title(&self) -> &'static str {
        match self {
            TestType::Positive => "Positive",
            TestType::Negative => "Negative",
            TestType::EdgeCase => "Edge Case",
            TestType::Accessibility => "Accessibility",
            TestType::Dynamic => "Dynamic",
            TestType::Validation => "Validation",
            TestType::Other => "Other",
        }
    }
}

impl Default for TestType {
    fn default() -> Self {
        TestType::Positive
    }
}

/// Model output is loose about case and separators ("Edge Case", "edge-case").
impl<'de> Deserialize<'de> for TestType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(match normalize_label(&raw).as_str() {
            "positive" => TestType::Positive,
            "negative" => TestType::Negative,
            "edge_case" | "edge" | "boundary" => TestType::EdgeCase,
            "accessibility" => TestType::Accessibility,
            "dynamic" => TestType::Dynamic,
            "validation" => TestType::Validation,
            _ => TestType::Other,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Unknown priorities read as medium.
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(match normalize_label(&raw).as_str() {
            "high" | "critical" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        })
    }
}

fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase().replace([' ', '-'], "_")
}

/// A single generated test case. Every field tolerates being absent from
/// model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Empty when the model left it out; see `FormTestSuite::number_missing_ids`.
    #[serde(default)]
    pub test_id: String,
    #[serde(default = "default_test_name")]
    pub test_name: String,
    #[serde(default)]
    pub test_type: TestType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub preconditions: String,
    #[serde(default)]
    pub test_steps: Vec<String>,
    #[serde(default)]
    pub test_data: Map<String, Value>,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default)]
    pub validation_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_interaction: Option<String>,
}

fn default_test_name() -> String {
    "Basic Test".to_string()
}

impl TestCase {
    /// `test_data` value as display text (strings unquoted).
    pub fn data_text(&self, key: &str) -> Option<String> {
        self.test_data.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Model answer for one form, enriched with the form's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTestSuite {
    #[serde(default = "default_form_type")]
    pub form_type: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub form_index: usize,
    #[serde(default)]
    pub form_action: Option<String>,
    #[serde(default)]
    pub form_method: Option<String>,
    #[serde(default)]
    pub form_id: Option<String>,
    #[serde(default)]
    pub form_class: Option<String>,
}

fn default_form_type() -> String {
    "Unknown form type".to_string()
}

impl FormTestSuite {
    pub fn new(form_type: impl Into<String>, test_cases: Vec<TestCase>) -> Self {
        Self {
            form_type: form_type.into(),
            test_cases,
            form_index: 0,
            form_action: None,
            form_method: None,
            form_id: None,
            form_class: None,
        }
    }

    /// File-name token for `form_type`: lower-case `[a-z0-9_]` only, runs of
    /// anything else collapsed to one `_`.
    pub fn form_type_slug(&self) -> String {
        let mut slug = String::with_capacity(self.form_type.len());
        for c in self.form_type.trim().to_lowercase().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c);
            } else if !slug.is_empty() && !slug.ends_with('_') {
                slug.push('_');
            }
        }
        let slug = slug.trim_end_matches('_');
        if slug.is_empty() {
            "form".to_string()
        } else {
            slug.to_string()
        }
    }

    /// Give cases without an id their position-based one (`TC003` for the
    /// third case).
    pub fn number_missing_ids(&mut self) {
        for (i, case) in self.test_cases.iter_mut().enumerate() {
            if case.test_id.trim().is_empty() {
                case.test_id = format!("TC{:03}", i + 1);
            }
        }
    }

    /// Test cases grouped by type, groups in first-seen order.
    pub fn grouped_by_type(&self) -> Vec<(TestType, Vec<&TestCase>)> {
        let mut groups: Vec<(TestType, Vec<&TestCase>)> = Vec::new();
        for case in &self.test_cases {
            match groups.iter_mut().find(|(t, _)| *t == case.test_type) {
                Some((_, cases)) => cases.push(case),
                None => groups.push((case.test_type, vec![case])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_labels_are_normalized() {
        let case: TestCase = serde_json::from_str(
            r#"{"test_type": "Edge Case", "priority": "HIGH", "test_steps": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(case.test_type, TestType::EdgeCase);
        assert_eq!(case.priority, Priority::High);
        assert_eq!(case.test_id, "");

        let case: TestCase =
            serde_json::from_str(r#"{"test_type": null, "priority": "p1"}"#).unwrap();
        assert_eq!(case.test_type, TestType::Other);
        assert_eq!(case.priority, Priority::Medium);
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let a = serde_json::from_str::<TestCase>(r#"{"test_type": "negative"}"#).unwrap();
        let b = serde_json::from_str::<TestCase>(r#"{"test_type": "positive"}"#).unwrap();
        let suite = FormTestSuite::new("Login Form", vec![a.clone(), b, a]);

        let groups = suite.grouped_by_type();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, TestType::Negative);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(suite.form_type_slug(), "login_form");
    }

    #[test]
    fn slugs_never_leave_the_directory() {
        let slug = |t: &str| FormTestSuite::new(t, Vec::new()).form_type_slug();
        assert_eq!(slug("Login/Signup Form"), "login_signup_form");
        assert_eq!(slug("../../etc/passwd"), "etc_passwd");
        assert_eq!(slug("C:\\Temp: \"x\""), "c_temp_x");
        assert_eq!(slug("Newsletter Signup"), "newsletter_signup");
        assert_eq!(slug(" ... "), "form");
    }

    #[test]
    fn missing_ids_follow_position() {
        let blank = serde_json::from_str::<TestCase>("{}").unwrap();
        let mut named = blank.clone();
        named.test_id = "LOGIN-7".into();
        let mut suite = FormTestSuite::new("Login Form", vec![blank.clone(), named, blank]);

        suite.number_missing_ids();
        let ids: Vec<&str> = suite.test_cases.iter().map(|c| c.test_id.as_str()).collect();
        assert_eq!(ids, vec!["TC001", "LOGIN-7", "TC003"]);
    }
}
