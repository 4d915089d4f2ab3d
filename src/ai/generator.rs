use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::ai::classifier::classify_form;
use crate::ai::inference::TextInference;
use crate::error::CrawlError;
use crate::extract::extractor::truncate_chars;
use crate::extract::form_model::{FormRecord, InputRecord};
use crate::testcase::testcase_model::{FormTestSuite, Priority, TestCase, TestType};

/// HTML characters included in the prompt.
pub const PROMPT_SNIPPET_CHARS: usize = 300;
/// Raw response characters echoed when parsing fails.
pub const RAW_ECHO_CHARS: usize = 200;

const SPECIAL_CHARS_INPUT: &str = "<script>alert('x')</script> ' \" ; -- ©";

// ============================================================================
// TestCaseGenerator trait
// ============================================================================

pub trait TestCaseGenerator {
    fn generate(&self, form: &FormRecord) -> FormTestSuite;
}

/// Copy the form's identity onto a suite.
pub fn attach_form_metadata(suite: &mut FormTestSuite, form: &FormRecord) {
    suite.form_index = form.form_index;
    suite.form_action = form.form_metadata.action.clone();
    suite.form_method = form.form_metadata.method.clone();
    suite.form_id = form.form_metadata.id.clone();
    suite.form_class = form.form_metadata.class.clone();
}

// ============================================================================
// Value heuristics
// ============================================================================

/// Derive a sensible fill value from the input's label and type.
pub fn guess_value(label: &str, input_type: Option<&str>) -> String {
    let l = label.to_lowercase();

    if l.contains("email") {
        return "user@example.com".into();
    }
    if l.contains("password") {
        return "TestPass123!".into();
    }
    if l.contains("phone") || l.contains("tel") || l.contains("mobile") {
        return "555-0100".into();
    }
    if l.contains("url") || l.contains("website") {
        return "https://example.com".into();
    }
    if l.contains("zip") || l.contains("postal") {
        return "90210".into();
    }
    if l.contains("card") {
        return "4111111111111111".into();
    }
    if l.contains("cvv") || l.contains("cvc") {
        return "123".into();
    }
    if l.contains("username") || l.contains("user") {
        return "testuser".into();
    }
    if l.contains("name") {
        return "Jane Doe".into();
    }
    if l.contains("search") || l.contains("query") || l == "q" {
        return "test query".into();
    }
    if l.contains("message") || l.contains("comment") {
        return "This is a test message.".into();
    }
    if l.contains("date") {
        return "2025-01-15".into();
    }
    if l.contains("number") || l.contains("amount") || l.contains("quantity") {
        return "42".into();
    }

    if let Some(t) = input_type {
        match t {
            "email" => return "user@example.com".into(),
            "password" => return "TestPass123!".into(),
            "tel" => return "555-0100".into(),
            "url" => return "https://example.com".into(),
            "number" | "range" => return "42".into(),
            "date" => return "2025-01-15".into(),
            "textarea" => return "This is a test message.".into(),
            _ => {}
        }
    }

    "test".into()
}

/// An input value the field should reject, for typed or patterned inputs.
pub fn invalid_value(input: &InputRecord) -> Option<&'static str> {
    match input.effective_type() {
        "email" => Some("not-an-email"),
        "url" => Some("not a url"),
        "number" => Some("abc"),
        "tel" => Some("phone#!"),
        "date" => Some("99/99/9999"),
        _ if input.pattern.is_some() => Some("!!invalid!!"),
        _ => None,
    }
}

fn field_key(input: &InputRecord, position: usize) -> String {
    input
        .name
        .clone()
        .or_else(|| input.id.clone())
        .or_else(|| input.label().map(str::to_string))
        .unwrap_or_else(|| format!("field_{}", position + 1))
}

fn field_value(input: &InputRecord, key: &str) -> Value {
    match input.effective_type() {
        "checkbox" | "radio" => Value::Bool(true),
        t => Value::String(guess_value(input.label().unwrap_or(key), Some(t))),
    }
}

// ============================================================================
// RuleBasedGenerator: deterministic suites without a model
// ============================================================================

pub struct RuleBasedGenerator;

impl RuleBasedGenerator {
    fn case(name: String, test_type: TestType, priority: Priority) -> TestCase {
        TestCase {
            test_id: String::new(),
            test_name: name,
            test_type,
            priority,
            preconditions: "Form is loaded".to_string(),
            test_steps: Vec::new(),
            test_data: Map::new(),
            expected_result: String::new(),
            validation_points: Vec::new(),
            dynamic_behavior: None,
            widget_interaction: None,
        }
    }
}

impl TestCaseGenerator for RuleBasedGenerator {
    fn generate(&self, form: &FormRecord) -> FormTestSuite {
        let fields: Vec<(String, &InputRecord)> = form
            .fillable_inputs()
            .enumerate()
            .map(|(i, input)| (field_key(input, i), input))
            .collect();
        let submit = form
            .submit_triggers
            .first()
            .map(|t| t.display_label())
            .unwrap_or_else(|| "Submit".to_string());
        let open = format!("Navigate to {}", form.url);

        let valid: Map<String, Value> = fields
            .iter()
            .map(|(key, input)| (key.clone(), field_value(input, key)))
            .collect();

        let mut cases = Vec::new();

        // Positive
        let mut positive = Self::case(
            "Submit form with valid data".to_string(),
            TestType::Positive,
            Priority::High,
        );
        positive.test_steps.push(open.clone());
        for (key, value) in &valid {
            positive.test_steps.push(format!("Fill '{}' with {}", key, value));
        }
        positive.test_steps.push(format!("Click '{}'", submit));
        positive.test_data = valid.clone();
        positive.expected_result = "Form submits successfully".to_string();
        positive.validation_points = vec![
            "No validation errors displayed".to_string(),
            "Success message or navigation occurs".to_string(),
        ];
        cases.push(positive);

        // Negative: required fields left empty
        for (key, input) in fields.iter().filter(|(_, i)| i.required) {
            let mut case = Self::case(
                format!("Submit with required field '{}' empty", key),
                TestType::Negative,
                Priority::High,
            );
            let mut data = valid.clone();
            data.insert(key.clone(), Value::String(String::new()));
            case.test_steps = vec![
                open.clone(),
                "Fill every other field with valid data".to_string(),
                format!("Leave '{}' empty", key),
                format!("Click '{}'", submit),
            ];
            case.test_data = data;
            case.expected_result = format!("Form is not submitted; '{}' is flagged", key);
            case.validation_points = vec![format!(
                "Required indicator shown for '{}'",
                input.label().unwrap_or(key)
            )];
            cases.push(case);
        }

        // Negative: invalid formats
        for (key, input) in &fields {
            let Some(bad) = invalid_value(input) else {
                continue;
            };
            let mut case = Self::case(
                format!("Reject invalid value in '{}'", key),
                TestType::Negative,
                Priority::Medium,
            );
            let mut data = valid.clone();
            data.insert(key.clone(), Value::String(bad.to_string()));
            case.test_steps = vec![
                open.clone(),
                format!("Enter '{}' in '{}'", bad, key),
                format!("Click '{}'", submit),
            ];
            case.test_data = data;
            case.expected_result = "Validation error is displayed".to_string();
            case.validation_points = vec![format!("'{}' is marked invalid", key)];
            cases.push(case);
        }

        // Edge cases
        for (key, input) in &fields {
            let Some(max) = input
                .max_length
                .as_deref()
                .and_then(|m| m.trim().parse::<usize>().ok())
            else {
                continue;
            };
            let mut case = Self::case(
                format!("Enforce max length {} on '{}'", max, key),
                TestType::EdgeCase,
                Priority::Medium,
            );
            let mut data = Map::new();
            data.insert(key.clone(), Value::String("a".repeat(max + 1)));
            case.test_steps = vec![
                open.clone(),
                format!("Type {} characters into '{}'", max + 1, key),
            ];
            case.test_data = data;
            case.expected_result = format!("Field accepts at most {} characters", max);
            cases.push(case);
        }

        if let Some((key, _)) = fields
            .iter()
            .find(|(_, i)| matches!(i.effective_type(), "text" | "textarea" | "search"))
        {
            let mut case = Self::case(
                "Handle special characters".to_string(),
                TestType::EdgeCase,
                Priority::Low,
            );
            let mut data = Map::new();
            data.insert(key.clone(), Value::String(SPECIAL_CHARS_INPUT.to_string()));
            case.test_steps = vec![
                open.clone(),
                format!("Enter special characters into '{}'", key),
                format!("Click '{}'", submit),
            ];
            case.test_data = data;
            case.expected_result = "Input is escaped or rejected without breaking the page".to_string();
            cases.push(case);
        }

        // Accessibility
        let mut a11y = Self::case(
            "Fields are labelled and keyboard reachable".to_string(),
            TestType::Accessibility,
            Priority::Low,
        );
        a11y.test_steps = vec![
            open.clone(),
            "Tab through every field".to_string(),
            "Check each field exposes a label or aria-label".to_string(),
        ];
        a11y.expected_result = "Focus moves through all fields in order".to_string();
        a11y.validation_points = fields
            .iter()
            .filter(|(_, i)| i.aria_label.is_none() && i.placeholder.is_none())
            .map(|(key, _)| format!("'{}' has no accessible label", key))
            .collect();
        cases.push(a11y);

        // Dynamic behaviour
        for element in &form.dynamic_elements {
            let what = element
                .text
                .clone()
                .or_else(|| element.id.clone())
                .unwrap_or_else(|| "dynamic element".to_string());
            let mut case = Self::case(
                format!("Toggle '{}'", what),
                TestType::Dynamic,
                Priority::Medium,
            );
            case.test_steps = vec![open.clone(), format!("Click '{}'", what)];
            case.expected_result = "Related content expands or collapses".to_string();
            case.dynamic_behavior = Some(match &element.aria_expanded {
                Some(state) => format!("aria-expanded changes from '{}'", state),
                None => "Visible content changes".to_string(),
            });
            cases.push(case);
        }

        // Validation messages
        for element in &form.validation_elements {
            let what = element
                .id
                .clone()
                .or_else(|| element.class.clone())
                .unwrap_or_else(|| "validation message".to_string());
            let mut case = Self::case(
                format!("Validation message '{}' appears on bad input", what),
                TestType::Validation,
                Priority::Medium,
            );
            case.test_steps = vec![
                open.clone(),
                format!("Click '{}' with empty fields", submit),
            ];
            case.expected_result = format!("'{}' becomes visible", what);
            if let Some(text) = &element.text {
                case.validation_points.push(format!("Message reads '{}'", text));
            }
            cases.push(case);
        }

        // Custom widgets
        for widget in &form.custom_widgets {
            let kind = widget.widget_type.as_deref().unwrap_or("widget");
            let what = widget
                .name
                .clone()
                .or_else(|| widget.id.clone())
                .unwrap_or_else(|| kind.to_string());
            let mut case = Self::case(
                format!("Interact with {} input '{}'", kind, what),
                TestType::Positive,
                Priority::Low,
            );
            case.test_steps = vec![open.clone(), format!("Operate '{}'", what)];
            case.expected_result = "Widget accepts a valid value".to_string();
            let constraints = widget
                .attributes
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            case.widget_interaction = Some(if constraints.is_empty() {
                format!("Standard {} behaviour", kind)
            } else {
                format!("Respects {}", constraints)
            });
            cases.push(case);
        }

        for (i, case) in cases.iter_mut().enumerate() {
            case.test_id = format!("TC{:03}", i + 1);
        }

        let mut suite = FormTestSuite::new(classify_form(form).display_name(), cases);
        attach_form_metadata(&mut suite, form);
        suite
    }
}

// ============================================================================
// LlmTestCaseGenerator
// ============================================================================

pub struct LlmTestCaseGenerator {
    backend: Box<dyn TextInference>,
}

impl LlmTestCaseGenerator {
    pub fn new(backend: Box<dyn TextInference>) -> Self {
        Self { backend }
    }

    pub fn build_prompt(form: &FormRecord) -> String {
        format!(
            r##"Based on the following comprehensive form data, generate comprehensive functional test cases in JSON format.
Include test cases for valid inputs, invalid inputs, edge cases, accessibility testing, and dynamic behavior.

Form Data:
URL: {url}
Form ID: {source_id}
Element Type: {tag}
Form Metadata: {metadata}
Inputs: {inputs}
Submit Triggers: {triggers}
Validation Elements: {validation}
Custom Widgets: {widgets}
Dynamic Elements: {dynamic}
HTML Snippet: {snippet}

Generate test cases in this JSON structure:
{{
    "form_type": "description of form type",
    "test_cases": [
        {{
            "test_id": "TC001",
            "test_name": "Descriptive test name",
            "test_type": "positive|negative|edge_case|accessibility|dynamic|validation",
            "priority": "high|medium|low",
            "preconditions": "What needs to be set up",
            "test_steps": ["Step 1", "Step 2", "Step 3"],
            "test_data": {{"field_name": "value"}},
            "expected_result": "What should happen",
            "validation_points": ["Point 1", "Point 2"],
            "dynamic_behavior": "Description of dynamic changes",
            "widget_interaction": "How custom widgets should behave"
        }}
    ]
}}

Focus on:
1. Required field validation
2. Input format validation (email, phone, URL patterns)
3. Boundary values and maximum lengths
4. Submit trigger behavior and error messages
5. Custom widget and dynamic element interaction
6. Keyboard navigation and labels

Return ONLY valid JSON, no additional text."##,
            url = form.url,
            source_id = form.source_id,
            tag = form.element_tag,
            metadata = json(&form.form_metadata),
            inputs = json(&form.inputs),
            triggers = json(&form.submit_triggers),
            validation = json(&form.validation_elements),
            widgets = json(&form.custom_widgets),
            dynamic = json(&form.dynamic_elements),
            snippet = truncate_chars(&form.html_snippet, PROMPT_SNIPPET_CHARS),
        )
    }
}

/// Compact JSON for a prompt fragment.
fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

impl TestCaseGenerator for LlmTestCaseGenerator {
    fn generate(&self, form: &FormRecord) -> FormTestSuite {
        let prompt = Self::build_prompt(form);

        let mut suite = match self.backend.infer_text(&prompt) {
            Ok(raw) => match parse_suite_response(&raw) {
                Ok(suite) => suite,
                Err(e) => {
                    warn!("{}", e);
                    warn!("raw response: {}...", truncate_chars(&raw, RAW_ECHO_CHARS));
                    fallback_suite()
                }
            },
            Err(e) => {
                warn!("test-case generation failed, using rule-based cases: {}", e);
                return RuleBasedGenerator.generate(form);
            }
        };

        info!(
            form_index = form.form_index,
            cases = suite.test_cases.len(),
            "generated test cases for {}",
            suite.form_type
        );
        attach_form_metadata(&mut suite, form);
        suite
    }
}

// ============================================================================
// Response parsing
// ============================================================================

/// Remove a surrounding Markdown code fence (with or without a `json` tag).
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

pub fn parse_suite_response(raw: &str) -> Result<FormTestSuite, CrawlError> {
    let mut suite: FormTestSuite =
        serde_json::from_str(strip_code_fences(raw)).map_err(|source| CrawlError::JsonParse {
            context: "model test-case response".to_string(),
            source,
        })?;
    suite.number_missing_ids();
    Ok(suite)
}

/// Single-case suite used when the model answer cannot be parsed.
pub fn fallback_suite() -> FormTestSuite {
    let case = TestCase {
        test_id: "TC001".to_string(),
        test_name: "Basic form validation".to_string(),
        test_type: TestType::Positive,
        priority: Priority::High,
        preconditions: "Form is loaded".to_string(),
        test_steps: vec!["Fill required fields".to_string(), "Submit form".to_string()],
        test_data: Map::new(),
        expected_result: "Form submits successfully".to_string(),
        validation_points: vec![
            "No errors displayed".to_string(),
            "Success message shown".to_string(),
        ],
        dynamic_behavior: Some("No dynamic changes expected".to_string()),
        widget_interaction: Some("Standard form behavior".to_string()),
    };
    FormTestSuite::new("Unknown form type", vec![case])
}
