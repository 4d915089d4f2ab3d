use std::cell::Cell;
use std::time::Duration;

use form_crawler::{
    ai::{
        classifier::{FormClassifier, FormType, HeuristicClassifier, LlmClassifier, classify_form},
        generator::{
            LlmTestCaseGenerator, RuleBasedGenerator, TestCaseGenerator, fallback_suite,
            parse_suite_response,
        },
        inference::{
            MockTextInference, OllamaBackend, OpenAiBackend, RetryingInference, TextInference,
        },
    },
    cli::commands::generate_suites,
    crawl::crawler::{CrawlOptions, crawl_page},
    error::CrawlError,
    extract::{
        extractor::{ExtractOptions, extract_forms},
        form_model::FormRecord,
    },
    testcase::testcase_model::{Priority, TestType},
};
use serde_json::{Value, json};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

mod common;
use crate::common::{driver::ScriptedDriver, utils::fixture};

const URL: &str = "https://example.com/form";

fn forms(name: &str) -> Vec<FormRecord> {
    extract_forms(&fixture(name), URL, &ExtractOptions::default()).unwrap()
}

fn spa_forms() -> Vec<FormRecord> {
    let options = ExtractOptions {
        spa: true,
        ..ExtractOptions::default()
    };
    extract_forms(&fixture("spa.html"), URL, &options).unwrap()
}

fn inline_form(body: &str) -> FormRecord {
    let html = format!("<html><body><form>{}</form></body></html>", body);
    extract_forms(&html, URL, &ExtractOptions::default())
        .unwrap()
        .remove(0)
}

struct FailingInference;

impl TextInference for FailingInference {
    fn infer_text(&self, _prompt: &str) -> Result<String, CrawlError> {
        Err(CrawlError::InferenceStatus {
            status: 503,
            body: "overloaded".to_string(),
        })
    }
}

/// Fails `failures` times, then answers.
struct FlakyInference {
    failures: u32,
    calls: Cell<u32>,
}

impl TextInference for FlakyInference {
    fn infer_text(&self, _prompt: &str) -> Result<String, CrawlError> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n <= self.failures {
            Err(CrawlError::InferenceStatus {
                status: 429,
                body: "rate limited".to_string(),
            })
        } else {
            Ok("ok".to_string())
        }
    }
}

// ============================================================================
// Heuristic classification
// ============================================================================

#[test]
fn fixture_forms_classify() {
    let login = forms("login.html");
    assert_eq!(classify_form(&login[0]), FormType::Login);
    assert_eq!(classify_form(&login[1]), FormType::Search);
    assert_eq!(classify_form(&forms("contact.html")[0]), FormType::Contact);

    let spa = spa_forms();
    assert_eq!(classify_form(&spa[0]), FormType::Generic);
    assert_eq!(classify_form(&spa[2]), FormType::Newsletter);
}

#[test]
fn field_names_drive_classification() {
    let registration = inline_form(
        r#"<input name="email" type="email">
           <input name="password" type="password">
           <input name="confirm_password" type="password">"#,
    );
    assert_eq!(classify_form(&registration), FormType::Registration);

    let checkout = inline_form(r#"<input name="card_number"><input name="cvv">"#);
    assert_eq!(classify_form(&checkout), FormType::Checkout);

    let upload = inline_form(r#"<input type="file" name="doc"><input name="title">"#);
    assert_eq!(classify_form(&upload), FormType::Upload);

    let lone_password = inline_form(r#"<input type="password" name="pin">"#);
    assert_eq!(classify_form(&lone_password), FormType::Login);
}

#[test]
fn llm_classifier_falls_back_on_unknown_labels() {
    let form = &forms("login.html")[0];

    let answered = LlmClassifier::new(Box::new(MockTextInference::new("Checkout Form")));
    assert_eq!(answered.classify(form), FormType::Checkout);

    let rambling = LlmClassifier::new(Box::new(MockTextInference::new("I am not sure")));
    assert_eq!(rambling.classify(form), FormType::Login);

    let failing = LlmClassifier::new(Box::new(FailingInference));
    assert_eq!(failing.classify(form), FormType::Login);
}

#[test]
fn llm_classifier_reads_json_shaped_labels() {
    let form = &forms("login.html")[0];
    let answered = LlmClassifier::new(Box::new(MockTextInference::new(
        r#"{"form_type": "Search Form"}"#,
    )));
    assert_eq!(answered.classify(form), FormType::Search);

    let unlabeled = LlmClassifier::new(Box::new(MockTextInference::new(r#"{"score": 1}"#)));
    assert_eq!(unlabeled.classify(form), FormType::Login);
}

// ============================================================================
// Rule-based generation
// ============================================================================

#[test]
fn rule_based_suite_for_login_form() {
    let form = &forms("login.html")[0];
    let suite = RuleBasedGenerator.generate(form);

    assert_eq!(suite.form_type, "Login Form");
    assert_eq!(suite.form_index, 1);
    assert_eq!(suite.form_action.as_deref(), Some("/session"));
    assert_eq!(suite.form_id.as_deref(), Some("login"));

    let types: Vec<TestType> = suite.test_cases.iter().map(|c| c.test_type).collect();
    assert_eq!(
        types,
        vec![
            TestType::Positive,
            TestType::Negative,
            TestType::Negative,
            TestType::Negative,
            TestType::EdgeCase,
            TestType::Accessibility,
            TestType::Validation,
        ]
    );
    let ids: Vec<&str> = suite.test_cases.iter().map(|c| c.test_id.as_str()).collect();
    assert_eq!(ids, vec!["TC001", "TC002", "TC003", "TC004", "TC005", "TC006", "TC007"]);

    let positive = &suite.test_cases[0];
    assert_eq!(positive.priority, Priority::High);
    assert_eq!(
        serde_json::Value::Object(positive.test_data.clone()),
        json!({"email": "user@example.com", "password": "TestPass123!"})
    );
    assert!(positive.test_steps.last().unwrap().contains("Sign in"));

    let invalid = &suite.test_cases[3];
    assert_eq!(invalid.data_text("email").as_deref(), Some("not-an-email"));

    let max_len = &suite.test_cases[4];
    assert_eq!(max_len.data_text("email").unwrap().len(), 65);

    let validation = &suite.test_cases[6];
    assert_eq!(
        validation.validation_points,
        vec!["Message reads 'Invalid credentials'".to_string()]
    );
}

#[test]
fn rule_based_suite_covers_widgets_and_dynamic_elements() {
    let form = &spa_forms()[0];
    let suite = RuleBasedGenerator.generate(form);

    let dynamic = suite
        .test_cases
        .iter()
        .find(|c| c.test_type == TestType::Dynamic)
        .unwrap();
    assert_eq!(dynamic.test_name, "Toggle 'More options'");
    assert_eq!(
        dynamic.dynamic_behavior.as_deref(),
        Some("aria-expanded changes from 'false'")
    );

    let widget = suite
        .test_cases
        .iter()
        .find(|c| c.widget_interaction.is_some())
        .unwrap();
    assert_eq!(
        widget.widget_interaction.as_deref(),
        Some("Respects max=2024-12-31, min=1900-01-01")
    );
    assert!(
        suite
            .test_cases
            .iter()
            .any(|c| c.data_text("birthday").as_deref() == Some("99/99/9999"))
    );
}

#[test]
fn rule_based_suite_flags_unlabelled_fields() {
    let form = inline_form(r#"<input name="nickname"><button>Save</button>"#);
    let suite = RuleBasedGenerator.generate(&form);
    let a11y = suite
        .test_cases
        .iter()
        .find(|c| c.test_type == TestType::Accessibility)
        .unwrap();
    assert_eq!(
        a11y.validation_points,
        vec!["'nickname' has no accessible label".to_string()]
    );
    assert!(
        suite
            .test_cases
            .iter()
            .any(|c| c.test_name == "Handle special characters")
    );
}

// ============================================================================
// Model-backed generation
// ============================================================================

const MODEL_ANSWER: &str = r#"```json
{
  "form_type": "Login Form",
  "test_cases": [
    {
      "test_id": "TC001",
      "test_name": "Valid login",
      "test_type": "positive",
      "priority": "high",
      "test_steps": ["Fill email", "Fill password", "Submit"],
      "test_data": {"email": "user@example.com", "remember": true},
      "expected_result": "User is signed in"
    },
    {
      "test_name": "Odd category",
      "test_type": "security",
      "priority": "urgent"
    }
  ]
}
```"#;

#[test]
fn model_answer_is_parsed_and_enriched() {
    let form = &forms("login.html")[0];
    let generator = LlmTestCaseGenerator::new(Box::new(MockTextInference::new(MODEL_ANSWER)));
    let suite = generator.generate(form);

    assert_eq!(suite.form_type, "Login Form");
    assert_eq!(suite.form_method.as_deref(), Some("post"));
    assert_eq!(suite.test_cases.len(), 2);
    assert_eq!(suite.test_cases[0].data_text("remember").as_deref(), Some("true"));

    let odd = &suite.test_cases[1];
    assert_eq!(odd.test_id, "TC002");
    assert_eq!(odd.test_type, TestType::Other);
    assert_eq!(odd.priority, Priority::Medium);
    assert_eq!(odd.priority.as_str(), "medium");
}

#[test]
fn missing_ids_are_numbered_by_position() {
    let suite = parse_suite_response(
        r#"{"test_cases": [{"test_name": "a"}, {"test_id": "TC001"}, {"test_name": "c"}]}"#,
    )
    .unwrap();
    let ids: Vec<&str> = suite.test_cases.iter().map(|c| c.test_id.as_str()).collect();
    assert_eq!(ids, vec!["TC001", "TC001", "TC003"]);
}

#[test]
fn unparseable_answer_uses_fallback_suite() {
    let form = &forms("login.html")[0];
    let generator =
        LlmTestCaseGenerator::new(Box::new(MockTextInference::new("Sorry, I cannot help.")));
    let suite = generator.generate(form);

    assert_eq!(suite.form_type, fallback_suite().form_type);
    assert_eq!(suite.test_cases.len(), 1);
    assert_eq!(suite.test_cases[0].test_name, "Basic form validation");
    assert_eq!(suite.form_index, 1);
}

#[test]
fn backend_failure_uses_rule_based_cases() {
    let form = &forms("login.html")[0];
    let generator = LlmTestCaseGenerator::new(Box::new(FailingInference));
    let suite = generator.generate(form);
    assert_eq!(suite, RuleBasedGenerator.generate(form));
}

#[test]
fn prompt_carries_form_data() {
    let form = &forms("login.html")[0];
    let prompt = LlmTestCaseGenerator::build_prompt(form);
    assert!(prompt.contains("URL: https://example.com/form"));
    assert!(prompt.contains("Form ID: form_1"));
    assert!(prompt.contains(r#""action":"/session""#));
    assert!(prompt.contains("Return ONLY valid JSON"));
}

#[test]
fn parse_errors_are_json_errors() {
    let err = parse_suite_response("not json").unwrap_err();
    assert!(matches!(err, CrawlError::JsonParse { .. }));

    let empty = parse_suite_response("{}").unwrap();
    assert_eq!(empty.form_type, "Unknown form type");
    assert!(empty.test_cases.is_empty());
}

#[test]
fn open_form_types_are_filled_by_the_classifier() {
    let mut driver = ScriptedDriver::with_html(&fixture("login.html"));
    let page = crawl_page(&mut driver, URL, &CrawlOptions::default()).unwrap();

    let generator = LlmTestCaseGenerator::new(Box::new(MockTextInference::new("???")));
    let suites = generate_suites(&page, &generator, &HeuristicClassifier);

    assert_eq!(suites.len(), 2);
    assert_eq!(suites[0].form_type, "Login Form");
    assert_eq!(suites[1].form_type, "Search Form");
    assert_eq!(suites[1].form_index, 2);
}

// ============================================================================
// Backends
// ============================================================================

#[test]
fn hosted_backend_requires_a_key() {
    assert!(matches!(
        OpenAiBackend::new(None),
        Err(CrawlError::MissingApiKey { .. })
    ));
    assert!(matches!(
        OpenAiBackend::new(Some("   ".to_string())),
        Err(CrawlError::MissingApiKey { .. })
    ));
    let backend = OpenAiBackend::new(Some("sk-test".to_string())).unwrap();
    assert_eq!(backend.model, "gpt-4o");
}

#[test]
fn retries_until_success() {
    let flaky = FlakyInference {
        failures: 2,
        calls: Cell::new(0),
    };
    let retrying = RetryingInference::new(flaky, 3, Duration::ZERO);
    assert_eq!(retrying.infer_text("hi").unwrap(), "ok");
    assert_eq!(retrying.inner.calls.get(), 3);

    let flaky = FlakyInference {
        failures: 5,
        calls: Cell::new(0),
    };
    let retrying = RetryingInference::new(flaky, 2, Duration::ZERO);
    assert!(retrying.infer_text("hi").is_err());
    assert_eq!(retrying.inner.calls.get(), 2);

    let once = RetryingInference::new(MockTextInference::new("x"), 0, Duration::ZERO);
    assert_eq!(once.attempts, 1);
}

#[tokio::test]
async fn hosted_backend_posts_chat_completion() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1/chat/completions"))
        .and(matchers::header("authorization", "Bearer sk-test"))
        .and(matchers::body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "Classify this"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  Login Form \n"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(Some("sk-test".to_string()))
        .unwrap()
        .with_endpoint(&format!("{}/v1/chat/completions", server.uri()))
        .with_model("gpt-4o-mini");
    let answer = tokio::task::spawn_blocking(move || backend.infer_text("Classify this"))
        .await
        .unwrap();

    assert_eq!(answer.unwrap(), "Login Form");
}

#[tokio::test]
async fn hosted_backend_surfaces_error_status() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"bad key"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(Some("sk-bad".to_string()))
        .unwrap()
        .with_endpoint(&format!("{}/v1/chat/completions", server.uri()));
    let result = tokio::task::spawn_blocking(move || backend.infer_text("hi"))
        .await
        .unwrap();

    match result.unwrap_err() {
        CrawlError::InferenceStatus { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("bad key"));
        }
        other => panic!("expected InferenceStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn local_backend_returns_generated_text() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/generate"))
        .and(matchers::body_partial_json(json!({
            "model": "qwen2.5:1.5b",
            "stream": false,
            "format": "json"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"response": "{}", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = OllamaBackend::new(&format!("{}/api/generate", server.uri()), "qwen2.5:1.5b");
    let answer = tokio::task::spawn_blocking(move || backend.infer_text("Generate"))
        .await
        .unwrap();

    assert_eq!(answer.unwrap(), "{}");
}

#[tokio::test]
async fn plain_text_local_backend_sends_no_format() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "Search Form", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend =
        OllamaBackend::new(&format!("{}/api/generate", server.uri()), "qwen2.5:1.5b").plain_text();
    let answer = tokio::task::spawn_blocking(move || backend.infer_text("Classify"))
        .await
        .unwrap();
    assert_eq!(answer.unwrap(), "Search Form");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "qwen2.5:1.5b");
    assert!(body.get("format").is_none());
}
