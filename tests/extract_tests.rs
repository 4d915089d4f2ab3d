use form_crawler::extract::{
    extractor::{ExtractOptions, HTML_SNIPPET_CHARS, extract_dynamic_forms, extract_forms},
    form_model::{ContainerKind, InputRecord, SubmitTrigger},
    page_signals::{Blocker, count_interactive, detect_blockers, detect_frameworks, page_title},
};

mod common;
use crate::common::utils::fixture;

const URL: &str = "https://example.com/login";

fn spa_options() -> ExtractOptions {
    ExtractOptions {
        spa: true,
        ..ExtractOptions::default()
    }
}

// ============================================================================
// Static forms
// ============================================================================

#[test]
fn extracts_every_form_with_metadata() {
    let forms = extract_forms(&fixture("login.html"), URL, &ExtractOptions::default()).unwrap();
    assert_eq!(forms.len(), 2);

    let login = &forms[0];
    assert_eq!(login.form_index, 1);
    assert_eq!(login.source_id, "form_1");
    assert_eq!(login.kind, ContainerKind::Form);
    assert_eq!(login.element_tag, "form");
    assert_eq!(login.url, URL);
    assert_eq!(login.form_metadata.action.as_deref(), Some("/session"));
    assert_eq!(login.form_metadata.method.as_deref(), Some("post"));
    assert_eq!(login.form_metadata.id.as_deref(), Some("login"));
    assert_eq!(login.form_metadata.class.as_deref(), Some("auth-form"));
    assert!(login.form_metadata.novalidate);

    assert_eq!(forms[1].form_index, 2);
    assert_eq!(forms[1].source_id, "form_2");
    assert!(!forms[1].form_metadata.novalidate);
}

#[test]
fn input_attributes_are_captured() {
    let forms = extract_forms(&fixture("login.html"), URL, &ExtractOptions::default()).unwrap();
    let inputs = &forms[0].inputs;
    assert_eq!(inputs.len(), 3);

    let email = &inputs[0];
    assert_eq!(email.tag, "input");
    assert_eq!(email.input_type.as_deref(), Some("email"));
    assert_eq!(email.name.as_deref(), Some("email"));
    assert!(email.required);
    assert_eq!(email.max_length.as_deref(), Some("64"));
    assert_eq!(
        email.custom_attributes.get("data-format").map(String::as_str),
        Some("email")
    );
    assert_eq!(email.label(), Some("Email address"));

    assert_eq!(inputs[1].label(), Some("Password"));
    assert!(!inputs[2].is_fillable(), "hidden input is not fillable");
    assert_eq!(forms[0].fillable_inputs().count(), 2);
}

#[test]
fn submit_triggers_and_validation_elements() {
    let forms = extract_forms(&fixture("login.html"), URL, &ExtractOptions::default()).unwrap();

    let triggers = &forms[0].submit_triggers;
    assert_eq!(triggers.len(), 1, "a button matching several selectors counts once");
    assert_eq!(triggers[0].text.as_deref(), Some("Sign in"));
    assert_eq!(
        triggers[0].custom_attributes.get("data-loading").map(String::as_str),
        Some("true")
    );

    let validation = &forms[0].validation_elements;
    assert_eq!(validation.len(), 1);
    assert_eq!(validation[0].text.as_deref(), Some("Invalid credentials"));
    assert_eq!(validation[0].role.as_deref(), Some("alert"));
    assert_eq!(validation[0].aria_live.as_deref(), Some("polite"));

    assert_eq!(forms[1].button_labels(), vec!["Go (value)".to_string()]);
}

#[test]
fn html_snippet_is_bounded() {
    let many_inputs: String = (0..100)
        .map(|i| format!("<input name=\"field_{}\">", i))
        .collect();
    let html = format!("<html><body><form>{}</form></body></html>", many_inputs);
    let forms = extract_forms(&html, URL, &ExtractOptions::default()).unwrap();
    assert_eq!(forms[0].inputs.len(), 100);
    assert_eq!(forms[0].html_snippet.chars().count(), HTML_SNIPPET_CHARS);
}

#[test]
fn identical_forms_are_all_reported_in_standard_mode() {
    let html = r#"<html><body>
        <form><input name="a"></form>
        <form><input name="a"></form>
        <form><input name="b"></form>
    </body></html>"#;
    let forms = extract_forms(html, URL, &ExtractOptions::default()).unwrap();
    assert_eq!(forms.len(), 3);
    let indices: Vec<usize> = forms.iter().map(|f| f.form_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(forms[2].inputs[0].name.as_deref(), Some("b"));
}

#[test]
fn identical_markup_is_reported_once_in_spa_mode() {
    let html = r#"<html><body>
        <form><input name="a"></form>
        <form><input name="a"></form>
        <form><input name="b"></form>
    </body></html>"#;
    let forms = extract_forms(html, URL, &spa_options()).unwrap();
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[1].inputs[0].name.as_deref(), Some("b"));
}

#[test]
fn page_without_forms_yields_nothing() {
    let forms = extract_forms(
        "<html><body><p>Hello</p></body></html>",
        URL,
        &spa_options(),
    )
    .unwrap();
    assert!(forms.is_empty());
}

#[test]
fn widgets_keep_their_constraints() {
    let html = r#"<html><body><form>
        <input type="file" name="cv" accept=".pdf" multiple>
        <input type="range" name="volume" min="0" max="11" step="1">
    </form></body></html>"#;
    let forms = extract_forms(html, URL, &ExtractOptions::default()).unwrap();
    let widgets = &forms[0].custom_widgets;
    assert_eq!(widgets.len(), 2);

    assert_eq!(widgets[0].widget_type.as_deref(), Some("file"));
    assert_eq!(widgets[0].attributes.get("accept").map(String::as_str), Some(".pdf"));
    assert_eq!(widgets[0].attributes.get("multiple").map(String::as_str), Some("true"));

    assert_eq!(widgets[1].name.as_deref(), Some("volume"));
    assert_eq!(widgets[1].attributes.len(), 3);
}

// ============================================================================
// SPA containers
// ============================================================================

#[test]
fn spa_markup_needs_spa_mode() {
    let forms = extract_forms(&fixture("spa.html"), URL, &ExtractOptions::default()).unwrap();
    assert!(forms.is_empty());
}

#[test]
fn spa_mode_finds_form_like_and_input_containers() {
    let forms = extract_forms(&fixture("spa.html"), URL, &spa_options()).unwrap();
    let kinds: Vec<ContainerKind> = forms.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ContainerKind::FormLike,
            ContainerKind::InputContainer,
            ContainerKind::InputContainer
        ]
    );
    let ids: Vec<&str> = forms.iter().map(|f| f.source_id.as_str()).collect();
    assert_eq!(ids, vec!["form_like_1", "input_container_1", "input_container_2"]);
    let indexes: Vec<usize> = forms.iter().map(|f| f.form_index).collect();
    assert_eq!(indexes, vec![1, 2, 3]);

    let signup = &forms[0];
    assert_eq!(signup.element_tag, "div");
    assert_eq!(signup.element_role.as_deref(), Some("form"));
    assert_eq!(signup.inputs.len(), 2);
    assert_eq!(signup.custom_widgets.len(), 1);
    assert_eq!(signup.custom_widgets[0].widget_type.as_deref(), Some("date"));
    assert_eq!(signup.dynamic_elements.len(), 1);
    assert_eq!(signup.dynamic_elements[0].aria_expanded.as_deref(), Some("false"));
    assert_eq!(signup.dynamic_elements[0].data_target.as_deref(), Some("#more"));
}

#[test]
fn input_container_cap_leaves_modals_for_the_modal_query() {
    let options = ExtractOptions {
        spa: true,
        max_input_containers: 1,
    };
    let forms = extract_forms(&fixture("spa.html"), URL, &options).unwrap();
    let ids: Vec<&str> = forms.iter().map(|f| f.source_id.as_str()).collect();
    assert_eq!(ids, vec!["form_like_1", "input_container_1", "modal_form_1"]);
    assert_eq!(forms[2].kind, ContainerKind::Modal);
}

#[test]
fn dynamic_forms_continue_numbering() {
    let html = r#"<html><body>
        <form><input name="email"></form>
        <div class="modal"><input name="message"></div>
        <div class="modal"><p>No fields here</p></div>
    </body></html>"#;
    let forms = extract_dynamic_forms(html, URL, 3, 2).unwrap();
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[0].source_id, "dynamic_form_2_1");
    assert_eq!(forms[1].source_id, "dynamic_form_2_2");
    assert_eq!(forms[0].form_index, 3);
    assert_eq!(forms[1].form_index, 4);
    assert!(forms.iter().all(|f| f.kind == ContainerKind::Dynamic));
}

// ============================================================================
// Model helpers
// ============================================================================

#[test]
fn trigger_label_fallback_chain() {
    let with_text = SubmitTrigger {
        text: Some("Send".into()),
        value: Some("ignored".into()),
        ..SubmitTrigger::default()
    };
    assert_eq!(with_text.display_label(), "Send");

    let with_name = SubmitTrigger {
        name: Some("go".into()),
        ..SubmitTrigger::default()
    };
    assert_eq!(with_name.display_label(), "go (name)");

    let styled = SubmitTrigger {
        class: Some("btn primary".into()),
        ..SubmitTrigger::default()
    };
    assert_eq!(styled.display_label(), "Button (btn primary)");

    let bare = SubmitTrigger {
        trigger_type: Some("submit".into()),
        class: Some("cta".into()),
        ..SubmitTrigger::default()
    };
    assert_eq!(bare.display_label(), "Button (submit)");
}

#[test]
fn effective_type_uses_tag_for_textarea_and_select() {
    let textarea = InputRecord {
        tag: "textarea".into(),
        input_type: Some("text".into()),
        ..InputRecord::default()
    };
    assert_eq!(textarea.effective_type(), "textarea");

    let untyped = InputRecord {
        tag: "input".into(),
        ..InputRecord::default()
    };
    assert_eq!(untyped.effective_type(), "text");

    let disabled = InputRecord {
        tag: "input".into(),
        disabled: true,
        ..InputRecord::default()
    };
    assert!(!disabled.is_fillable());
}

// ============================================================================
// Page signals
// ============================================================================

#[test]
fn framework_markers_are_detected() {
    let hints = detect_frameworks(&fixture("spa.html")).unwrap();
    assert!(hints.react);
    assert!(hints.spa);
    assert!(!hints.angular);
    assert!(!hints.vue);
    assert_eq!(hints.names(), vec!["react", "spa"]);

    let vue = detect_frameworks(r#"<html><body><div data-v-7ba5bd90>x</div></body></html>"#)
        .unwrap();
    assert!(vue.vue);

    let plain = detect_frameworks(&fixture("login.html")).unwrap();
    assert!(!plain.any());
}

#[test]
fn blockers_and_counts() {
    let html = fixture("blocked.html");
    assert_eq!(
        detect_blockers(&html).unwrap(),
        vec![Blocker::Cloudflare, Blocker::Captcha]
    );
    assert!(detect_blockers(&fixture("login.html")).unwrap().is_empty());

    let counts = count_interactive(&html).unwrap();
    assert_eq!(counts.forms, 0);
    assert_eq!(counts.inputs, 0);
    assert_eq!(counts.links, 1);
    assert!(counts.has_interactive());

    let login = count_interactive(&fixture("login.html")).unwrap();
    assert_eq!(login.forms, 2);
    assert_eq!(login.inputs, 5);
    assert_eq!(login.buttons, 1);
}

#[test]
fn title_is_read_from_markup() {
    assert_eq!(
        page_title(&fixture("blocked.html")).unwrap().as_deref(),
        Some("Just a moment...")
    );
    assert_eq!(page_title("<html><body></body></html>").unwrap(), None);
}
