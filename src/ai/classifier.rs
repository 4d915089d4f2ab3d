use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ai::inference::TextInference;
use crate::extract::form_model::{FormRecord, InputRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Search,
    Login,
    Registration,
    Contact,
    Newsletter,
    Checkout,
    Upload,
    Generic,
}

impl FormType {
    pub const ALL: [FormType; 8] = [
        FormType::Search,
        FormType::Login,
        FormType::Registration,
        FormType::Contact,
        FormType::Newsletter,
        FormType::Checkout,
        FormType::Upload,
        FormType::Generic,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            FormType::Search => "Search Form",
            FormType::Login => "Login Form",
            FormType::Registration => "Registration Form",
            FormType::Contact => "Contact Form",
            FormType::Newsletter => "Newsletter Signup",
            FormType::Checkout => "Checkout Form",
            FormType::Upload => "File Upload Form",
            FormType::Generic => "Generic Form",
        }
    }

    /// Lower-case file-name token, e.g. `login_form`.
    pub fn slug(&self) -> String {
        self.display_name().replace(' ', "_").to_lowercase()
    }

    /// Match free text (a display name, slug or bare keyword) to a form type.
    /// A JSON answer is read through its `form_type` key or first string.
    pub fn from_label(label: &str) -> Option<FormType> {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(label.trim()) {
            let text = map
                .get("form_type")
                .and_then(Value::as_str)
                .or_else(|| map.values().find_map(Value::as_str))?;
            return FormType::from_label(text);
        }
        let lower = label.trim().trim_matches('"').to_lowercase().replace('_', " ");
        if lower.is_empty() {
            return None;
        }
        FormType::ALL.iter().copied().find(|t| {
            let name = t.display_name().to_lowercase();
            lower == name || lower == keyword(*t) || lower.starts_with(keyword(*t))
        })
    }
}

fn keyword(t: FormType) -> &'static str {
    match t {
        FormType::Search => "search",
        FormType::Login => "login",
        FormType::Registration => "registration",
        FormType::Contact => "contact",
        FormType::Newsletter => "newsletter",
        FormType::Checkout => "checkout",
        FormType::Upload => "file upload",
        FormType::Generic => "generic",
    }
}

// ============================================================================
// Heuristic classification
// ============================================================================

fn input_text(input: &InputRecord) -> String {
    [
        input.name.as_deref(),
        input.id.as_deref(),
        input.placeholder.as_deref(),
        input.aria_label.as_deref(),
    ]
    .iter()
    .flatten()
    .map(|s| s.to_lowercase())
    .collect::<Vec<_>>()
    .join(" ")
}

fn mentions(input: &InputRecord, words: &[&str]) -> bool {
    let text = input_text(input);
    words.iter().any(|w| text.contains(w))
}

/// Classify a form from its fields and metadata alone.
pub fn classify_form(form: &FormRecord) -> FormType {
    let fields: Vec<&InputRecord> = form.fillable_inputs().collect();

    let passwords = fields
        .iter()
        .filter(|i| i.effective_type() == "password")
        .count();
    let has_email = fields
        .iter()
        .any(|i| i.effective_type() == "email" || mentions(i, &["email", "e-mail"]));
    let has_confirm = passwords > 1 || fields.iter().any(|i| mentions(i, &["confirm"]));
    let others = fields.len() - passwords;

    // A lone password field (PIN pages, re-auth prompts) still counts as login
    if passwords > 0 {
        if has_confirm || others >= 2 {
            return FormType::Registration;
        }
        return FormType::Login;
    }

    if fields
        .iter()
        .any(|i| mentions(i, &["card", "cvv", "cvc", "expiry"]))
    {
        return FormType::Checkout;
    }

    if form.has_input_type("file") {
        return FormType::Upload;
    }

    let action = form
        .form_metadata
        .action
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let is_search = fields.iter().any(|i| {
        i.effective_type() == "search"
            || mentions(i, &["search", "query"])
            || i.name.as_deref() == Some("q")
    }) || action.contains("search");
    if is_search {
        return FormType::Search;
    }

    if form.has_input_type("textarea") && has_email {
        return FormType::Contact;
    }

    if fields.len() == 1 && has_email {
        return FormType::Newsletter;
    }

    FormType::Generic
}

// ============================================================================
// FormClassifier trait
// ============================================================================

pub trait FormClassifier {
    fn classify(&self, form: &FormRecord) -> FormType;
}

pub struct HeuristicClassifier;

impl FormClassifier for HeuristicClassifier {
    fn classify(&self, form: &FormRecord) -> FormType {
        classify_form(form)
    }
}

/// Asks the model for a single label; anything unrecognised falls back to
/// the heuristic.
pub struct LlmClassifier {
    backend: Box<dyn TextInference>,
}

impl LlmClassifier {
    pub fn new(backend: Box<dyn TextInference>) -> Self {
        Self { backend }
    }

    fn build_prompt(form: &FormRecord) -> String {
        let fields = form
            .inputs
            .iter()
            .map(|i| {
                format!(
                    "{} ({})",
                    i.label().unwrap_or("unlabeled"),
                    i.effective_type()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let labels = FormType::ALL
            .iter()
            .map(|t| t.display_name())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Classify this web form.\n\nURL: {}\nAction: {}\nFields: {}\nButtons: {}\n\n\
             Answer with exactly one of: {}",
            form.url,
            form.form_metadata.action.as_deref().unwrap_or("(none)"),
            if fields.is_empty() { "(none)".to_string() } else { fields },
            form.button_labels().join(", "),
            labels
        )
    }
}

impl FormClassifier for LlmClassifier {
    fn classify(&self, form: &FormRecord) -> FormType {
        match self.backend.infer_text(&Self::build_prompt(form)) {
            Ok(answer) => match FormType::from_label(&answer) {
                Some(t) => t,
                None => {
                    debug!("unrecognised form label '{}', using heuristic", answer.trim());
                    classify_form(form)
                }
            },
            Err(e) => {
                warn!("form classification failed: {}", e);
                classify_form(form)
            }
        }
    }
}
