use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Form records: the flat transfer shape written to JSON/CSV and sent to the model
// ============================================================================

/// Which query produced a form record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// A real `<form>` element
    Form,
    /// A div/section carrying form semantics (role, class, id, test id)
    FormLike,
    /// A generic container that happens to hold fields
    InputContainer,
    /// A dialog/modal that holds fields
    Modal,
    /// Revealed after clicking a form trigger
    Dynamic,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Form => "form",
            ContainerKind::FormLike => "form_like",
            ContainerKind::InputContainer => "input_container",
            ContainerKind::Modal => "modal_form",
            ContainerKind::Dynamic => "dynamic_form",
        }
    }
}

/// Attributes of the container element itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormMetadata {
    pub action: Option<String>,
    pub method: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub enctype: Option<String>,
    pub novalidate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationAttrs {
    pub aria_invalid: Option<String>,
    pub data_validation: Option<String>,
    pub data_validate: Option<String>,
}

impl ValidationAttrs {
    pub fn is_empty(&self) -> bool {
        self.aria_invalid.is_none() && self.data_validation.is_none() && self.data_validate.is_none()
    }
}

/// An `input`, `textarea` or `select`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub tag: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub required: bool,
    pub disabled: bool,
    pub readonly: bool,
    pub max_length: Option<String>,
    pub pattern: Option<String>,
    pub aria_label: Option<String>,
    pub data_testid: Option<String>,
    pub data_cy: Option<String>,
    pub validation: ValidationAttrs,
    pub custom_attributes: BTreeMap<String, String>,
}

impl InputRecord {
    /// Best human-facing label: aria-label, placeholder, name, then id.
    pub fn label(&self) -> Option<&str> {
        self.aria_label
            .as_deref()
            .or(self.placeholder.as_deref())
            .or(self.name.as_deref())
            .or(self.id.as_deref())
    }

    /// Effective type: `select`/`textarea` for those tags, else the type
    /// attribute, defaulting to `text`.
    pub fn effective_type(&self) -> &str {
        match self.tag.as_str() {
            "select" | "textarea" => self.tag.as_str(),
            _ => self.input_type.as_deref().unwrap_or("text"),
        }
    }

    /// Hidden inputs and submit-like inputs are not fillable fields.
    pub fn is_fillable(&self) -> bool {
        !matches!(
            self.effective_type(),
            "hidden" | "submit" | "button" | "reset" | "image"
        ) && !self.disabled
            && !self.readonly
    }
}

/// Any element capable of submitting or advancing a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitTrigger {
    pub tag: String,
    pub text: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub trigger_type: Option<String>,
    pub value: Option<String>,
    pub class: Option<String>,
    pub role: Option<String>,
    pub disabled: bool,
    pub custom_attributes: BTreeMap<String, String>,
}

impl SubmitTrigger {
    /// Human-facing label with the fallback chain text → value → name → id →
    /// class (when it looks like a button) → type.
    pub fn display_label(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        if let Some(value) = &self.value {
            return format!("{} (value)", value);
        }
        if let Some(name) = &self.name {
            return format!("{} (name)", name);
        }
        if let Some(id) = &self.id {
            return format!("{} (id)", id);
        }
        if let Some(class) = self.class.as_deref().filter(|c| c.contains("btn")) {
            return format!("Button ({})", class);
        }
        format!("Button ({})", self.trigger_type.as_deref().unwrap_or("unknown"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationElement {
    pub text: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub role: Option<String>,
    pub aria_live: Option<String>,
}

/// Date pickers, file uploads, sliders, colour pickers and similar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomWidget {
    #[serde(rename = "type")]
    pub widget_type: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

/// An element whose visibility or state toggles at runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicElement {
    pub text: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub role: Option<String>,
    pub aria_expanded: Option<String>,
    pub data_toggle: Option<String>,
    pub data_target: Option<String>,
}

/// One HTML form (or form-like container) and everything inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub url: String,
    /// 1-based position among the records of this page.
    pub form_index: usize,
    /// Query-scoped identifier, e.g. `form_like_2`.
    pub source_id: String,
    pub kind: ContainerKind,
    pub element_tag: String,
    pub element_role: Option<String>,
    pub form_metadata: FormMetadata,
    pub inputs: Vec<InputRecord>,
    pub submit_triggers: Vec<SubmitTrigger>,
    pub validation_elements: Vec<ValidationElement>,
    pub custom_widgets: Vec<CustomWidget>,
    pub dynamic_elements: Vec<DynamicElement>,
    pub html_snippet: String,
}

impl FormRecord {
    pub fn fillable_inputs(&self) -> impl Iterator<Item = &InputRecord> {
        self.inputs.iter().filter(|i| i.is_fillable())
    }

    pub fn has_input_type(&self, input_type: &str) -> bool {
        self.inputs.iter().any(|i| i.effective_type() == input_type)
    }

    pub fn button_labels(&self) -> Vec<String> {
        self.submit_triggers
            .iter()
            .map(SubmitTrigger::display_label)
            .collect()
    }
}
