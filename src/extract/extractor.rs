use std::collections::{BTreeMap, HashSet};

use scraper::{ElementRef, Html};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::CrawlError;
use crate::extract::form_model::{
    ContainerKind, CustomWidget, DynamicElement, FormMetadata, FormRecord, InputRecord,
    SubmitTrigger, ValidationAttrs, ValidationElement,
};
use crate::extract::selectors::{SelectorSet, selectors};

/// Maximum characters of inner HTML kept per record.
pub const HTML_SNIPPET_CHARS: usize = 500;

const INPUT_DATA_ATTRS: &[&str] = &[
    "data-type",
    "data-format",
    "data-mask",
    "data-min",
    "data-max",
    "data-step",
];

const TRIGGER_DATA_ATTRS: &[&str] = &["data-action", "data-submit", "data-confirm", "data-loading"];

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Also look for form-like containers, modals and input containers.
    pub spa: bool,
    pub max_input_containers: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            spa: false,
            max_input_containers: 5,
        }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Extract every form record from a serialized page.
pub fn extract_forms(
    html: &str,
    url: &str,
    options: &ExtractOptions,
) -> Result<Vec<FormRecord>, CrawlError> {
    let sel = selectors()?;
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut containers: Vec<(ContainerKind, ElementRef)> = Vec::new();

    // Standard mode reports every form; digests only matter against SPA containers.
    for el in doc.select(&sel.forms) {
        if options.spa {
            push_unique(&mut containers, &mut seen, ContainerKind::Form, el);
        } else {
            containers.push((ContainerKind::Form, el));
        }
    }

    if options.spa {
        for el in doc.select(&sel.form_like) {
            push_unique(&mut containers, &mut seen, ContainerKind::FormLike, el);
        }

        let mut taken = 0;
        for el in doc.select(&sel.input_containers) {
            if taken >= options.max_input_containers {
                break;
            }
            if has_fields(el, sel)
                && push_unique(&mut containers, &mut seen, ContainerKind::InputContainer, el)
            {
                taken += 1;
            }
        }

        for el in doc.select(&sel.modals) {
            if has_fields(el, sel) {
                push_unique(&mut containers, &mut seen, ContainerKind::Modal, el);
            }
        }
    }

    debug!(count = containers.len(), spa = options.spa, "form containers found");

    Ok(build_records(&containers, url, 1, sel))
}

/// Narrower query run after a trigger click revealed new content.
///
/// `start_index` continues the page's 1-based numbering; `trigger` is the
/// 1-based number of the click that revealed the content.
pub fn extract_dynamic_forms(
    html: &str,
    url: &str,
    start_index: usize,
    trigger: usize,
) -> Result<Vec<FormRecord>, CrawlError> {
    let sel = selectors()?;
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut containers = Vec::new();
    for el in doc.select(&sel.dynamic_forms) {
        push_unique(&mut containers, &mut seen, ContainerKind::Dynamic, el);
    }
    for el in doc.select(&sel.dynamic_modals) {
        if has_fields(el, sel) {
            push_unique(&mut containers, &mut seen, ContainerKind::Dynamic, el);
        }
    }

    let mut records = build_records(&containers, url, start_index, sel);
    for (j, record) in records.iter_mut().enumerate() {
        record.source_id = format!("dynamic_form_{}_{}", trigger, j + 1);
    }
    Ok(records)
}

/// SHA-1 of an element's outer HTML, hex encoded.
pub fn element_digest(outer_html: &str) -> String {
    Sha1::digest(outer_html.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

// ============================================================================
// Record building
// ============================================================================

fn push_unique<'a>(
    containers: &mut Vec<(ContainerKind, ElementRef<'a>)>,
    seen: &mut HashSet<String>,
    kind: ContainerKind,
    el: ElementRef<'a>,
) -> bool {
    if seen.insert(element_digest(&el.html())) {
        containers.push((kind, el));
        true
    } else {
        false
    }
}

fn has_fields(el: ElementRef, sel: &SelectorSet) -> bool {
    el.select(&sel.inputs).next().is_some()
}

fn build_records(
    containers: &[(ContainerKind, ElementRef)],
    url: &str,
    start_index: usize,
    sel: &SelectorSet,
) -> Vec<FormRecord> {
    let mut per_kind: BTreeMap<&'static str, usize> = BTreeMap::new();

    containers
        .iter()
        .enumerate()
        .map(|(i, (kind, el))| {
            let n = per_kind.entry(kind.as_str()).or_insert(0);
            *n += 1;
            let source_id = format!("{}_{}", kind.as_str(), n);
            build_record(*el, *kind, url, start_index + i, source_id, sel)
        })
        .collect()
}

fn build_record(
    el: ElementRef,
    kind: ContainerKind,
    url: &str,
    form_index: usize,
    source_id: String,
    sel: &SelectorSet,
) -> FormRecord {
    let inputs: Vec<InputRecord> = el.select(&sel.inputs).map(input_record).collect();
    let submit_triggers: Vec<SubmitTrigger> =
        el.select(&sel.submit_triggers).map(submit_trigger).collect();
    let validation_elements: Vec<ValidationElement> = el
        .select(&sel.validation_elements)
        .map(validation_element)
        .collect();
    let custom_widgets: Vec<CustomWidget> =
        el.select(&sel.custom_widgets).map(custom_widget).collect();
    let dynamic_elements: Vec<DynamicElement> =
        el.select(&sel.dynamic_elements).map(dynamic_element).collect();

    debug!(
        source_id = %source_id,
        inputs = inputs.len(),
        submit_triggers = submit_triggers.len(),
        validation_elements = validation_elements.len(),
        custom_widgets = custom_widgets.len(),
        dynamic_elements = dynamic_elements.len(),
        "form processed"
    );

    FormRecord {
        url: url.to_string(),
        form_index,
        source_id,
        kind,
        element_tag: el.value().name().to_string(),
        element_role: attr(el, "role"),
        form_metadata: FormMetadata {
            action: attr(el, "action"),
            method: attr(el, "method"),
            id: attr(el, "id"),
            class: attr(el, "class"),
            enctype: attr(el, "enctype"),
            novalidate: flag(el, "novalidate"),
        },
        inputs,
        submit_triggers,
        validation_elements,
        custom_widgets,
        dynamic_elements,
        html_snippet: truncate_chars(&el.inner_html(), HTML_SNIPPET_CHARS),
    }
}

fn input_record(el: ElementRef) -> InputRecord {
    InputRecord {
        tag: el.value().name().to_string(),
        name: attr(el, "name"),
        input_type: attr(el, "type"),
        id: attr(el, "id"),
        class: attr(el, "class"),
        placeholder: attr(el, "placeholder"),
        value: attr(el, "value"),
        required: flag(el, "required"),
        disabled: flag(el, "disabled"),
        readonly: flag(el, "readonly"),
        max_length: attr(el, "maxlength"),
        pattern: attr(el, "pattern"),
        aria_label: attr(el, "aria-label"),
        data_testid: attr(el, "data-testid"),
        data_cy: attr(el, "data-cy"),
        validation: ValidationAttrs {
            aria_invalid: attr(el, "aria-invalid"),
            data_validation: attr(el, "data-validation"),
            data_validate: attr(el, "data-validate"),
        },
        custom_attributes: present_attrs(el, INPUT_DATA_ATTRS),
    }
}

fn submit_trigger(el: ElementRef) -> SubmitTrigger {
    SubmitTrigger {
        tag: el.value().name().to_string(),
        text: text_content(el),
        name: attr(el, "name"),
        id: attr(el, "id"),
        trigger_type: attr(el, "type"),
        value: attr(el, "value"),
        class: attr(el, "class"),
        role: attr(el, "role"),
        disabled: flag(el, "disabled"),
        custom_attributes: present_attrs(el, TRIGGER_DATA_ATTRS),
    }
}

fn validation_element(el: ElementRef) -> ValidationElement {
    ValidationElement {
        text: text_content(el),
        id: attr(el, "id"),
        class: attr(el, "class"),
        role: attr(el, "role"),
        aria_live: attr(el, "aria-live"),
    }
}

fn custom_widget(el: ElementRef) -> CustomWidget {
    let widget_type = attr(el, "type");
    let mut attributes = BTreeMap::new();
    let keys: &[&str] = match widget_type.as_deref() {
        Some("file") => &["accept", "multiple"],
        Some("range") => &["min", "max", "step"],
        Some("date") => &["min", "max"],
        _ => &[],
    };
    for key in keys {
        if let Some(v) = el.value().attr(key) {
            let value = if *key == "multiple" { "true" } else { v };
            attributes.insert(key.to_string(), value.to_string());
        }
    }

    CustomWidget {
        widget_type,
        id: attr(el, "id"),
        class: attr(el, "class"),
        name: attr(el, "name"),
        value: attr(el, "value"),
        attributes,
    }
}

fn dynamic_element(el: ElementRef) -> DynamicElement {
    DynamicElement {
        text: text_content(el),
        id: attr(el, "id"),
        class: attr(el, "class"),
        role: attr(el, "role"),
        aria_expanded: attr(el, "aria-expanded"),
        data_toggle: attr(el, "data-toggle"),
        data_target: attr(el, "data-target"),
    }
}

// ============================================================================
// Attribute helpers
// ============================================================================

fn attr(el: ElementRef, name: &str) -> Option<String> {
    el.value().attr(name).map(str::to_string)
}

fn flag(el: ElementRef, name: &str) -> bool {
    el.value().attr(name).is_some()
}

fn present_attrs(el: ElementRef, names: &[&str]) -> BTreeMap<String, String> {
    names
        .iter()
        .filter_map(|name| el.value().attr(name).map(|v| (name.to_string(), v.to_string())))
        .collect()
}

/// Descendant text with whitespace collapsed; `None` when blank.
pub fn text_content(el: ElementRef) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Truncate to at most `max` characters without splitting a char.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn digest_is_stable_hex() {
        let d = element_digest("<form></form>");
        assert_eq!(d.len(), 40);
        assert_eq!(d, element_digest("<form></form>"));
        assert_ne!(d, element_digest("<form> </form>"));
    }
}
