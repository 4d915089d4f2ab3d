use std::sync::LazyLock;

use scraper::Selector;

use crate::error::CrawlError;

// ============================================================================
// Selector tables
// ============================================================================

pub const FORMS: &str = "form";

pub const INPUTS: &str = "input, textarea, select";

pub const SUBMIT_TRIGGERS: &str =
    "button, input[type=submit], input[type=button], [role='button'], .btn, .button";

pub const VALIDATION_ELEMENTS: &str =
    "[data-validation], [data-validate], .validation, .error, .invalid, [aria-invalid]";

pub const CUSTOM_WIDGETS: &str = "input[type='date'], input[type='file'], input[type='range'], input[type='color'], .datepicker, .slider, .upload, .widget";

pub const DYNAMIC_ELEMENTS: &str =
    "[data-dynamic], [data-toggle], .dynamic, .collapsible, .expandable, [aria-expanded]";

pub const FORM_LIKE: &str = "div[role='form'], div[data-testid*='form'], div[class*='form'], div[id*='form'], section[role='form'], section[data-testid*='form']";

/// Dialog containers; only those holding a field count as forms.
pub const MODALS: &str = "[role='dialog'], .modal, .dialog";

/// Generic containers; only those holding a field count as forms.
pub const INPUT_CONTAINERS: &str = "div, section";

/// Narrow query re-run after clicking a trigger.
pub const DYNAMIC_FORMS: &str = "form, div[role='form']";

pub const DYNAMIC_MODALS: &str = ".modal";

pub const FORM_TRIGGERS: &str = "button, input[type='submit'], input[type='button'], a[href*='contact'], a[href*='sign'], a[href*='register'], a[href*='login']";

pub const TRIGGER_KEYWORDS: &[&str] = &[
    "add", "create", "new", "submit", "contact", "sign", "register", "login", "email", "message",
];

/// Tried in order by the popup handler; each visible match is clicked.
pub const POPUP_DISMISSERS: &[&str] = &[
    r#"[class*="popup"]"#,
    r#"[class*="modal"]"#,
    r#"[class*="overlay"]"#,
    r#"[class*="dialog"]"#,
    r#"[id*="popup"]"#,
    r#"[id*="modal"]"#,
    ".close",
    ".cancel",
    ".dismiss",
    r#"[aria-label*="close"]"#,
    r#"[aria-label*="Close"]"#,
];

pub const REACT_MARKERS: &str = "[data-reactroot], [data-reactid]";
pub const ANGULAR_MARKERS: &str = "[ng-version], [ng-app]";
pub const SPA_MARKERS: &str = "[data-testid], [data-cy]";

pub const CLOUDFLARE: &str = "div[id='cf-wrapper']";
pub const BOT_CHECK: &str = "div[class*='bot'], div[class*='captcha'], div[id*='captcha']";

pub const BUTTONS: &str = "button";
pub const LINKS: &str = "a";
pub const TITLE: &str = "title";

// ============================================================================
// Compiled selectors
// ============================================================================

/// Parse a selector, mapping the parser's error into `CrawlError`.
pub fn parse_selector(selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|e| CrawlError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Every static selector in this module, for validation.
pub fn all_static() -> Vec<&'static str> {
    let mut all = vec![
        FORMS,
        INPUTS,
        SUBMIT_TRIGGERS,
        VALIDATION_ELEMENTS,
        CUSTOM_WIDGETS,
        DYNAMIC_ELEMENTS,
        FORM_LIKE,
        MODALS,
        INPUT_CONTAINERS,
        DYNAMIC_FORMS,
        DYNAMIC_MODALS,
        FORM_TRIGGERS,
        REACT_MARKERS,
        ANGULAR_MARKERS,
        SPA_MARKERS,
        CLOUDFLARE,
        BOT_CHECK,
        BUTTONS,
        LINKS,
        TITLE,
    ];
    all.extend_from_slice(POPUP_DISMISSERS);
    all
}

/// The compiled selector tables used by the extractor.
pub struct SelectorSet {
    pub forms: Selector,
    pub inputs: Selector,
    pub submit_triggers: Selector,
    pub validation_elements: Selector,
    pub custom_widgets: Selector,
    pub dynamic_elements: Selector,
    pub form_like: Selector,
    pub modals: Selector,
    pub input_containers: Selector,
    pub dynamic_forms: Selector,
    pub dynamic_modals: Selector,
    pub react: Selector,
    pub angular: Selector,
    pub spa: Selector,
    pub cloudflare: Selector,
    pub bot_check: Selector,
    pub buttons: Selector,
    pub links: Selector,
    pub title: Selector,
}

impl SelectorSet {
    pub fn compile() -> Result<Self, CrawlError> {
        Ok(Self {
            forms: parse_selector(FORMS)?,
            inputs: parse_selector(INPUTS)?,
            submit_triggers: parse_selector(SUBMIT_TRIGGERS)?,
            validation_elements: parse_selector(VALIDATION_ELEMENTS)?,
            custom_widgets: parse_selector(CUSTOM_WIDGETS)?,
            dynamic_elements: parse_selector(DYNAMIC_ELEMENTS)?,
            form_like: parse_selector(FORM_LIKE)?,
            modals: parse_selector(MODALS)?,
            input_containers: parse_selector(INPUT_CONTAINERS)?,
            dynamic_forms: parse_selector(DYNAMIC_FORMS)?,
            dynamic_modals: parse_selector(DYNAMIC_MODALS)?,
            react: parse_selector(REACT_MARKERS)?,
            angular: parse_selector(ANGULAR_MARKERS)?,
            spa: parse_selector(SPA_MARKERS)?,
            cloudflare: parse_selector(CLOUDFLARE)?,
            bot_check: parse_selector(BOT_CHECK)?,
            buttons: parse_selector(BUTTONS)?,
            links: parse_selector(LINKS)?,
            title: parse_selector(TITLE)?,
        })
    }
}

static SELECTORS: LazyLock<Result<SelectorSet, String>> =
    LazyLock::new(|| SelectorSet::compile().map_err(|e| e.to_string()));

/// Shared compiled selector tables.
pub fn selectors() -> Result<&'static SelectorSet, CrawlError> {
    SELECTORS.as_ref().map_err(|message| CrawlError::Selector {
        selector: "<static table>".to_string(),
        message: message.clone(),
    })
}
