use serde::Serialize;
use tracing::{info, warn};

use crate::browser::driver::{PageDriver, WaitUntil};
use crate::browser::loader::{LoadOptions, LoadReport, load_page};
use crate::browser::popup::{PopupHandler, PopupOutcome};
use crate::error::CrawlError;
use crate::extract::extractor::{ExtractOptions, extract_dynamic_forms, extract_forms};
use crate::extract::form_model::FormRecord;
use crate::extract::page_signals::{FrameworkHints, detect_frameworks};
use crate::extract::selectors::{FORM_TRIGGERS, TRIGGER_KEYWORDS};

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub load: LoadOptions,
    pub extract: ExtractOptions,
    pub popups: PopupHandler,
    /// Trigger candidates whose text is inspected.
    pub max_trigger_candidates: usize,
    /// Keyword-matching triggers actually clicked.
    pub max_trigger_clicks: usize,
    pub trigger_wait_ms: u64,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            extract: ExtractOptions::default(),
            popups: PopupHandler::default(),
            max_trigger_candidates: 10,
            max_trigger_clicks: 3,
            trigger_wait_ms: 2_000,
        }
    }
}

/// Everything learned from one page load.
#[derive(Debug, Clone, Serialize)]
pub struct PageCrawl {
    pub url: String,
    pub title: String,
    pub frameworks: FrameworkHints,
    pub load: LoadReport,
    pub popups: PopupOutcome,
    pub forms: Vec<FormRecord>,
}

/// Load `url`, clear popups and extract its form records.
pub fn crawl_page(
    driver: &mut dyn PageDriver,
    url: &str,
    options: &CrawlOptions,
) -> Result<PageCrawl, CrawlError> {
    info!("crawling {}", url);
    let load = load_page(driver, url, &options.load)?;
    let popups = options.popups.dismiss(driver);

    let title = match driver.title() {
        Ok(t) => t,
        Err(e) => {
            warn!("could not get page title: {}", e);
            String::new()
        }
    };

    let html = driver.content()?;
    let mut forms = extract_forms(&html, url, &options.extract)?;

    let mut frameworks = FrameworkHints::default();
    if options.extract.spa {
        frameworks = detect_frameworks(&html)?;
        info!(frameworks = ?frameworks.names(), "framework markers");
        let revealed = click_triggers(driver, url, forms.len() + 1, options)?;
        forms.extend(revealed);
    }

    info!(count = forms.len(), "forms extracted from {}", url);

    Ok(PageCrawl {
        url: url.to_string(),
        title,
        frameworks,
        load,
        popups,
        forms,
    })
}

/// Whether a trigger's visible text suggests it opens or submits a form.
pub fn is_form_trigger_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRIGGER_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Click form-looking triggers and collect any forms they reveal.
fn click_triggers(
    driver: &mut dyn PageDriver,
    url: &str,
    start_index: usize,
    options: &CrawlOptions,
) -> Result<Vec<FormRecord>, CrawlError> {
    let texts = match driver.texts(FORM_TRIGGERS, options.max_trigger_candidates) {
        Ok(t) => t,
        Err(e) => {
            warn!("could not read form triggers: {}", e);
            return Ok(Vec::new());
        }
    };

    let targets: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, text)| is_form_trigger_text(text))
        .map(|(i, _)| i)
        .take(options.max_trigger_clicks)
        .collect();

    info!(
        candidates = texts.len(),
        matching = targets.len(),
        "form-related triggers"
    );

    let mut revealed = Vec::new();
    for (n, index) in targets.into_iter().enumerate() {
        if let Err(e) = driver.click_nth(FORM_TRIGGERS, index) {
            warn!("error clicking trigger {}: {}", n + 1, e);
            continue;
        }
        if let Err(e) = driver.wait(options.trigger_wait_ms) {
            warn!("wait after trigger {} failed: {}", n + 1, e);
        }

        match driver.content() {
            Ok(html) => {
                let found = extract_dynamic_forms(&html, url, start_index + revealed.len(), n + 1)?;
                if !found.is_empty() {
                    info!("found {} forms after trigger click {}", found.len(), n + 1);
                }
                revealed.extend(found);
            }
            Err(e) => warn!("could not read page after trigger {}: {}", n + 1, e),
        }

        // Go back if the click navigated away
        match driver.current_url() {
            Ok(current) if current != url => {
                if let Err(e) = driver.navigate(url, options.load.timeout_ms, WaitUntil::Load) {
                    warn!("could not return to {}: {}", url, e);
                    break;
                }
                if let Err(e) = driver.wait(options.trigger_wait_ms) {
                    warn!("wait after returning to {} failed: {}", url, e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("could not read current URL: {}", e),
        }
    }

    Ok(revealed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_keywords_match_case_insensitively() {
        assert!(is_form_trigger_text("Sign Up"));
        assert!(is_form_trigger_text("CONTACT us"));
        assert!(is_form_trigger_text("Add to cart"));
        assert!(!is_form_trigger_text("Learn more"));
        assert!(!is_form_trigger_text(""));
    }
}
