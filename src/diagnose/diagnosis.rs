use serde::Serialize;
use tracing::{info, warn};

use crate::browser::driver::PageDriver;
use crate::browser::loader::{LoadOptions, LoadReport, load_page};
use crate::error::CrawlError;
use crate::extract::page_signals::{
    Blocker, ElementCounts, FrameworkHints, count_interactive, detect_blockers, detect_frameworks,
    page_title,
};

/// Why a page may be slow, blocked or form-less.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub url: String,
    pub load: Option<LoadReport>,
    pub load_error: Option<String>,
    pub title: Option<String>,
    pub blockers: Vec<Blocker>,
    pub counts: ElementCounts,
    pub frameworks: FrameworkHints,
    pub slow: bool,
}

impl Diagnosis {
    pub fn loaded(&self) -> bool {
        self.load.is_some()
    }

    pub fn recommendations(&self) -> Vec<&'static str> {
        let mut recs = Vec::new();
        if !self.loaded() {
            recs.push("All load strategies failed; the site may be blocking automated access");
            return recs;
        }
        if !self.blockers.is_empty() {
            recs.push("Anti-bot protection found; try --headed or a different user agent");
        }
        if self.slow {
            recs.push("Slow loading site; consider increasing --timeout");
        }
        if self.counts.forms == 0 && self.counts.inputs > 0 {
            recs.push("Inputs without <form> elements; run crawl with --spa");
        }
        if self.frameworks.any() {
            recs.push("Client-side framework detected; forms may render after interaction (--spa)");
        }
        if !self.counts.has_interactive() {
            recs.push("No interactive elements; content may load after login or be inside an iframe");
        }
        recs
    }
}

pub fn diagnose(
    driver: &mut dyn PageDriver,
    url: &str,
    options: &LoadOptions,
) -> Result<Diagnosis, CrawlError> {
    info!("diagnosing {}", url);

    let load = match load_page(driver, url, options) {
        Ok(report) => report,
        Err(e) => {
            warn!("diagnosis could not load page: {}", e);
            return Ok(Diagnosis {
                url: url.to_string(),
                load: None,
                load_error: Some(e.to_string()),
                title: None,
                blockers: Vec::new(),
                counts: ElementCounts::default(),
                frameworks: FrameworkHints::default(),
                slow: false,
            });
        }
    };

    let html = driver.content()?;
    let title = match driver.title() {
        Ok(t) if !t.is_empty() => Some(t),
        Ok(_) => page_title(&html)?,
        Err(e) => {
            warn!("could not get page title: {}", e);
            page_title(&html)?
        }
    };

    let slow = load.is_slow();
    Ok(Diagnosis {
        url: url.to_string(),
        title,
        blockers: detect_blockers(&html)?,
        counts: count_interactive(&html)?,
        frameworks: detect_frameworks(&html)?,
        slow,
        load: Some(load),
        load_error: None,
    })
}

/// Human-readable diagnosis.
pub fn format_diagnosis(d: &Diagnosis) -> String {
    let mut out = format!("=== Diagnosis: {} ===\n\n", d.url);

    match (&d.load, &d.load_error) {
        (Some(load), _) => {
            out.push_str(&format!(
                "Loaded with '{}' after {} attempt(s) in {:.2}s{}\n",
                load.strategy.as_str(),
                load.attempts.len(),
                load.elapsed_ms as f64 / 1000.0,
                if load.network_idle { "" } else { " (network still busy)" }
            ));
            for (i, attempt) in load.attempts.iter().enumerate() {
                if let Some(err) = &attempt.error {
                    out.push_str(&format!(
                        "  strategy {} ({}, {}ms) failed: {}\n",
                        i + 1,
                        attempt.wait_until.as_str(),
                        attempt.timeout_ms,
                        err
                    ));
                }
            }
        }
        (None, Some(err)) => out.push_str(&format!("Load failed: {}\n", err)),
        (None, None) => out.push_str("Load failed\n"),
    }

    if d.loaded() {
        out.push_str(&format!("Title: {}\n", d.title.as_deref().unwrap_or("(none)")));
        for blocker in &d.blockers {
            out.push_str(&format!("WARNING: {}\n", blocker.describe()));
        }
        if d.slow {
            out.push_str("WARNING: Slow loading site detected\n");
        }
        out.push_str(&format!(
            "Elements: {} form(s), {} input(s), {} button(s), {} link(s)\n",
            d.counts.forms, d.counts.inputs, d.counts.buttons, d.counts.links
        ));
        let names = d.frameworks.names();
        out.push_str(&format!(
            "Frameworks: {}\n",
            if names.is_empty() {
                "none detected".to_string()
            } else {
                names.join(", ")
            }
        ));
    }

    let recs = d.recommendations();
    if !recs.is_empty() {
        out.push_str("\nRecommendations:\n");
        for rec in recs {
            out.push_str(&format!("  - {}\n", rec));
        }
    }

    out
}
