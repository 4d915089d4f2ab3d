use scraper::{ElementRef, Html};
use serde::Serialize;

use crate::error::CrawlError;
use crate::extract::extractor::text_content;
use crate::extract::selectors::selectors;

/// Client-side framework markers found in the DOM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameworkHints {
    pub react: bool,
    pub angular: bool,
    pub vue: bool,
    /// `data-testid` / `data-cy` hooks, typical of SPA builds
    pub spa: bool,
}

impl FrameworkHints {
    pub fn any(&self) -> bool {
        self.react || self.angular || self.vue || self.spa
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.react {
            names.push("react");
        }
        if self.angular {
            names.push("angular");
        }
        if self.vue {
            names.push("vue");
        }
        if self.spa {
            names.push("spa");
        }
        names
    }
}

/// Anti-automation mechanisms that commonly hide forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Blocker {
    Cloudflare,
    Captcha,
}

impl Blocker {
    pub fn describe(&self) -> &'static str {
        match self {
            Blocker::Cloudflare => "Cloudflare protection detected",
            Blocker::Captcha => "Bot detection/CAPTCHA detected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ElementCounts {
    pub forms: usize,
    pub inputs: usize,
    pub buttons: usize,
    pub links: usize,
}

impl ElementCounts {
    pub fn has_interactive(&self) -> bool {
        self.inputs + self.buttons + self.links > 0
    }
}

pub fn detect_frameworks(html: &str) -> Result<FrameworkHints, CrawlError> {
    let sel = selectors()?;
    let doc = Html::parse_document(html);

    let vue = doc
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().attrs().any(|(name, _)| name.starts_with("data-v-")));

    Ok(FrameworkHints {
        react: doc.select(&sel.react).next().is_some(),
        angular: doc.select(&sel.angular).next().is_some(),
        vue,
        spa: doc.select(&sel.spa).next().is_some(),
    })
}

pub fn detect_blockers(html: &str) -> Result<Vec<Blocker>, CrawlError> {
    let sel = selectors()?;
    let doc = Html::parse_document(html);

    let mut blockers = Vec::new();
    if doc.select(&sel.cloudflare).next().is_some() {
        blockers.push(Blocker::Cloudflare);
    }
    if doc.select(&sel.bot_check).next().is_some() {
        blockers.push(Blocker::Captcha);
    }
    Ok(blockers)
}

pub fn count_interactive(html: &str) -> Result<ElementCounts, CrawlError> {
    let sel = selectors()?;
    let doc = Html::parse_document(html);

    Ok(ElementCounts {
        forms: doc.select(&sel.forms).count(),
        inputs: doc.select(&sel.inputs).count(),
        buttons: doc.select(&sel.buttons).count(),
        links: doc.select(&sel.links).count(),
    })
}

/// Text of the document's `<title>`, if any.
pub fn page_title(html: &str) -> Result<Option<String>, CrawlError> {
    let sel = selectors()?;
    let doc = Html::parse_document(html);
    Ok(doc.select(&sel.title).next().and_then(text_content))
}
