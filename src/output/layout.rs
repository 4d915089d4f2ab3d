use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::CrawlError;

pub const DEFAULT_ROOT: &str = "test_cases";

/// Per-domain output tree:
///
/// ```text
/// <root>/<domain>/
///   json/  csv/  reports/  test_scripts/  test_data/
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub base: PathBuf,
    pub json: PathBuf,
    pub csv: PathBuf,
    pub reports: PathBuf,
    pub test_scripts: PathBuf,
    pub test_data: PathBuf,
}

impl OutputLayout {
    /// Paths for `url` under `root`, without touching the filesystem.
    pub fn for_url(root: &Path, url: &str) -> Self {
        let base = root.join(domain_dir(url));
        Self {
            json: base.join("json"),
            csv: base.join("csv"),
            reports: base.join("reports"),
            test_scripts: base.join("test_scripts"),
            test_data: base.join("test_data"),
            base,
        }
    }

    /// Resolve and create every directory.
    pub fn create(root: &Path, url: &str) -> Result<Self, CrawlError> {
        let layout = Self::for_url(root, url);
        for dir in layout.dirs() {
            fs::create_dir_all(dir).map_err(|e| CrawlError::io(dir, e))?;
        }
        Ok(layout)
    }

    pub fn dirs(&self) -> [&PathBuf; 5] {
        [
            &self.json,
            &self.csv,
            &self.reports,
            &self.test_scripts,
            &self.test_data,
        ]
    }
}

/// Directory name for a URL: scheme dropped, anything outside
/// `[A-Za-z0-9_.-]` replaced by `_`.
pub fn domain_dir(url: &str) -> String {
    let rest = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => url,
    };
    rest.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// `form_<index>_<slug>_<timestamp>`
pub fn file_stem(form_index: usize, form_type_slug: &str, stamp: &str) -> String {
    format!("form_{}_{}_{}", form_index, form_type_slug, stamp)
}

/// Write `contents` to `path`, mapping failures to [`CrawlError::Io`].
pub fn write_file(path: &Path, contents: &str) -> Result<(), CrawlError> {
    fs::write(path, contents).map_err(|e| CrawlError::io(path, e))
}
