use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::CrawlError;
use crate::extract::form_model::FormRecord;
use crate::output::csv::{forms_csv, test_cases_csv};
use crate::output::layout::{OutputLayout, file_stem, timestamp, write_file};
use crate::output::markdown::{form_report, readme};
use crate::output::pytest::generate_script;
use crate::testcase::testcase_model::FormTestSuite;

/// Files written for one form's suite.
#[derive(Debug, Clone)]
pub struct SuiteFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub report: PathBuf,
    pub script: PathBuf,
}

/// Everything a generation run wrote.
#[derive(Debug, Clone, Default)]
pub struct GeneratedFiles {
    pub suites: Vec<SuiteFiles>,
    pub forms_json: Option<PathBuf>,
    pub forms_csv: Option<PathBuf>,
    pub readme: Option<PathBuf>,
}

impl GeneratedFiles {
    pub fn total(&self) -> usize {
        self.suites.len() * 4
            + usize::from(self.forms_json.is_some())
            + usize::from(self.forms_csv.is_some())
            + usize::from(self.readme.is_some())
    }
}

/// Pretty JSON array of form records.
pub fn forms_json(forms: &[FormRecord]) -> Result<String, CrawlError> {
    serde_json::to_string_pretty(forms).map_err(|source| CrawlError::JsonSerialize {
        context: "form records".to_string(),
        source,
    })
}

pub fn write_forms_json(path: &Path, forms: &[FormRecord]) -> Result<(), CrawlError> {
    write_file(path, &forms_json(forms)?)
}

/// Load form records previously written by [`write_forms_json`].
pub fn read_forms_json(path: &Path) -> Result<Vec<FormRecord>, CrawlError> {
    let text = std::fs::read_to_string(path).map_err(|e| CrawlError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| CrawlError::JsonParse {
        context: path.display().to_string(),
        source,
    })
}

/// Write the extracted records into `test_data/` as JSON and CSV.
pub fn write_form_records(
    layout: &OutputLayout,
    forms: &[FormRecord],
    now: &DateTime<Local>,
    files: &mut GeneratedFiles,
) -> Result<(), CrawlError> {
    let stamp = timestamp(now);
    let json_path = layout.test_data.join(format!("forms_{}.json", stamp));
    write_forms_json(&json_path, forms)?;
    let csv_path = layout.test_data.join(format!("forms_{}.csv", stamp));
    write_file(&csv_path, &forms_csv(forms))?;

    files.forms_json = Some(json_path);
    files.forms_csv = Some(csv_path);
    Ok(())
}

/// Write JSON, CSV, Markdown and pytest files for one suite.
pub fn write_suite(
    layout: &OutputLayout,
    suite: &FormTestSuite,
    url: &str,
    now: &DateTime<Local>,
) -> Result<SuiteFiles, CrawlError> {
    let stem = file_stem(suite.form_index, &suite.form_type_slug(), &timestamp(now));
    let human_time = now.format("%Y-%m-%d %H:%M:%S").to_string();

    let json = layout.json.join(format!("{}.json", stem));
    let body = serde_json::to_string_pretty(suite).map_err(|source| CrawlError::JsonSerialize {
        context: format!("test suite for form {}", suite.form_index),
        source,
    })?;
    write_file(&json, &body)?;

    let csv = layout.csv.join(format!("{}.csv", stem));
    write_file(&csv, &test_cases_csv(suite))?;

    let report = layout.reports.join(format!("{}.md", stem));
    write_file(&report, &form_report(suite, url, &human_time))?;

    let script = layout.test_scripts.join(format!("test_{}.py", stem));
    write_file(&script, &generate_script(suite, url, &human_time))?;

    info!(form_index = suite.form_index, "wrote {}", stem);

    Ok(SuiteFiles {
        json,
        csv,
        report,
        script,
    })
}

pub fn write_readme(
    layout: &OutputLayout,
    url: &str,
    suites: &[FormTestSuite],
    now: &DateTime<Local>,
) -> Result<PathBuf, CrawlError> {
    let dir_name = layout
        .base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = layout.base.join("README.md");
    write_file(
        &path,
        &readme(&dir_name, url, suites, &now.format("%Y-%m-%d %H:%M:%S").to_string()),
    )?;
    Ok(path)
}

/// Write the whole output tree for a generation run.
pub fn write_generation(
    layout: &OutputLayout,
    url: &str,
    forms: &[FormRecord],
    suites: &[FormTestSuite],
    now: &DateTime<Local>,
) -> Result<GeneratedFiles, CrawlError> {
    let mut files = GeneratedFiles::default();
    write_form_records(layout, forms, now, &mut files)?;
    for suite in suites {
        files.suites.push(write_suite(layout, suite, url, now)?);
    }
    files.readme = Some(write_readme(layout, url, suites, now)?);
    Ok(files)
}
