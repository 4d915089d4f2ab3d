use std::path::Path;
use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use crate::ai::classifier::{FormClassifier, HeuristicClassifier, LlmClassifier};
use crate::ai::generator::{LlmTestCaseGenerator, RuleBasedGenerator, TestCaseGenerator};
use crate::ai::inference::{
    OllamaBackend, OpenAiBackend, RetryingInference, TextInference,
};
use crate::browser::loader::LoadOptions;
use crate::browser::session::{BrowserSession, LaunchOptions};
use crate::cli::config::{AiConfig, ClassifierKind, GeneratorKind, ReportFormat};
use crate::crawl::crawler::{CrawlOptions, PageCrawl, crawl_page};
use crate::diagnose::diagnosis::{diagnose, format_diagnosis};
use crate::output::console::{format_forms, format_test_cases};
use crate::output::csv::forms_csv;
use crate::output::layout::{OutputLayout, write_file};
use crate::output::writer::{write_forms_json, write_generation};
use crate::report::console::format_console_report;
use crate::report::junit::generate_junit_xml;
use crate::runner::script_runner::{RunnerOptions, discover_scripts, run_all, save_results};
use crate::testcase::testcase_model::FormTestSuite;

const INFERENCE_ATTEMPTS: u32 = 3;
const INFERENCE_BACKOFF: Duration = Duration::from_secs(2);

/// Printed when a page yields no form records.
pub const NO_FORMS_MESSAGE: &str = "No forms found on this page.
Likely causes:
  - forms render only after JavaScript interaction (try --spa)
  - a popup, cookie wall or login gate hides the content
  - anti-bot protection served a challenge page (try `diagnose`)
  - the form lives inside an iframe
  - the page loaded slowly (try --timeout)";

/// Model settings resolved from CLI flags and the config file.
#[derive(Debug, Clone, Default)]
pub struct ModelSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub ollama_endpoint: Option<String>,
    pub ollama_model: Option<String>,
}

impl ModelSettings {
    pub fn resolve(
        api_key: Option<String>,
        model: Option<String>,
        endpoint: Option<String>,
        config: &AiConfig,
    ) -> Self {
        Self {
            api_key,
            model: model.or_else(|| config.model.clone()),
            endpoint: endpoint.or_else(|| config.endpoint.clone()),
            ollama_endpoint: config.ollama_endpoint.clone(),
            ollama_model: config.ollama_model.clone(),
        }
    }
}

// ============================================================================
// crawl subcommand
// ============================================================================

fn crawl_with_session(
    url: &str,
    crawl: &CrawlOptions,
    launch: &LaunchOptions,
) -> Result<PageCrawl, Box<dyn std::error::Error>> {
    let mut session = BrowserSession::launch(launch)?;
    let result = crawl_page(&mut session, url, crawl);
    session.quit()?;
    Ok(result?)
}

/// Crawl a page and print its form records. Returns the number found.
pub fn cmd_crawl(
    url: &str,
    crawl: &CrawlOptions,
    launch: &LaunchOptions,
    csv_path: Option<&str>,
    json_path: Option<&str>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let page = crawl_with_session(url, crawl, launch)?;

    if page.forms.is_empty() {
        println!("{}", NO_FORMS_MESSAGE);
        return Ok(0);
    }

    println!("Found {} form(s) on {} ({})", page.forms.len(), url, page.title);
    print!("{}", format_forms(&page.forms));

    if let Some(path) = csv_path {
        write_file(Path::new(path), &forms_csv(&page.forms))?;
        println!("Forms CSV written to {}", path);
    }
    if let Some(path) = json_path {
        write_forms_json(Path::new(path), &page.forms)?;
        println!("Form records written to {}", path);
    }

    Ok(page.forms.len())
}

// ============================================================================
// generate subcommand
// ============================================================================

pub fn cmd_generate(
    url: &str,
    crawl: &CrawlOptions,
    launch: &LaunchOptions,
    generator: &dyn TestCaseGenerator,
    classifier: &dyn FormClassifier,
    output_root: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = crawl_with_session(url, crawl, launch)?;

    if page.forms.is_empty() {
        println!("{}", NO_FORMS_MESSAGE);
        return Ok(());
    }
    println!("Found {} form(s)", page.forms.len());

    let layout = OutputLayout::create(Path::new(output_root), url)?;
    println!("Output directory: {}", layout.base.display());

    let suites = generate_suites(&page, generator, classifier);
    for suite in &suites {
        print!("{}", format_test_cases(suite, url));
    }

    let files = write_generation(&layout, url, &page.forms, &suites, &Local::now())?;

    println!("\nTest cases saved in {}", layout.base.display());
    if let Some(readme) = &files.readme {
        println!("  README: {}", readme.display());
    }
    for dir in layout.dirs() {
        println!("  {}", dir.display());
    }
    println!("  Total files generated: {}", files.total());
    Ok(())
}

/// One suite per form; a suite whose type the generator left open gets the
/// classifier's label.
pub fn generate_suites(
    page: &PageCrawl,
    generator: &dyn TestCaseGenerator,
    classifier: &dyn FormClassifier,
) -> Vec<FormTestSuite> {
    let total = page.forms.len();
    page.forms
        .iter()
        .enumerate()
        .map(|(i, form)| {
            info!("generating test cases for form {}/{}", i + 1, total);
            let mut suite = generator.generate(form);
            let open = suite.form_type.trim().is_empty()
                || suite.form_type.eq_ignore_ascii_case("unknown form type");
            if open {
                suite.form_type = classifier.classify(form).display_name().to_string();
            }
            suite
        })
        .collect()
}

// ============================================================================
// run subcommand
// ============================================================================

/// Run generated scripts and return whether all passed.
pub fn cmd_run(
    dir: &str,
    format: ReportFormat,
    output: Option<&str>,
    options: &RunnerOptions,
) -> Result<bool, Box<dyn std::error::Error>> {
    let dir = Path::new(dir);
    if discover_scripts(dir)?.is_empty() {
        eprintln!("No test scripts found under: {}", dir.display());
        return Ok(true);
    }

    let summary = run_all(dir, options)?;
    let results_path = save_results(&summary, dir)?;
    info!("results saved to {}", results_path.display());

    let output_content = match format {
        ReportFormat::Junit => generate_junit_xml(&summary),
        ReportFormat::Json => serde_json::to_string_pretty(&summary)?,
        ReportFormat::Console => format_console_report(&summary),
    };

    match output {
        Some(path) => std::fs::write(path, &output_content)?,
        None => print!("{}", output_content),
    }

    Ok(summary.all_passed())
}

// ============================================================================
// diagnose subcommand
// ============================================================================

pub fn cmd_diagnose(
    url: &str,
    load: &LoadOptions,
    launch: &LaunchOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = BrowserSession::launch(launch)?;
    let diagnosis = diagnose(&mut session, url, load);
    session.quit()?;
    print!("{}", format_diagnosis(&diagnosis?));
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Model backend for a generator kind; `None` for the rule-based generator.
/// `json_output` asks backends that support it for a JSON-only answer.
pub fn build_backend(
    kind: GeneratorKind,
    settings: &ModelSettings,
    json_output: bool,
) -> Result<Option<Box<dyn TextInference>>, Box<dyn std::error::Error>> {
    let backend: Box<dyn TextInference> = match kind {
        GeneratorKind::Rule => return Ok(None),
        GeneratorKind::Openai => {
            let mut backend = OpenAiBackend::new(settings.api_key.clone())?;
            if let Some(model) = &settings.model {
                backend = backend.with_model(model);
            }
            if let Some(endpoint) = &settings.endpoint {
                backend = backend.with_endpoint(endpoint);
            }
            Box::new(RetryingInference::new(backend, INFERENCE_ATTEMPTS, INFERENCE_BACKOFF))
        }
        GeneratorKind::Ollama => {
            let mut backend = OllamaBackend::default();
            if let Some(endpoint) = settings.ollama_endpoint.as_ref().or(settings.endpoint.as_ref()) {
                backend.endpoint = endpoint.clone();
            }
            if let Some(model) = settings.ollama_model.as_ref().or(settings.model.as_ref()) {
                backend.model = model.clone();
            }
            if !json_output {
                backend = backend.plain_text();
            }
            Box::new(RetryingInference::new(backend, INFERENCE_ATTEMPTS, INFERENCE_BACKOFF))
        }
    };
    Ok(Some(backend))
}

pub fn build_generator(
    kind: GeneratorKind,
    settings: &ModelSettings,
) -> Result<Box<dyn TestCaseGenerator>, Box<dyn std::error::Error>> {
    Ok(match build_backend(kind, settings, true)? {
        Some(backend) => Box::new(LlmTestCaseGenerator::new(backend)),
        None => Box::new(RuleBasedGenerator),
    })
}

/// The LLM classifier shares the generator's backend kind; with the
/// rule-based generator it falls back to the heuristic.
pub fn build_classifier(
    kind: ClassifierKind,
    generator: GeneratorKind,
    settings: &ModelSettings,
) -> Result<Box<dyn FormClassifier>, Box<dyn std::error::Error>> {
    if kind == ClassifierKind::Heuristic {
        return Ok(Box::new(HeuristicClassifier));
    }
    match build_backend(generator, settings, false)? {
        Some(backend) => Ok(Box::new(LlmClassifier::new(backend))),
        None => {
            warn!("llm classifier needs a model generator; using heuristic");
            Ok(Box::new(HeuristicClassifier))
        }
    }
}
