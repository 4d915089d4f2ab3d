use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::CrawlError;
use crate::report::report_model::{RunSummary, ScriptResult};
use crate::runner::hardener::{FIXED_PREFIX, harden_script};

/// Characters of captured output kept per script.
pub const OUTPUT_TAIL_CHARS: usize = 4_000;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for output readers once the script is gone.
const READER_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub program: String,
    /// Arguments placed before the script file name
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Pause between scripts
    pub pause: Duration,
    /// Run a hardened `fixed_` copy instead of the original
    pub harden: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["-m".into(), "pytest".into(), "-q".into()],
            timeout: Duration::from_secs(90),
            pause: Duration::from_secs(2),
            harden: false,
        }
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Every `test_*.py` under `dir`, sorted, skipping hardened copies.
pub fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>, CrawlError> {
    let mut found = Vec::new();
    walk(dir, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), CrawlError> {
    let entries = fs::read_dir(dir).map_err(|e| CrawlError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CrawlError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, found)?;
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("test_") && name.ends_with(".py") && !name.starts_with(FIXED_PREFIX) {
            found.push(path);
        }
    }
    Ok(())
}

// ============================================================================
// Execution
// ============================================================================

fn drain<R: Read + Send + 'static>(source: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = source {
            let _ = r.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Scripts start their own process group so browsers they launch can be
/// killed with them.
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

/// SIGKILL the script's process group. Stragglers keep the output pipes open.
#[cfg(unix)]
fn kill_group(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!("process group {} already gone: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else {
        s.chars().skip(count - max).collect()
    }
}

/// Poll until exit or timeout. Returns `None` when the child was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<i32>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status.code().unwrap_or(-1)));
        }
        if Instant::now() >= deadline {
            kill_group(child);
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run one script in its own directory. Never fails: spawn errors and
/// timeouts become failed results.
pub fn run_script(path: &Path, options: &RunnerOptions) -> ScriptResult {
    let started = Instant::now();
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut result = ScriptResult {
        script: path.display().to_string(),
        passed: false,
        exit_code: None,
        duration_ms: 0,
        timed_out: false,
        output: String::new(),
        error: None,
    };

    let mut command = Command::new(&options.program);
    command
        .args(&options.args)
        .arg(&file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    isolate(&mut command);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    info!("running {}", path.display());
    let mut child = match command.spawn() {
        Ok(c) => c,
        Err(e) => {
            let err = CrawlError::ScriptExecution {
                script: result.script.clone(),
                message: format!("could not start {}: {}", options.program, e),
            };
            warn!("{}", err);
            result.error = Some(err.to_string());
            result.duration_ms = started.elapsed().as_millis();
            return result;
        }
    };

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    match wait_with_timeout(&mut child, options.timeout) {
        Ok(Some(code)) => {
            result.exit_code = Some(code);
            result.passed = code == 0;
            // Browsers left behind by the script
            kill_group(&mut child);
        }
        Ok(None) => {
            result.timed_out = true;
            result.error = Some(format!("timed out after {}s", options.timeout.as_secs_f64()));
            warn!("{} timed out", path.display());
        }
        Err(e) => {
            result.error = Some(format!("wait failed: {}", e));
        }
    }

    let mut output = stdout.recv_timeout(READER_GRACE).unwrap_or_default();
    let err_text = stderr.recv_timeout(READER_GRACE).unwrap_or_default();
    if !err_text.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&err_text);
    }
    result.output = tail(&output, OUTPUT_TAIL_CHARS);
    result.duration_ms = started.elapsed().as_millis();

    if result.passed {
        info!("PASS {} ({} ms)", result.name(), result.duration_ms);
    } else {
        warn!("FAIL {} ({} ms)", result.name(), result.duration_ms);
    }
    result
}

/// Discover and run every script under `dir`.
pub fn run_all(dir: &Path, options: &RunnerOptions) -> Result<RunSummary, CrawlError> {
    let scripts = discover_scripts(dir)?;
    info!("found {} test scripts under {}", scripts.len(), dir.display());

    let started_at = Local::now();
    let clock = Instant::now();
    let mut results = Vec::with_capacity(scripts.len());

    for (i, script) in scripts.iter().enumerate() {
        if i > 0 && !options.pause.is_zero() {
            thread::sleep(options.pause);
        }

        let target = if options.harden {
            match harden_script(script) {
                Ok(fixed) => fixed,
                Err(e) => {
                    warn!("could not harden {}, running original: {}", script.display(), e);
                    script.clone()
                }
            }
        } else {
            script.clone()
        };

        results.push(run_script(&target, options));
    }

    let finished_at = Local::now();
    Ok(
        RunSummary::from_results(&dir.display().to_string(), results).with_timing(
            started_at.to_rfc3339(),
            finished_at.to_rfc3339(),
            clock.elapsed().as_millis(),
        ),
    )
}

/// Write `test_results_<timestamp>.json` into `dir`.
pub fn save_results(summary: &RunSummary, dir: &Path) -> Result<PathBuf, CrawlError> {
    let path = dir.join(format!(
        "test_results_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let body = serde_json::to_string_pretty(summary).map_err(|source| CrawlError::JsonSerialize {
        context: "run summary".to_string(),
        source,
    })?;
    fs::write(&path, body).map_err(|e| CrawlError::io(&path, e))?;
    Ok(path)
}
