use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RenderError;
use crate::render::{ProgressReporter, RenderEngine, RenderRequest};

static PERCENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").expect("percent pattern is valid")
});
static FRACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d+)\s*/\s*(\d+)\b").expect("fraction pattern is valid")
});

const STDERR_TAIL_LINES: usize = 20;

/// Progress fraction from one line of renderer output: `NN%` or `N/M`.
pub fn parse_progress(line: &str) -> Option<f64> {
    if let Some(caps) = PERCENT.captures(line) {
        let pct: f64 = caps[1].parse().ok()?;
        if (0.0..=100.0).contains(&pct) {
            return Some(pct / 100.0);
        }
    }
    let caps = FRACTION.captures(line)?;
    let done: f64 = caps[1].parse().ok()?;
    let total: f64 = caps[2].parse().ok()?;
    (total > 0.0 && done <= total).then(|| done / total)
}

/// Renders by spawning an external renderer CLI per job.
///
/// Invocation: `<program> <base args..> <composition> <output>
/// --props=<file> [--width=W] [--height=H]`. The props file is written next
/// to the output and removed afterwards.
#[derive(Debug, Clone)]
pub struct CommandRenderEngine {
    program: String,
    base_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandRenderEngine {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    fn build_command(
        &self,
        request: &RenderRequest,
        props_path: &std::path::Path,
    ) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg(&request.composition_id)
            .arg(&request.output_path)
            .arg(format!("--props={}", props_path.display()));
        if let Some(width) = request.width {
            cmd.arg(format!("--width={width}"));
        }
        if let Some(height) = request.height {
            cmd.arg(format!("--height={height}"));
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Forward progress from a child stream, keeping a short tail for errors.
async fn pump_output<R>(
    stream: R,
    progress: ProgressReporter,
    tail: Arc<Mutex<VecDeque<String>>>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(fraction) = parse_progress(&line) {
            progress.report(fraction);
        }
        let mut tail = tail.lock();
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
}

#[async_trait]
impl RenderEngine for CommandRenderEngine {
    async fn render(
        &self,
        request: RenderRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        if let Some(parent) = request.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let props_path = request.output_path.with_extension("props.json");
        let props = serde_json::to_vec(&request.input_props)
            .map_err(|err| RenderError::Engine(err.to_string()))?;
        tokio::fs::write(&props_path, props).await?;

        let mut cmd = self.build_command(&request, &props_path);
        info!(job_id = %request.job_id, command = ?cmd, "starting renderer");
        let mut child = cmd.spawn().map_err(|err| {
            RenderError::Engine(format!(
                "failed to spawn renderer '{}': {err}",
                self.program
            ))
        })?;

        let tail = Arc::new(Mutex::new(VecDeque::new()));
        let mut pumps = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump_output(
                stdout,
                progress.clone(),
                Arc::clone(&tail),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump_output(
                stderr,
                progress.clone(),
                Arc::clone(&tail),
            )));
        }

        let outcome = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let result = match outcome {
            None => {
                warn!(job_id = %request.job_id, "cancelling renderer process");
                if let Err(err) = child.kill().await {
                    warn!(job_id = %request.job_id, error = %err, "failed to kill renderer");
                }
                Err(RenderError::Cancelled)
            }
            Some(Err(err)) => Err(RenderError::Io(err.to_string())),
            Some(Ok(status)) if status.success() => {
                progress.report(1.0);
                Ok(())
            }
            Some(Ok(status)) => {
                let tail = tail.lock().iter().cloned().collect::<Vec<_>>();
                Err(RenderError::Engine(format!(
                    "renderer exited with {status}: {}",
                    tail.join("\n")
                )))
            }
        };

        for pump in pumps {
            pump.abort();
        }
        if let Err(err) = tokio::fs::remove_file(&props_path).await {
            debug!(path = %props_path.display(), error = %err, "props file cleanup skipped");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_percentages() {
        assert_eq!(parse_progress("Rendering 42%"), Some(0.42));
        assert_eq!(parse_progress("progress: 100 %"), Some(1.0));
    }

    #[test]
    fn parses_frame_counts() {
        assert_eq!(parse_progress("Rendered 30/120 frames"), Some(0.25));
        assert_eq!(parse_progress("Encoded 0/0"), None);
    }

    #[test]
    fn ignores_unrelated_lines() {
        assert_eq!(parse_progress("Bundling composition"), None);
        assert_eq!(parse_progress("Rendered 130/120"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = CommandRenderEngine::new("false", Vec::new());
        let request = RenderRequest {
            job_id: crate::render::JobId::new(),
            composition_id: "Intro".into(),
            input_props: serde_json::json!({}),
            width: None,
            height: None,
            output_path: dir.path().join("out.mp4"),
        };

        let result = engine
            .render(request, ProgressReporter::noop(), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RenderError::Engine(_))));
        assert!(!dir.path().join("out.props.json").exists());
    }
}
