use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::shorts::error::{ShortsError, ShortsResult};
use crate::ui::prelude::{Level, emit};

/// Lines of engine output kept when no line looks like an error.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Runs the compositing engine with a prepared argument list.
///
/// Dropping the returned future must stop the engine process.
#[async_trait]
pub trait EngineRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> ShortsResult<()>;
}

/// Runs the system ffmpeg binary.
#[derive(Debug, Clone)]
pub struct SystemEngineRunner {
    binary: PathBuf,
}

impl SystemEngineRunner {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

/// Locate the engine binary once at startup.
///
/// Values containing a path separator are used as-is; bare names are looked
/// up on PATH.
pub fn resolve_engine(binary: &str) -> Result<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        anyhow::bail!("ffmpeg binary not found at {}", candidate.display());
    }
    which::which(binary).with_context(|| format!("'{binary}' not found on PATH"))
}

#[async_trait]
impl EngineRunner for SystemEngineRunner {
    async fn run(&self, args: &[String]) -> ShortsResult<()> {
        emit(
            Level::Debug,
            "shorts.render.command",
            &format!("{} {}", self.binary.display(), args.join(" ")),
            None,
        );

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ShortsError::RenderEngineFailed {
                status: None,
                diagnostics: format!("failed to spawn {}: {err}", self.binary.display()),
            })?;

        let mut output = EngineOutput::default();
        let read_result = match child.stderr.take() {
            Some(stderr) => read_engine_stderr(stderr, &mut output).await,
            None => Ok(()),
        };

        let status = child.wait().await.map_err(|err| ShortsError::RenderEngineFailed {
            status: None,
            diagnostics: format!("failed to wait for engine: {err}"),
        })?;

        if let Err(err) = read_result {
            emit(
                Level::Debug,
                "shorts.render.stderr",
                &format!("Engine output could not be read: {err:#}"),
                None,
            );
        }

        if !status.success() {
            return Err(ShortsError::RenderEngineFailed {
                status: status.code(),
                diagnostics: output.diagnostics(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct EngineOutput {
    error_lines: Vec<String>,
    tail: Vec<String>,
}

impl EngineOutput {
    fn push_line(&mut self, line: &str) {
        if line.contains("error") || line.contains("Error") || line.contains("ERROR") {
            self.error_lines.push(line.to_string());
        }
        if self.tail.len() == DIAGNOSTIC_TAIL_LINES {
            self.tail.remove(0);
        }
        self.tail.push(line.to_string());
    }

    fn diagnostics(&self) -> String {
        let lines = if self.error_lines.is_empty() {
            &self.tail
        } else {
            &self.error_lines
        };
        lines.join("\n").trim().to_string()
    }
}

async fn read_engine_stderr<R: AsyncRead + Unpin>(mut stderr: R, output: &mut EngineOutput) -> Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr
            .read(&mut buffer)
            .await
            .context("Failed to read ffmpeg stderr")?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated = accumulated[pos + 1..].to_string();
            if !line.is_empty() {
                output.push_line(&line);
            }
        }
    }

    if !accumulated.is_empty() {
        output.push_line(&accumulated);
    }
    Ok(())
}
