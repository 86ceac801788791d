//! Screenshot options: validation and output resolution.
//!
//! Both happen before the board is contacted.  Single-frame options
//! (`--output`, `--view`) and multi-frame options (`--output-dir`,
//! `--file-prefix`) are mutually exclusive, keyed on the frame count.

use std::fs;
use std::path::{Path, PathBuf};

use crate::device::Area;
use crate::errors::ChameliumError;
use crate::output::{timestamp_suffix, OutputTarget};

/// Prefix of default screenshot file and directory names.
pub const DEFAULT_NAME_PREFIX: &str = "chamelium-screenshot";

/// Frame-name prefix used in multi-frame mode when none is given.
pub const DEFAULT_FRAME_PREFIX: &str = "frame";

/// Everything the operator asked for in one `screenshot` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotRequest {
    /// Unplug and replug a plugged port before capturing.
    pub replug: bool,
    /// EDID blob to apply for the capture.
    pub edid: Option<Vec<u8>>,
    /// Explicit capture area; the detected resolution otherwise.
    pub area: Option<Area>,
    /// Explicit port; the first connected input otherwise.
    pub port: Option<u32>,
    pub count: u32,
    /// Single-frame destination; `-` is standard output.
    pub output: Option<PathBuf>,
    /// Viewer command; an empty string selects `$CHAMELEON_VIEWER`.
    pub viewer: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub file_prefix: Option<String>,
}

impl Default for ScreenshotRequest {
    fn default() -> Self {
        Self {
            replug: false,
            edid: None,
            area: None,
            port: None,
            count: 1,
            output: None,
            viewer: None,
            output_dir: None,
            file_prefix: None,
        }
    }
}

/// Resolved destination of the captured frames.
#[derive(Debug)]
pub enum CaptureOutput {
    Single {
        target: OutputTarget,
        viewer: Option<String>,
    },
    Multi {
        dir: PathBuf,
        prefix: String,
    },
}

impl CaptureOutput {
    /// Whether the single frame goes to standard output.
    pub fn writes_to_stdout(&self) -> bool {
        matches!(
            self,
            CaptureOutput::Single {
                target: OutputTarget::StandardOutput,
                ..
            }
        )
    }

    /// File name of frame `index` in multi-frame mode.
    pub fn frame_path(dir: &Path, prefix: &str, index: u32) -> PathBuf {
        dir.join(format!("{prefix}-{index}.png"))
    }
}

impl ScreenshotRequest {
    /// Reject contradictory option sets.
    pub fn validate(&self) -> Result<(), ChameliumError> {
        if self.count == 0 {
            return Err(ChameliumError::usage("--count must be at least 1"));
        }
        if self.count > 1 {
            if self.output.is_some() {
                return Err(ChameliumError::usage(
                    "--output is only for single-frame captures",
                ));
            }
            if self.viewer.is_some() {
                return Err(ChameliumError::usage(
                    "--view cannot be used in multi-frame capture mode",
                ));
            }
        } else {
            if self.output_dir.is_some() {
                return Err(ChameliumError::usage(
                    "--output-dir is only for multi-frame captures",
                ));
            }
            if self.file_prefix.is_some() {
                return Err(ChameliumError::usage(
                    "--file-prefix is only for multi-frame captures",
                ));
            }
        }
        Ok(())
    }

    /// Validate, then resolve where frames go.
    ///
    /// `env_viewer` is the content of `$CHAMELEON_VIEWER`.  In multi-frame
    /// mode the output directory is created here.
    pub fn resolve_output(&self, env_viewer: Option<&str>) -> Result<CaptureOutput, ChameliumError> {
        self.validate()?;

        if self.count > 1 {
            let dir = self
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{DEFAULT_NAME_PREFIX}-{}", timestamp_suffix())));
            ensure_directory(&dir)?;
            let prefix = self
                .file_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_FRAME_PREFIX.to_owned());
            return Ok(CaptureOutput::Multi { dir, prefix });
        }

        let viewer = self.resolve_viewer(env_viewer)?;
        let target = match (&self.output, &viewer) {
            (Some(path), _) => OutputTarget::from_arg(Some(path.as_path())),
            (None, Some(_)) => OutputTarget::temporary(".png")?,
            (None, None) => OutputTarget::Path(PathBuf::from(format!(
                "{DEFAULT_NAME_PREFIX}-{}.png",
                timestamp_suffix()
            ))),
        };

        if viewer.is_some() && target.path().is_none() {
            return Err(ChameliumError::usage(
                "--view needs a file to open, not standard output",
            ));
        }

        Ok(CaptureOutput::Single { target, viewer })
    }

    fn resolve_viewer(&self, env_viewer: Option<&str>) -> Result<Option<String>, ChameliumError> {
        match self.viewer.as_deref().map(str::trim) {
            None => Ok(None),
            Some("") => match env_viewer.map(str::trim).filter(|v| !v.is_empty()) {
                Some(cmd) => Ok(Some(cmd.to_owned())),
                None => Err(ChameliumError::usage(format!(
                    "--view: no command given and ${} is not set",
                    crate::config::VIEWER_ENV
                ))),
            },
            Some(cmd) => Ok(Some(cmd.to_owned())),
        }
    }
}

/// Create `dir` if missing; fail if something else already has that name.
fn ensure_directory(dir: &Path) -> Result<(), ChameliumError> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(ChameliumError::usage(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    fs::create_dir(dir).map_err(|e| ChameliumError::filesystem(dir, e))
}
