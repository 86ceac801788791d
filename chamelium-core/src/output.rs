//! Where command results go.
//!
//! [`OutputTarget`] is resolved once per command: a named file, the
//! process's standard output, or a temporary file that lives until the
//! target is dropped.

use std::fmt;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::errors::ChameliumError;

/// Destination for a binary payload (an EDID dump or an encoded frame).
#[derive(Debug)]
pub enum OutputTarget {
    Path(PathBuf),
    StandardOutput,
    TemporaryFile(NamedTempFile),
}

impl OutputTarget {
    /// Map a command-line path to a target; `None` and `-` mean stdout.
    pub fn from_arg(arg: Option<&Path>) -> Self {
        match arg {
            None => OutputTarget::StandardOutput,
            Some(path) if path.as_os_str() == "-" => OutputTarget::StandardOutput,
            Some(path) => OutputTarget::Path(path.to_path_buf()),
        }
    }

    /// A fresh temporary file whose name ends with `suffix`.
    pub fn temporary(suffix: &str) -> Result<Self, ChameliumError> {
        tempfile::Builder::new()
            .prefix("chamelium-")
            .suffix(suffix)
            .tempfile()
            .map(OutputTarget::TemporaryFile)
            .map_err(|e| ChameliumError::filesystem(std::env::temp_dir(), e))
    }

    /// Filesystem path of the target, if it has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Path(path) => Some(path),
            OutputTarget::StandardOutput => None,
            OutputTarget::TemporaryFile(file) => Some(file.path()),
        }
    }

    /// Whether writing here would put raw bytes on an interactive terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutputTarget::StandardOutput) && io::stdout().is_terminal()
    }

    /// Replace the target's content with `bytes`.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ChameliumError> {
        self.write_bytes_to(bytes, &mut io::stdout().lock())
    }

    /// Like [`Self::write_bytes`], with `stdout` standing in for the
    /// process's standard output.
    pub fn write_bytes_to(&mut self, bytes: &[u8], stdout: &mut dyn Write) -> Result<(), ChameliumError> {
        match self {
            OutputTarget::Path(path) => {
                fs::write(&*path, bytes).map_err(|e| ChameliumError::filesystem(path.clone(), e))
            }
            OutputTarget::StandardOutput => stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(|e| ChameliumError::filesystem("<stdout>", e)),
            OutputTarget::TemporaryFile(file) => {
                let path = file.path().to_path_buf();
                fs::write(&path, bytes).map_err(|e| ChameliumError::filesystem(path, e))
            }
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{}", path.display()),
            None => f.write_str("-"),
        }
    }
}

/// Local-time suffix used for default output names, e.g. `20261019-141502`.
pub fn timestamp_suffix() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Write one human-readable progress line.
///
/// Best-effort: write failures are logged, never returned.
pub(crate) fn progress(out: &mut dyn Write, line: fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{line}") {
        log::debug!("progress output lost: {e}");
    }
}

/// Write `text` without a newline and flush, for in-place progress ticks.
pub(crate) fn progress_tick(out: &mut dyn Write, text: &str) {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        log::debug!("progress output lost: {e}");
    }
}
