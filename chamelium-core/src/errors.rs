//! Error types for `chamelium_core`.
//!
//! All failures are funnelled through [`ChameliumError`], which uses
//! `thiserror` for `Display` and `Error` derives.  The CLI maps each
//! variant to an exit status, keeping this crate free of process concerns.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `chamelium_core` library.
///
/// Each variant corresponds to a distinct failure class.
#[derive(Debug, Error)]
pub enum ChameliumError {
    /// Bad or contradictory arguments.  Raised before the device is touched
    /// whenever the problem is detectable up front.
    #[error("{0}")]
    Usage(String),

    /// No usable device address.
    #[error("{0}")]
    Configuration(String),

    /// Transport, fault, or decoding failure of a single remote call.
    #[error("{method} failed: {message}")]
    RemoteCall { method: &'static str, message: String },

    /// Cannot create, read, or write a local file or directory.
    #[error("{}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Raw frame could not be encoded into the requested image format.
    #[error("frame conversion failed: {0}")]
    Conversion(String),
}

impl ChameliumError {
    /// Shorthand for [`ChameliumError::Usage`].
    pub fn usage(msg: impl Into<String>) -> Self {
        ChameliumError::Usage(msg.into())
    }

    /// Shorthand for [`ChameliumError::RemoteCall`].
    pub fn remote(method: &'static str, message: impl Into<String>) -> Self {
        ChameliumError::RemoteCall {
            method,
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it concerns.
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ChameliumError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether the error stems from the invocation rather than the device
    /// or the host.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ChameliumError::Usage(_) | ChameliumError::Configuration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_call_display_names_method() {
        let err = ChameliumError::remote("IsPlugged", "connection refused");
        assert_eq!(err.to_string(), "IsPlugged failed: connection refused");
        assert!(!err.is_usage());
    }

    #[test]
    fn test_filesystem_display_includes_path() {
        let err = ChameliumError::filesystem(
            "/tmp/frames",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("/tmp/frames: "));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_usage_and_configuration_are_usage_class() {
        assert!(ChameliumError::usage("bad").is_usage());
        assert!(ChameliumError::Configuration("missing".into()).is_usage());
        assert!(!ChameliumError::Conversion("size".into()).is_usage());
    }
}
