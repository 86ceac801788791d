//! Device address parsing and resolution.
//!
//! The address may come from three places, highest precedence first:
//! the subcommand's `--chameleon`, the top-level `--chameleon`, and
//! `$CHAMELEON_IP`.  Either a full `http(s)://` URL or a bare
//! `host[:port]` pair is accepted.

use std::fmt;

use crate::errors::ChameliumError;

/// Port `chameleond` listens on when the address does not name one.
pub const DEFAULT_RPC_PORT: u16 = 9992;

/// Environment variable holding the default device address.
pub const ADDRESS_ENV: &str = "CHAMELEON_IP";

/// Environment variable holding the default image viewer command.
pub const VIEWER_ENV: &str = "CHAMELEON_VIEWER";

/// A parsed device endpoint, always a full URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    url: String,
}

impl DeviceAddress {
    /// Parse a URL or `host[:port]` string.
    pub fn parse(raw: &str) -> Result<Self, ChameliumError> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self {
                url: raw.to_owned(),
            });
        }

        let (host, port) = match raw.split_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| {
                    ChameliumError::Configuration(format!("'{port}' is not a valid port"))
                })?;
                (host, port)
            }
            None => (raw, DEFAULT_RPC_PORT),
        };

        if host.is_empty() {
            return Err(ChameliumError::Configuration(format!(
                "'{raw}' is not a valid url"
            )));
        }

        Ok(Self {
            url: format!("http://{host}:{port}"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Pick the device address by precedence: command flag, global flag,
/// environment.
///
/// `env_value` is the content of [`ADDRESS_ENV`], passed in by the caller so
/// resolution stays free of process state.
pub fn resolve_address(
    command_flag: Option<&str>,
    global_flag: Option<&str>,
    env_value: Option<&str>,
) -> Result<DeviceAddress, ChameliumError> {
    if let Some(raw) = command_flag.or(global_flag) {
        return DeviceAddress::parse(raw);
    }

    match env_value {
        Some(raw) => DeviceAddress::parse(raw).map_err(|e| {
            ChameliumError::Configuration(format!("${ADDRESS_ENV}: {e}"))
        }),
        None => Err(ChameliumError::Configuration(format!(
            "${ADDRESS_ENV} is not set and --chameleon was not given"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_host_uses_default_port() {
        let addr = DeviceAddress::parse("10.0.0.5").unwrap();
        assert_eq!(addr.url(), "http://10.0.0.5:9992");
    }

    #[test]
    fn test_parse_host_with_port() {
        let addr = DeviceAddress::parse("chameleon.lan:8000").unwrap();
        assert_eq!(addr.url(), "http://chameleon.lan:8000");
    }

    #[test]
    fn test_parse_full_url_kept_verbatim() {
        let addr = DeviceAddress::parse("https://bench-3:9992/rpc").unwrap();
        assert_eq!(addr.to_string(), "https://bench-3:9992/rpc");
    }

    #[test]
    fn test_parse_invalid_port() {
        let err = DeviceAddress::parse("host:abc").unwrap_err();
        assert!(matches!(err, ChameliumError::Configuration(_)));
        assert_eq!(err.to_string(), "'abc' is not a valid port");
    }

    #[test]
    fn test_parse_empty_host() {
        assert!(DeviceAddress::parse(":9992").is_err());
        assert!(DeviceAddress::parse("").is_err());
    }

    #[test]
    fn test_command_flag_wins() {
        let addr = resolve_address(Some("a"), Some("b"), Some("c")).unwrap();
        assert_eq!(addr.url(), "http://a:9992");
    }

    #[test]
    fn test_global_flag_beats_environment() {
        let addr = resolve_address(None, Some("b"), Some("c")).unwrap();
        assert_eq!(addr.url(), "http://b:9992");
    }

    #[test]
    fn test_environment_fallback() {
        let addr = resolve_address(None, None, Some("c:1234")).unwrap();
        assert_eq!(addr.url(), "http://c:1234");
    }

    #[test]
    fn test_environment_error_is_prefixed() {
        let err = resolve_address(None, None, Some("c:x")).unwrap_err();
        assert_eq!(err.to_string(), "$CHAMELEON_IP: 'x' is not a valid port");
    }

    #[test]
    fn test_nothing_resolves() {
        let err = resolve_address(None, None, None).unwrap_err();
        assert!(matches!(err, ChameliumError::Configuration(_)));
        assert!(err.to_string().contains("--chameleon"));
    }
}
