// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reporter configuration.
//!
//! The opt-out signal is resolved once by the host, either through
//! [`opt_out_from_env`] or [`ReporterConfig::from_env`], and handed to the
//! reporter as the `enabled` field. The reporter itself never reads the
//! process environment.

use std::collections::HashMap;
use std::env;
use std::fmt;

use reqwest::Url;

use crate::error::ReporterError;

/// If set to any non-empty value, telemetry reporting is disabled.
pub const OPT_OUT_ENV_VAR: &str = "NSH_NO_TELEMETRY";
/// Telemetry server base URL.
pub const BASE_URL_ENV_VAR: &str = "TELEMETRY_BASE_URL";
/// Bearer token sent with every report.
pub const AUTH_TOKEN_ENV_VAR: &str = "TELEMETRY_AUTH_TOKEN";
/// Comma separated tags appended to every report.
pub const TAGS_ENV_VAR: &str = "TELEMETRY_TAGS";

/// Returns `true` when the opt-out environment variable is set to a non-empty value.
pub fn opt_out_from_env() -> bool {
    env::var_os(OPT_OUT_ENV_VAR).is_some_and(|value| !value.is_empty())
}

/// Telemetry reporter configuration.
#[derive(Clone)]
pub struct ReporterConfig {
    /// Telemetry server base URL.
    pub base_url: String,
    /// Bearer token for the `Authorization` header; empty means no header.
    pub auth_token: String,
    /// Tags appended to every reported event.
    pub tags: Vec<String>,
    /// Optional HTTP client. When absent the reporter builds one that only
    /// trusts the embedded root certificates.
    pub http_client: Option<reqwest::Client>,
    /// Resolved opt-out state. A disabled reporter drops every event.
    pub enabled: bool,
    /// Append a `backend` tag to events that carry no `web` tag.
    pub default_backend_tag: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_token: String::new(),
            tags: Vec::new(),
            http_client: None,
            enabled: true,
            default_backend_tag: false,
        }
    }
}

impl fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth_token = if self.auth_token.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("ReporterConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &auth_token)
            .field("tags", &self.tags)
            .field("http_client", &self.http_client.is_some())
            .field("enabled", &self.enabled)
            .field("default_backend_tag", &self.default_backend_tag)
            .finish()
    }
}

impl ReporterConfig {
    /// Creates a configuration pointed at `base_url` with reporting enabled.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables
    ///
    /// Only the telemetry variables are read, so unrelated entries that are
    /// not valid Unicode do not matter.
    pub fn from_env() -> Result<Self, ReporterError> {
        let mut vars: Vec<(&str, String)> = [BASE_URL_ENV_VAR, AUTH_TOKEN_ENV_VAR, TAGS_ENV_VAR]
            .into_iter()
            .filter_map(|key| env::var(key).ok().map(|value| (key, value)))
            .collect();
        // Any non-empty value opts out, Unicode or not.
        if opt_out_from_env() {
            vars.push((OPT_OUT_ENV_VAR, "1".to_string()));
        }
        Self::from_env_iter(vars)
    }

    /// Builds the configuration from key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Result<Self, ReporterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let enabled = map
            .get(OPT_OUT_ENV_VAR)
            .map_or(true, |value| value.is_empty());
        let base_url = map
            .get(BASE_URL_ENV_VAR)
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let auth_token = map
            .get(AUTH_TOKEN_ENV_VAR)
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let tags = map
            .get(TAGS_ENV_VAR)
            .map(|value| parse_tags(value))
            .unwrap_or_default();

        let config = Self {
            base_url,
            auth_token,
            tags,
            enabled,
            ..Default::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ReporterError> {
        if self.base_url.trim().is_empty() {
            return Err(ReporterError::InvalidConfig(format!(
                "{BASE_URL_ENV_VAR} cannot be empty"
            )));
        }

        let url = Url::parse(&self.base_url).map_err(|e| {
            ReporterError::InvalidConfig(format!("Invalid base URL '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReporterError::InvalidConfig(format!(
                "Unsupported base URL scheme '{}'. Must be http or https",
                url.scheme()
            )));
        }

        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(ReporterError::InvalidConfig(
                "Tags cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Splits a comma separated tag list, ignoring blank entries.
fn parse_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config_is_enabled() {
        let config = ReporterConfig::default();
        assert!(config.enabled);
        assert!(!config.default_backend_tag);
        assert!(config.http_client.is_none());
    }

    #[test]
    fn test_from_env_iter_reads_all_fields() {
        let config = ReporterConfig::from_env_iter([
            (BASE_URL_ENV_VAR, "https://telemetry.example.com"),
            (AUTH_TOKEN_ENV_VAR, " secret "),
            (TAGS_ENV_VAR, "cli, linux,,"),
        ])
        .expect("valid config");

        assert!(config.enabled);
        assert_eq!(config.base_url, "https://telemetry.example.com");
        assert_eq!(config.auth_token, "secret");
        assert_eq!(config.tags, vec!["cli".to_string(), "linux".to_string()]);
    }

    #[test]
    fn test_from_env_iter_honours_opt_out() {
        let config = ReporterConfig::from_env_iter([
            (BASE_URL_ENV_VAR, "https://telemetry.example.com"),
            (OPT_OUT_ENV_VAR, "1"),
        ])
        .expect("valid config");
        assert!(!config.enabled);

        let config = ReporterConfig::from_env_iter([
            (BASE_URL_ENV_VAR, "https://telemetry.example.com"),
            (OPT_OUT_ENV_VAR, ""),
        ])
        .expect("valid config");
        assert!(config.enabled);
    }

    #[test]
    fn test_from_env_iter_requires_base_url() {
        let err = ReporterConfig::from_env_iter(Vec::<(String, String)>::new())
            .expect_err("missing base URL");
        assert!(matches!(err, ReporterError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        assert!(ReporterConfig::new("not a url").validate().is_err());
        assert!(ReporterConfig::new("ftp://example.com").validate().is_err());
        assert!(ReporterConfig::new("   ").validate().is_err());
        assert!(ReporterConfig::new("http://127.0.0.1:8080").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_tags() {
        let config = ReporterConfig {
            tags: vec!["ok".to_string(), " ".to_string()],
            ..ReporterConfig::new("https://telemetry.example.com")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_auth_token() {
        let config = ReporterConfig {
            auth_token: "super-secret".to_string(),
            ..ReporterConfig::new("https://telemetry.example.com")
        };
        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("super-secret"));
        assert!(debug_str.contains("<redacted>"));
    }

    #[test]
    #[serial]
    fn test_opt_out_from_env() {
        env::remove_var(OPT_OUT_ENV_VAR);
        assert!(!opt_out_from_env());

        env::set_var(OPT_OUT_ENV_VAR, "");
        assert!(!opt_out_from_env());

        env::set_var(OPT_OUT_ENV_VAR, "yes");
        assert!(opt_out_from_env());

        env::remove_var(OPT_OUT_ENV_VAR);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_from_env_ignores_unrelated_non_unicode_vars() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        const UNRELATED_VAR: &str = "TELEMETRY_TEST_UNRELATED_BYTES";
        env::set_var(UNRELATED_VAR, OsStr::from_bytes(b"\xff\xfe"));
        env::set_var(BASE_URL_ENV_VAR, "http://127.0.0.1:1");
        env::remove_var(AUTH_TOKEN_ENV_VAR);
        env::remove_var(TAGS_ENV_VAR);
        env::remove_var(OPT_OUT_ENV_VAR);

        let enabled = ReporterConfig::from_env();

        env::set_var(OPT_OUT_ENV_VAR, OsStr::from_bytes(b"\xff"));
        let opted_out = ReporterConfig::from_env();

        env::remove_var(UNRELATED_VAR);
        env::remove_var(BASE_URL_ENV_VAR);
        env::remove_var(OPT_OUT_ENV_VAR);

        let config = enabled.expect("valid config");
        assert_eq!(config.base_url, "http://127.0.0.1:1");
        assert!(config.enabled);
        assert!(!opted_out.expect("valid config").enabled);
    }
}
