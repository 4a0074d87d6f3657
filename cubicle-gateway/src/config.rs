//! Startup configuration read from `CUBICLE_*` environment variables.
//!
//! Every variable is optional. Empty values count as unset.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use cubicle_core::Credentials;
use cubicle_executor::SandboxConfig;

use crate::error::GatewayError;

pub const LISTEN_ADDR: &str = "CUBICLE_LISTEN_ADDR";
pub const DATABASE_URL: &str = "CUBICLE_DATABASE_URL";
pub const ALLOWED_ORIGINS: &str = "CUBICLE_ALLOWED_ORIGINS";
pub const SECURE_COOKIES: &str = "CUBICLE_SECURE_COOKIES";
pub const ADMIN_USER: &str = "CUBICLE_ADMIN_USER";
pub const ADMIN_PASSWORD: &str = "CUBICLE_ADMIN_PASSWORD";
pub const INTERPRETER: &str = "CUBICLE_INTERPRETER";
pub const EXEC_TIMEOUT_SECS: &str = "CUBICLE_EXEC_TIMEOUT_SECS";
pub const MAX_OUTPUT_BYTES: &str = "CUBICLE_MAX_OUTPUT_BYTES";
pub const MAX_SOURCE_BYTES: &str = "CUBICLE_MAX_SOURCE_BYTES";
pub const SANDBOX_WRAPPER: &str = "CUBICLE_SANDBOX_WRAPPER";
pub const SCRATCH_DIR: &str = "CUBICLE_SCRATCH_DIR";
pub const SNAPSHOT_DIR: &str = "CUBICLE_SNAPSHOT_DIR";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_DATABASE_URL: &str = "sqlite://cubicle.db";
const DEFAULT_SNAPSHOT_DIR: &str = "class";

/// Cookie and CORS settings for the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Origins allowed to call the code endpoints with credentials.
    /// Empty disables cross-origin access.
    pub allowed_origins: Vec<HeaderValue>,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub http: HttpOptions,
    /// Account created at startup if it does not exist yet.
    pub admin: Option<Credentials>,
    pub sandbox: SandboxConfig,
    pub snapshot_dir: PathBuf,
    pub max_snapshot_bytes: usize,
}

impl GatewayConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`GatewayError::InvalidConfig`] naming the first unusable variable.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`.
    ///
    /// # Errors
    /// Returns [`GatewayError::InvalidConfig`] naming the first unusable variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let http = HttpOptions {
            allowed_origins: match get(ALLOWED_ORIGINS) {
                Some(raw) => parse_origins(&raw)?,
                None => Vec::new(),
            },
            secure_cookies: parsed(get(SECURE_COOKIES), SECURE_COOKIES)?.unwrap_or(false),
        };

        let admin = match (get(ADMIN_USER), get(ADMIN_PASSWORD)) {
            (Some(user), Some(password)) => Some(Credentials::new(user.trim(), password)),
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                return Err(GatewayError::InvalidConfig {
                    key: ADMIN_USER,
                    reason: format!("{ADMIN_USER} and {ADMIN_PASSWORD} must be set together"),
                })
            }
        };

        let mut sandbox = SandboxConfig::python();
        if let Some(interpreter) = get(INTERPRETER) {
            sandbox.interpreter = PathBuf::from(interpreter.trim());
        }
        if let Some(secs) = parsed::<u64>(get(EXEC_TIMEOUT_SECS), EXEC_TIMEOUT_SECS)? {
            if secs == 0 {
                return Err(GatewayError::InvalidConfig {
                    key: EXEC_TIMEOUT_SECS,
                    reason: "must be at least 1".to_owned(),
                });
            }
            sandbox = sandbox.with_timeout(Duration::from_secs(secs));
        }
        if let Some(max) = parsed(get(MAX_OUTPUT_BYTES), MAX_OUTPUT_BYTES)? {
            sandbox = sandbox.with_max_output_bytes(max);
        }
        if let Some(max) = parsed(get(MAX_SOURCE_BYTES), MAX_SOURCE_BYTES)? {
            sandbox = sandbox.with_max_source_bytes(max);
        }
        if let Some(wrapper) = get(SANDBOX_WRAPPER) {
            sandbox = sandbox.with_wrapper(wrapper.split_whitespace().map(str::to_owned).collect());
        }
        if let Some(dir) = get(SCRATCH_DIR) {
            sandbox = sandbox.with_scratch_dir(dir.trim());
        }

        Ok(Self {
            listen_addr: get(LISTEN_ADDR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned()),
            database_url: get(DATABASE_URL).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            http,
            admin,
            max_snapshot_bytes: sandbox.max_source_bytes,
            sandbox,
            snapshot_dir: PathBuf::from(
                get(SNAPSHOT_DIR).unwrap_or_else(|| DEFAULT_SNAPSHOT_DIR.to_owned()),
            ),
        })
    }
}

fn parsed<T>(value: Option<String>, key: &'static str) -> Result<Option<T>, GatewayError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| GatewayError::InvalidConfig {
                    key,
                    reason: format!("{raw:?}: {e}"),
                })
        })
        .transpose()
}

fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, GatewayError> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            // Credentialed CORS cannot use a wildcard.
            if origin == "*" {
                return Err(GatewayError::InvalidConfig {
                    key: ALLOWED_ORIGINS,
                    reason: "list origins explicitly; \"*\" cannot be combined with cookies"
                        .to_owned(),
                });
            }
            HeaderValue::from_str(origin).map_err(|e| GatewayError::InvalidConfig {
                key: ALLOWED_ORIGINS,
                reason: format!("{origin:?}: {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<GatewayConfig, GatewayError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = match config_from(&[]) {
            Ok(c) => c,
            Err(e) => panic!("default config failed: {e}"),
        };
        assert_eq!(config.listen_addr, "127.0.0.1:5000");
        assert_eq!(config.database_url, "sqlite://cubicle.db");
        assert!(config.http.allowed_origins.is_empty(), "CORS must be off by default");
        assert!(!config.http.secure_cookies);
        assert!(config.admin.is_none());
        assert_eq!(config.sandbox.interpreter, PathBuf::from("python3"));
        assert_eq!(config.sandbox.timeout, Duration::from_secs(10));
        assert!(config.sandbox.wrapper.is_empty());
        assert_eq!(config.snapshot_dir, PathBuf::from("class"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = match config_from(&[
            (LISTEN_ADDR, "0.0.0.0:8080"),
            (ALLOWED_ORIGINS, "http://localhost:3000, https://class.example"),
            (SECURE_COOKIES, "true"),
            (ADMIN_USER, "5icoding@sina.cn"),
            (ADMIN_PASSWORD, "888888"),
            (EXEC_TIMEOUT_SECS, "3"),
            (MAX_SOURCE_BYTES, "100"),
            (SANDBOX_WRAPPER, "unshare --net --map-root-user"),
        ]) {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.http.allowed_origins.len(), 2);
        assert_eq!(config.http.allowed_origins[1], "https://class.example");
        assert!(config.http.secure_cookies);
        assert_eq!(config.admin.map(|c| c.username), Some("5icoding@sina.cn".to_owned()));
        assert_eq!(config.sandbox.timeout, Duration::from_secs(3));
        assert_eq!(config.sandbox.max_source_bytes, 100);
        assert_eq!(config.max_snapshot_bytes, 100);
        assert_eq!(config.sandbox.wrapper, vec!["unshare", "--net", "--map-root-user"]);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let cases: &[&[(&str, &str)]] = &[
            &[(EXEC_TIMEOUT_SECS, "soon")],
            &[(EXEC_TIMEOUT_SECS, "0")],
            &[(SECURE_COOKIES, "maybe")],
            &[(ALLOWED_ORIGINS, "*")],
            &[(ADMIN_USER, "admin")],
        ];
        for vars in cases {
            let result = config_from(vars);
            assert!(
                matches!(result, Err(GatewayError::InvalidConfig { .. })),
                "{vars:?} must be rejected"
            );
        }
    }

    #[test]
    fn blank_values_count_as_unset() {
        let blank = [(LISTEN_ADDR, "  "), (ADMIN_USER, ""), (ADMIN_PASSWORD, "")];
        let config = match config_from(&blank) {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        };
        assert_eq!(config.listen_addr, "127.0.0.1:5000");
        assert!(config.admin.is_none());
    }
}
