//! Environment-driven configuration for the camwatch server.
//!
//! Variables:
//! - `CAMWATCH_HTTP_PORT` (default 7878)
//! - `CAMWATCH_DATA_DIR` (default `data`): root of the file-backed session storage
//! - `CAMWATCH_AUTH_MODE`: `strict` or `permissive` (default `permissive`)
//! - `CAMWATCH_DEMO_PASSWORD`: secret given to every built-in account; required in strict mode

use anyhow::{Result, anyhow, Context};
use crate::identity::PasswordPolicy;

pub const DEFAULT_HTTP_PORT: u16 = 7878;
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub http_port: u16,
    pub data_dir: String,
    pub auth_mode: PasswordPolicy,
    pub demo_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            data_dir: DEFAULT_DATA_DIR.to_string(),
            auth_mode: PasswordPolicy::Permissive,
            demo_password: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env` but over an arbitrary lookup, so tests need not touch the process env.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Config::default();
        if let Some(p) = get("CAMWATCH_HTTP_PORT") {
            cfg.http_port = p.trim().parse().with_context(|| format!("CAMWATCH_HTTP_PORT is not a port: '{p}'"))?;
        }
        if let Some(d) = get("CAMWATCH_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            cfg.data_dir = d;
        }
        if let Some(m) = get("CAMWATCH_AUTH_MODE") {
            cfg.auth_mode = PasswordPolicy::parse(&m).ok_or_else(|| anyhow!("CAMWATCH_AUTH_MODE must be 'strict' or 'permissive', got '{m}'"))?;
        }
        cfg.demo_password = get("CAMWATCH_DEMO_PASSWORD").filter(|p| !p.is_empty());
        if cfg.auth_mode == PasswordPolicy::Strict && cfg.demo_password.is_none() {
            return Err(anyhow!("strict auth mode needs CAMWATCH_DEMO_PASSWORD so built-in accounts have a secret"));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| m.get(k).cloned()
    }

    #[test]
    fn defaults() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap(), Config::default());
    }

    #[test]
    fn overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("CAMWATCH_HTTP_PORT", "9000"),
            ("CAMWATCH_DATA_DIR", "/var/lib/camwatch"),
            ("CAMWATCH_AUTH_MODE", "strict"),
            ("CAMWATCH_DEMO_PASSWORD", "pw"),
        ])).unwrap();
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.data_dir, "/var/lib/camwatch");
        assert_eq!(cfg.auth_mode, PasswordPolicy::Strict);
        assert_eq!(cfg.demo_password.as_deref(), Some("pw"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("CAMWATCH_HTTP_PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CAMWATCH_AUTH_MODE", "open")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CAMWATCH_AUTH_MODE", "strict")])).is_err());
    }
}
